//! Verification of a fulfillment tree against an expected condition.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, instrument, trace};

use crate::condition::{Condition, Eval};
use crate::error::{Error, ProofError};
use crate::Result;

/// Caller-supplied judgment for [`Eval`] nodes.
///
/// Invoked once per eval node reached during verification, with the
/// `fulfilled` flag a visitor pass recorded on that node. Any context the
/// predicate needs lives in the implementor.
pub trait EvalVerifier {
    fn verify_eval(&self, eval: &Eval, fulfilled: bool) -> bool;
}

impl<F> EvalVerifier for F
where
    F: Fn(&Eval, bool) -> bool,
{
    fn verify_eval(&self, eval: &Eval, fulfilled: bool) -> bool {
        self(eval, fulfilled)
    }
}

/// Rejects every eval node; for trees that are not expected to have any.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectEvals;

impl EvalVerifier for RejectEvals {
    fn verify_eval(&self, _eval: &Eval, _fulfilled: bool) -> bool {
        false
    }
}

/// Knobs for [`Condition::verify_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Verify secp256k1 leaves against `SHA-256(message)` instead of
    /// requiring the message itself to be a 32 byte digest.
    pub hash_message: bool,
}

/// State shared by every node of one verification walk.
pub(crate) struct Verification<'a> {
    /// Digest for secp256k1 leaves, fixed at the root: prefixes do not
    /// apply to it.
    digest: Option<[u8; 32]>,
    root_len: usize,
    eval: &'a dyn EvalVerifier,
}

impl Verification<'_> {
    pub(crate) fn check(
        &self,
        node: &Condition,
        message: &[u8],
    ) -> std::result::Result<(), ProofError> {
        let outcome = match node {
            // the fingerprint comparison already proved the preimage
            Condition::Preimage(_) => Ok(()),
            Condition::Prefix(prefix) => self.check(&prefix.subcondition, &prefix.prefixed(message)),
            Condition::Threshold(threshold) => threshold.verify(message, self),
            Condition::Ed25519(ed25519) => ed25519.verify(message),
            Condition::Secp256k1(secp256k1) => match &self.digest {
                Some(digest) => secp256k1.verify(digest),
                None => Err(ProofError::DigestLength(self.root_len)),
            },
            Condition::Eval(eval) => {
                if self.eval.verify_eval(eval, eval.fulfilled) {
                    Ok(())
                } else {
                    Err(ProofError::EvalRejected)
                }
            }
            Condition::Falcon512(falcon) => falcon.verify(message),
            Condition::Anon(anon) => Err(ProofError::Unfulfilled(anon.condition_type.id)),
        };
        if let Err(e) = &outcome {
            trace!(kind = node.type_name(), error = %e, "node rejected");
        }
        outcome
    }
}

impl Condition {
    /// Verifies this fulfillment against `condition` for `message`.
    ///
    /// First the tree is re-encoded as a condition and compared to the
    /// expected bytes, then every proof is checked recursively. Cost and
    /// type mask limits are left to the caller.
    ///
    /// # Errors
    ///
    /// [`Error::ConditionMismatch`] when the tree commits to something
    /// else, [`Error::InvalidProof`] when a proof does not hold.
    pub fn verify(&self, message: &[u8], condition: &[u8], eval: &dyn EvalVerifier) -> Result<()> {
        self.verify_with(message, condition, eval, VerifyOptions::default())
    }

    #[instrument(skip_all, fields(kind = self.type_name(), message_len = message.len()))]
    pub fn verify_with(
        &self,
        message: &[u8],
        condition: &[u8],
        eval: &dyn EvalVerifier,
        options: VerifyOptions,
    ) -> Result<()> {
        let encoded = self.encode_condition()?;
        if encoded.ct_eq(condition).unwrap_u8() != 1 {
            debug!("condition mismatch");
            return Err(Error::ConditionMismatch);
        }

        let digest = if options.hash_message {
            Some(Sha256::digest(message).into())
        } else {
            <[u8; 32]>::try_from(message).ok()
        };
        let ctx = Verification {
            digest,
            root_len: message.len(),
            eval,
        };
        ctx.check(self, message).map_err(|e| {
            debug!(error = %e, "proof rejected");
            Error::InvalidProof(e)
        })
    }

    /// [`Condition::verify`] as a plain yes/no.
    pub fn is_valid(&self, message: &[u8], condition: &[u8], eval: &dyn EvalVerifier) -> bool {
        self.verify(message, condition, eval).is_ok()
    }

    /// Checks every signed secp256k1 leaf against `msg32`, ignoring the
    /// rest of the tree. Fails when there is no signed leaf at all.
    pub fn secp256k1_verify_tree_msg32(&self, msg32: &[u8; 32]) -> bool {
        let mut signed = 0usize;
        for node in self.iter() {
            if let Condition::Secp256k1(leaf) = node {
                if leaf.signature.is_some() {
                    if leaf.verify(msg32).is_err() {
                        return false;
                    }
                    signed += 1;
                }
            }
        }
        signed > 0
    }
}
