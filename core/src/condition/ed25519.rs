use ed25519_dalek::{Signature, Verifier, VerifyingKey};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec::{self, Mode};
use crate::der::{self, Reader, Tag};
use crate::error::{DecodeError, Error, ProofError};
use crate::registry::TypeId;
use crate::Result;

/// Verification cost of one Ed25519 signature.
pub const ED25519_COST: u64 = 131_072;

/// Ed25519 signature condition.
///
/// Satisfied when `signature` is a valid Ed25519 signature of the message
/// under `public_key`. A missing signature is the condition-only form.
///
/// # Example
///
/// ```
/// use ed25519_dalek::SigningKey;
/// use cryptoconditions_core::{Condition, RejectEvals};
///
/// let key = SigningKey::from_bytes(&[7; 32]);
/// let mut condition = Condition::ed25519(key.verifying_key().to_bytes());
/// let expected = condition.encode_condition().unwrap();
///
/// condition.sign_ed25519(&[7; 32], b"release");
/// assert!(condition.verify(b"release", &expected, &RejectEvals).is_ok());
/// ```
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ed25519 {
    #[cfg_attr(feature = "json", serde(with = "crate::serde::b64"))]
    pub public_key: [u8; 32],

    #[cfg_attr(
        feature = "json",
        serde(
            default,
            with = "crate::serde::b64_opt",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub signature: Option<[u8; 64]>,
}

impl Ed25519 {
    /// SHA-256 over `SEQUENCE { [0] publicKey }`.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut content = Vec::with_capacity(34);
        der::write_tlv(&mut content, Tag::primitive(0), &self.public_key);
        Sha256::digest(der::sequence(&content)).into()
    }

    /// Verify that `signature` is a valid Ed25519 signature of `message` under `public_key`.
    pub fn verify(&self, message: &[u8]) -> std::result::Result<(), ProofError> {
        let signature = self
            .signature
            .as_ref()
            .ok_or(ProofError::MissingSignature(TypeId::Ed25519))?;
        let pk = VerifyingKey::from_bytes(&self.public_key)
            .map_err(|_| ProofError::InvalidPublicKey(TypeId::Ed25519))?;
        pk.verify(message, &Signature::from_bytes(signature))
            .map_err(|_| ProofError::VerificationFailed(TypeId::Ed25519))
    }

    pub(crate) fn write_fulfillment(&self, out: &mut Vec<u8>, mode: Mode) -> Result<()> {
        let mut content = Vec::with_capacity(100);
        der::write_tlv(&mut content, Tag::primitive(0), &self.public_key);
        match (&self.signature, mode) {
            (Some(signature), _) => der::write_tlv(&mut content, Tag::primitive(1), signature),
            (None, Mode::Partial) => {}
            (None, Mode::Full) => return Err(Error::NotFulfilled(TypeId::Ed25519)),
        }
        codec::write_bounded(out, Tag::constructed(TypeId::Ed25519.id()), &content)
    }

    pub(crate) fn read_fulfillment(
        content: &[u8],
        mode: Mode,
    ) -> std::result::Result<Self, DecodeError> {
        let mut r = Reader::new(content);
        let public_key = r.expect_array(Tag::primitive(0), "ed25519 public key")?;
        let signature = match mode {
            Mode::Full => Some(r.expect_array(Tag::primitive(1), "ed25519 signature")?),
            Mode::Partial => r
                .optional(Tag::primitive(1))?
                .map(|sig| der::fixed(sig, "ed25519 signature"))
                .transpose()?,
        };
        r.finish()?;
        Ok(Self {
            public_key,
            signature,
        })
    }
}
