//! Tree-wide signing. Each signer only touches the leaves bound to its own
//! key, so several parties can populate one tree in turn.

use ed25519_dalek::{Signer, SigningKey};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::Signature;
use pqcrypto_falcon::falcon512;
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _};
use tracing::{debug, instrument};

use crate::condition::{hash160, parse_signature, Condition, Secp256k1};
use crate::error::{Error, StructureError};
use crate::registry::TypeId;
use crate::visit::Visit;
use crate::Result;

/// How an externally produced secp256k1 signature finds its leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secp256k1Key<'a> {
    /// SEC1 public key, compressed or not; must match the leaf byte for byte.
    PublicKey(&'a [u8]),
    /// `RIPEMD-160(SHA-256(public_key))` of the leaf's key.
    KeyHash(&'a [u8; 20]),
}

impl Secp256k1Key<'_> {
    fn matches(&self, public_key: &[u8]) -> bool {
        match self {
            Self::PublicKey(pk) => *pk == public_key,
            Self::KeyHash(hash) => hash160(public_key) == **hash,
        }
    }
}

impl Condition {
    /// Signs every Ed25519 leaf bound to `secret`'s public key, each over
    /// the message it will be verified against. Returns the number of
    /// leaves signed.
    #[instrument(skip_all)]
    pub fn sign_ed25519(&mut self, secret: &[u8; 32], message: &[u8]) -> usize {
        let key = SigningKey::from_bytes(secret);
        let public_key = key.verifying_key().to_bytes();

        let mut signed = 0;
        self.visit(
            &mut |node: &mut Condition, message: &[u8]| {
                if let Condition::Ed25519(leaf) = node {
                    if leaf.public_key == public_key {
                        leaf.signature = Some(key.sign(message).to_bytes());
                        signed += 1;
                    }
                }
                Visit::Continue
            },
            message,
        );
        debug!(signed, "ed25519 leaves signed");
        signed
    }

    /// Signs every Falcon-512 leaf bound to `public_key`, each over the
    /// message it will be verified against. Falcon secret keys do not
    /// expose their public half, so the pair is passed in whole.
    ///
    /// Falcon signatures are randomized: signing again replaces existing
    /// signatures with different, equally valid ones.
    #[instrument(skip_all)]
    pub fn sign_falcon512(
        &mut self,
        public_key: &falcon512::PublicKey,
        secret: &falcon512::SecretKey,
        message: &[u8],
    ) -> usize {
        let public_key = public_key.as_bytes();

        let mut signed = 0;
        self.visit(
            &mut |node: &mut Condition, message: &[u8]| {
                if let Condition::Falcon512(leaf) = node {
                    if leaf.public_key == public_key {
                        let signature = falcon512::detached_sign(message, secret);
                        leaf.signature = Some(signature.as_bytes().to_vec());
                        signed += 1;
                    }
                }
                Visit::Continue
            },
            message,
        );
        debug!(signed, "falcon512 leaves signed");
        signed
    }

    /// Signs every secp256k1 leaf bound to `secret`'s public key, in either
    /// encoding, over the digest `msg32`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidStructure`] when `secret` is not a valid scalar.
    #[instrument(skip_all)]
    pub fn sign_secp256k1_msg32(&mut self, secret: &[u8; 32], msg32: &[u8; 32]) -> Result<usize> {
        let key = k256::ecdsa::SigningKey::from_slice(secret)
            .map_err(|_| StructureError::SecretKey(TypeId::Secp256k1))?;
        let compressed = key.verifying_key().to_encoded_point(true);
        let uncompressed = key.verifying_key().to_encoded_point(false);
        let signature: Signature = key
            .sign_prehash(msg32)
            .map_err(|_| StructureError::SecretKey(TypeId::Secp256k1))?;
        let signature = signature.to_bytes().to_vec();

        let mut signed = 0;
        for leaf in self.secp256k1_leaves_mut() {
            let pk = leaf.public_key.as_slice();
            if pk == compressed.as_bytes() || pk == uncompressed.as_bytes() {
                leaf.signature = Some(signature.clone());
                signed += 1;
            }
        }
        debug!(signed, "secp256k1 leaves signed");
        Ok(signed)
    }

    /// Stores an externally produced signature in every secp256k1 leaf
    /// matched by `key`. The signature is checked for shape only.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidStructure`] when `signature` is neither a compact
    /// nor a DER signature.
    pub fn apply_secp256k1_signature(
        &mut self,
        key: Secp256k1Key<'_>,
        signature: &[u8],
    ) -> Result<usize> {
        if parse_signature(signature).is_none() {
            return Err(Error::InvalidStructure(StructureError::Signature {
                kind: TypeId::Secp256k1,
                len: signature.len(),
            }));
        }

        let mut applied = 0;
        for leaf in self.secp256k1_leaves_mut() {
            if key.matches(&leaf.public_key) {
                leaf.signature = Some(signature.to_vec());
                applied += 1;
            }
        }
        debug!(applied, "secp256k1 signature applied");
        Ok(applied)
    }

    fn secp256k1_leaves_mut(&mut self) -> Vec<&mut Secp256k1> {
        let mut leaves = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Condition::Secp256k1(leaf) => leaves.push(leaf),
                Condition::Prefix(prefix) => stack.push(&mut *prefix.subcondition),
                Condition::Threshold(threshold) => {
                    stack.extend(threshold.subconditions.iter_mut().rev())
                }
                _ => {}
            }
        }
        leaves
    }
}

#[cfg(test)]
mod tests {
    use k256::ecdsa::SigningKey as SecpKey;
    use sha2::{Digest, Sha256};

    use super::*;
    use crate::verify::RejectEvals;

    fn ed_pk(seed: u8) -> [u8; 32] {
        SigningKey::from_bytes(&[seed; 32]).verifying_key().to_bytes()
    }

    fn secp_pk(seed: u8, compressed: bool) -> Vec<u8> {
        SecpKey::from_slice(&[seed; 32])
            .unwrap()
            .verifying_key()
            .to_encoded_point(compressed)
            .as_bytes()
            .to_vec()
    }

    #[test]
    fn signs_only_own_leaves() {
        let mut tree = Condition::threshold(
            2,
            vec![
                Condition::ed25519(ed_pk(1)),
                Condition::ed25519(ed_pk(2)),
                Condition::prefix(b"p:".to_vec(), 16, Condition::ed25519(ed_pk(1))),
            ],
        );
        let expected = tree.encode_condition().unwrap();

        assert_eq!(tree.sign_ed25519(&[1; 32], b"msg"), 2);
        assert!(tree.is_fulfilled());
        assert!(!tree.children()[1].is_fulfilled());
        assert!(tree.verify(b"msg", &expected, &RejectEvals).is_ok());
    }

    #[test]
    fn signing_twice_changes_nothing() {
        let mut tree = Condition::threshold(1, vec![Condition::ed25519(ed_pk(1))]);
        tree.sign_ed25519(&[1; 32], b"msg");
        let once = tree.clone();
        tree.sign_ed25519(&[1; 32], b"msg");
        assert_eq!(tree, once);
    }

    #[test]
    fn falcon512_leaves_under_prefix() {
        let (pk, sk) = falcon512::keypair();
        let (other_pk, _) = falcon512::keypair();
        let mut tree = Condition::threshold(
            1,
            vec![
                Condition::prefix(b"pq:".to_vec(), 32, Condition::falcon512(pk.as_bytes())),
                Condition::falcon512(other_pk.as_bytes()),
            ],
        );
        let expected = tree.encode_condition().unwrap();

        assert_eq!(tree.sign_falcon512(&pk, &sk, b"msg"), 1);
        assert!(tree.children()[0].is_fulfilled());
        assert!(!tree.children()[1].is_fulfilled());
        assert!(tree.verify(b"msg", &expected, &RejectEvals).is_ok());
        assert!(tree.verify(b"other", &expected, &RejectEvals).is_err());

        // re-signing keeps the tree valid
        assert_eq!(tree.sign_falcon512(&pk, &sk, b"msg"), 1);
        assert!(tree.verify(b"msg", &expected, &RejectEvals).is_ok());
    }

    #[test]
    fn secp256k1_both_encodings() {
        let digest: [u8; 32] = Sha256::digest(b"payload").into();
        let mut tree = Condition::threshold(
            2,
            vec![
                Condition::secp256k1(secp_pk(9, true)),
                Condition::secp256k1(secp_pk(9, false)),
                Condition::secp256k1(secp_pk(8, true)),
            ],
        );
        assert_eq!(tree.sign_secp256k1_msg32(&[9; 32], &digest).unwrap(), 2);
        assert!(tree.secp256k1_verify_tree_msg32(&digest));
        assert!(!tree.secp256k1_verify_tree_msg32(&[0; 32]));

        let expected = tree.encode_condition().unwrap();
        assert!(tree.verify(&digest, &expected, &RejectEvals).is_ok());
    }

    #[test]
    fn zero_secret_is_rejected() {
        let mut tree = Condition::secp256k1(secp_pk(9, true));
        assert_eq!(
            tree.sign_secp256k1_msg32(&[0; 32], &[1; 32]),
            Err(Error::InvalidStructure(StructureError::SecretKey(
                TypeId::Secp256k1
            )))
        );
    }

    #[test]
    fn apply_by_key_hash() {
        let digest = [7; 32];
        let pk = secp_pk(4, true);
        let signature: Signature = SecpKey::from_slice(&[4; 32])
            .unwrap()
            .sign_prehash(&digest)
            .unwrap();
        let der = signature.to_der().as_bytes().to_vec();

        let mut tree = Condition::prefix(b"".to_vec(), 0, Condition::secp256k1(pk.clone()));
        let hash = hash160(&pk);
        assert_eq!(
            tree.apply_secp256k1_signature(Secp256k1Key::KeyHash(&hash), &der)
                .unwrap(),
            1
        );
        assert!(tree.secp256k1_verify_tree_msg32(&digest));

        // wrong key applies nowhere
        let other = secp_pk(5, true);
        assert_eq!(
            tree.apply_secp256k1_signature(Secp256k1Key::PublicKey(&other), &der)
                .unwrap(),
            0
        );
        assert!(tree
            .apply_secp256k1_signature(Secp256k1Key::PublicKey(&pk), &[1; 10])
            .is_err());
    }
}
