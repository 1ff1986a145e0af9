use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature, VerifyingKey};
use ripemd::Ripemd160;
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec::{self, Mode};
use crate::der::{self, Reader, Tag};
use crate::error::{DecodeError, Error, ProofError, StructureError};
use crate::registry::TypeId;
use crate::Result;

/// Verification cost of one secp256k1 signature.
pub const SECP256K1_COST: u64 = 131_072;

const COMPACT_SIGNATURE_LEN: usize = 64;
const MAX_DER_SIGNATURE_LEN: usize = 72;

/// Secp256k1 ECDSA signature condition.
///
/// Signatures are always over a 32 byte digest, never over an arbitrary
/// message: callers hash first.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Secp256k1 {
    /// SEC1-encoded public key, compressed (33 bytes) or not (65 bytes).
    #[cfg_attr(feature = "json", serde(with = "crate::serde::b64"))]
    pub public_key: Vec<u8>,

    /// Compact (64 bytes) or DER-encoded signature.
    #[cfg_attr(
        feature = "json",
        serde(
            default,
            with = "crate::serde::b64_opt",
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub signature: Option<Vec<u8>>,
}

impl Secp256k1 {
    /// SHA-256 over `SEQUENCE { [0] publicKey }`.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut content = Vec::with_capacity(self.public_key.len() + 2);
        der::write_tlv(&mut content, Tag::primitive(0), &self.public_key);
        Sha256::digest(der::sequence(&content)).into()
    }

    /// `RIPEMD-160(SHA-256(public_key))`.
    pub fn key_hash(&self) -> [u8; 20] {
        hash160(&self.public_key)
    }

    /// Verify that `signature` is a valid signature of `digest` under `public_key`.
    pub fn verify(&self, digest: &[u8; 32]) -> std::result::Result<(), ProofError> {
        let signature = self
            .signature
            .as_deref()
            .ok_or(ProofError::MissingSignature(TypeId::Secp256k1))?;
        let vk = VerifyingKey::from_sec1_bytes(&self.public_key)
            .map_err(|_| ProofError::InvalidPublicKey(TypeId::Secp256k1))?;
        let sig = parse_signature(signature)
            .ok_or(ProofError::InvalidSignature(TypeId::Secp256k1))?;
        vk.verify_prehash(digest, &sig)
            .map_err(|_| ProofError::VerificationFailed(TypeId::Secp256k1))
    }

    /// Field size checks; the key itself is only parsed at verification.
    pub(crate) fn check(&self) -> std::result::Result<(), StructureError> {
        let key_ok = match self.public_key.len() {
            33 => matches!(self.public_key[0], 0x02 | 0x03),
            65 => self.public_key[0] == 0x04,
            _ => false,
        };
        if !key_ok {
            return Err(StructureError::PublicKey {
                kind: TypeId::Secp256k1,
                len: self.public_key.len(),
            });
        }
        match &self.signature {
            Some(sig) if !signature_shape_ok(sig) => Err(StructureError::Signature {
                kind: TypeId::Secp256k1,
                len: sig.len(),
            }),
            _ => Ok(()),
        }
    }

    pub(crate) fn write_fulfillment(&self, out: &mut Vec<u8>, mode: Mode) -> Result<()> {
        let mut content = Vec::with_capacity(self.public_key.len() + 80);
        der::write_tlv(&mut content, Tag::primitive(0), &self.public_key);
        match (&self.signature, mode) {
            (Some(signature), _) => der::write_tlv(&mut content, Tag::primitive(1), signature),
            (None, Mode::Partial) => {}
            (None, Mode::Full) => return Err(Error::NotFulfilled(TypeId::Secp256k1)),
        }
        codec::write_bounded(out, Tag::constructed(TypeId::Secp256k1.id()), &content)
    }

    pub(crate) fn read_fulfillment(
        content: &[u8],
        mode: Mode,
    ) -> std::result::Result<Self, DecodeError> {
        let mut r = Reader::new(content);
        let public_key = r.expect(Tag::primitive(0))?.to_vec();
        let signature = match mode {
            Mode::Full => Some(r.expect(Tag::primitive(1))?.to_vec()),
            Mode::Partial => r.optional(Tag::primitive(1))?.map(<[u8]>::to_vec),
        };
        r.finish()?;
        let leaf = Self {
            public_key,
            signature,
        };
        leaf.check()?;
        Ok(leaf)
    }
}

pub(crate) fn hash160(bytes: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(bytes)).into()
}

/// Accepts a DER `SEQUENCE` or the 64 byte compact form. A DER signature
/// can itself be 64 bytes long, so DER is tried first when the input opens
/// with a `SEQUENCE` tag.
pub(crate) fn parse_signature(bytes: &[u8]) -> Option<Signature> {
    let der = || {
        if bytes.first() == Some(&0x30) {
            Signature::from_der(bytes).ok()
        } else {
            None
        }
    };
    let compact = || {
        if bytes.len() == COMPACT_SIGNATURE_LEN {
            Signature::from_slice(bytes).ok()
        } else {
            None
        }
    };
    der().or_else(compact)
}

fn signature_shape_ok(sig: &[u8]) -> bool {
    sig.len() == COMPACT_SIGNATURE_LEN
        || (sig.first() == Some(&0x30) && (8..=MAX_DER_SIGNATURE_LEN).contains(&sig.len()))
}

#[cfg(test)]
mod tests {
    use k256::ecdsa::signature::hazmat::PrehashSigner;
    use k256::ecdsa::SigningKey;

    use super::*;

    fn signed(compressed: bool, der: bool) -> (Secp256k1, [u8; 32]) {
        let sk = SigningKey::from_slice(&[5; 32]).unwrap();
        let digest: [u8; 32] = Sha256::digest(b"cryptoconditions").into();
        let sig: Signature = sk.sign_prehash(&digest).unwrap();
        let signature = if der {
            sig.to_der().as_bytes().to_vec()
        } else {
            sig.to_bytes().to_vec()
        };
        let leaf = Secp256k1 {
            public_key: sk
                .verifying_key()
                .to_encoded_point(compressed)
                .as_bytes()
                .to_vec(),
            signature: Some(signature),
        };
        (leaf, digest)
    }

    #[test]
    fn verify_compact_and_der() {
        for (compressed, der) in [(true, false), (false, false), (true, true)] {
            let (leaf, digest) = signed(compressed, der);
            assert!(leaf.check().is_ok());
            assert!(leaf.verify(&digest).is_ok());
            assert_eq!(
                leaf.verify(&[0; 32]),
                Err(ProofError::VerificationFailed(TypeId::Secp256k1))
            );
        }
    }

    #[test]
    fn fingerprint_depends_on_key_encoding() {
        let (compressed, _) = signed(true, false);
        let (uncompressed, _) = signed(false, false);
        assert_ne!(compressed.fingerprint(), uncompressed.fingerprint());
    }

    #[test]
    fn rejects_bad_shapes() {
        let (mut leaf, _) = signed(true, false);
        leaf.signature = Some(vec![1; 63]);
        assert!(leaf.check().is_err());
        leaf.signature = None;
        leaf.public_key = vec![0x04; 33];
        assert!(leaf.check().is_err());
    }

    #[test]
    fn der_signature_of_compact_length() {
        // 29 byte r and s give a DER encoding of exactly 64 bytes
        let mut r = [0x11; 32];
        let mut s = [0x22; 32];
        r[..3].fill(0);
        s[..3].fill(0);
        let sig = Signature::from_scalars(r, s).unwrap();
        let der = sig.to_der().as_bytes().to_vec();
        assert_eq!(der.len(), COMPACT_SIGNATURE_LEN);
        assert_eq!(der[0], 0x30);
        assert_eq!(parse_signature(&der), Some(sig));

        // compact bytes that happen to open with 0x30 still parse
        let mut r_high = [0x30; 32];
        r_high[31] = 1;
        let opens_with_tag = Signature::from_scalars(r_high, s).unwrap();
        assert_eq!(parse_signature(&opens_with_tag.to_bytes()), Some(opens_with_tag));
    }

    #[test]
    fn key_hash_is_hash160() {
        let (leaf, _) = signed(true, false);
        let expected: [u8; 20] = Ripemd160::digest(Sha256::digest(&leaf.public_key)).into();
        assert_eq!(leaf.key_hash(), expected);
    }
}
