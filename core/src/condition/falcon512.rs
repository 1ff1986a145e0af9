use pqcrypto_falcon::falcon512;
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec::{self, Mode};
use crate::der::{self, Reader, Tag};
use crate::error::{DecodeError, Error, ProofError, StructureError};
use crate::registry::TypeId;
use crate::Result;

/// Verification cost of one Falcon-512 signature.
pub const FALCON512_COST: u64 = 262_144;

/// Falcon-512 post-quantum signature condition.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Falcon512 {
    #[cfg_attr(feature = "json", serde(with = "crate::serde::b64"))]
    pub public_key: Vec<u8>,

    /// Detached signature; its length varies per signature.
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

impl Falcon512 {
    /// SHA-256 over `SEQUENCE { [0] publicKey }`.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut content = Vec::with_capacity(self.public_key.len() + 4);
        der::write_tlv(&mut content, Tag::primitive(0), &self.public_key);
        Sha256::digest(der::sequence(&content)).into()
    }

    pub fn verify(&self, message: &[u8]) -> std::result::Result<(), ProofError> {
        let signature = self
            .signature
            .as_deref()
            .ok_or(ProofError::MissingSignature(TypeId::Falcon512))?;
        let pk = falcon512::PublicKey::from_bytes(&self.public_key)
            .map_err(|_| ProofError::InvalidPublicKey(TypeId::Falcon512))?;
        let sig = falcon512::DetachedSignature::from_bytes(signature)
            .map_err(|_| ProofError::InvalidSignature(TypeId::Falcon512))?;
        falcon512::verify_detached_signature(&sig, message, &pk)
            .map_err(|_| ProofError::VerificationFailed(TypeId::Falcon512))
    }

    pub(crate) fn check(&self) -> std::result::Result<(), StructureError> {
        if self.public_key.len() != falcon512::public_key_bytes() {
            return Err(StructureError::PublicKey {
                kind: TypeId::Falcon512,
                len: self.public_key.len(),
            });
        }
        match &self.signature {
            Some(sig) if sig.is_empty() || sig.len() > falcon512::signature_bytes() => {
                Err(StructureError::Signature {
                    kind: TypeId::Falcon512,
                    len: sig.len(),
                })
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn write_fulfillment(&self, out: &mut Vec<u8>, mode: Mode) -> Result<()> {
        let signature_len = self.signature.as_ref().map_or(0, Vec::len);
        let mut content = Vec::with_capacity(self.public_key.len() + signature_len + 8);
        der::write_tlv(&mut content, Tag::primitive(0), &self.public_key);
        match (&self.signature, mode) {
            (Some(signature), _) => der::write_tlv(&mut content, Tag::primitive(1), signature),
            (None, Mode::Partial) => {}
            (None, Mode::Full) => return Err(Error::NotFulfilled(TypeId::Falcon512)),
        }
        codec::write_bounded(out, Tag::constructed(TypeId::Falcon512.id()), &content)
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
