#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec;
use crate::der::{self, Reader, Tag};
use crate::error::DecodeError;
use crate::registry::TypeId;
use crate::Result;

/// A hashlock condition: the fingerprint is `SHA-256(preimage)`.
///
/// # Example
///
/// ```
/// use sha2::{Digest, Sha256};
/// use cryptoconditions_core::Condition;
///
/// let condition = Condition::preimage(b"abc".to_vec());
/// let fingerprint: [u8; 32] = Sha256::digest(b"abc").into();
/// assert_eq!(condition.fingerprint().unwrap(), fingerprint);
/// ```
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preimage {
    /// Secret whose hash is committed to.
    #[cfg_attr(feature = "json", serde(with = "crate::serde::b64"))]
    pub preimage: Vec<u8>,
}

impl Preimage {
    pub fn fingerprint(&self) -> [u8; 32] {
        Sha256::digest(&self.preimage).into()
    }

    /// One unit per preimage byte.
    pub fn cost(&self) -> u64 {
        self.preimage.len() as u64
    }

    pub(crate) fn write_fulfillment(&self, out: &mut Vec<u8>) -> Result<()> {
        let mut content = Vec::with_capacity(self.preimage.len() + 4);
        der::write_tlv(&mut content, Tag::primitive(0), &self.preimage);
        codec::write_bounded(out, Tag::constructed(TypeId::Preimage.id()), &content)
    }

    pub(crate) fn read_fulfillment(content: &[u8]) -> std::result::Result<Self, DecodeError> {
        let mut r = Reader::new(content);
        let preimage = r.expect(Tag::primitive(0))?.to_vec();
        r.finish()?;
        Ok(Self { preimage })
    }
}
