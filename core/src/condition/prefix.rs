#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Anon, Condition};
use crate::codec::{self, Mode};
use crate::der::{self, Reader, Tag};
use crate::error::DecodeError;
use crate::registry::TypeId;
use crate::Result;

/// Fixed overhead of a prefix node on top of its subcondition.
pub const PREFIX_COST: u64 = 1024;

/// Evaluates `subcondition` against `prefix || message`.
///
/// The incoming message is cut to `max_message_length` bytes before the
/// prefix is prepended, which bounds the work done by deep prefix chains.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    #[cfg_attr(feature = "json", serde(with = "crate::serde::b64"))]
    pub prefix: Vec<u8>,

    pub max_message_length: u64,

    #[cfg_attr(feature = "json", serde(rename = "subfulfillment"))]
    pub subcondition: Box<Condition>,
}

impl Default for Prefix {
    fn default() -> Self {
        Self {
            prefix: Vec::new(),
            max_message_length: 0,
            subcondition: Box::new(Condition::Anon(Anon::placeholder())),
        }
    }
}

impl Prefix {
    /// The message the subcondition sees.
    pub fn prefixed(&self, message: &[u8]) -> Vec<u8> {
        let max = usize::try_from(self.max_message_length).unwrap_or(usize::MAX);
        let message = &message[..message.len().min(max)];
        [self.prefix.as_slice(), message].concat()
    }

    /// SHA-256 over `SEQUENCE { [0] prefix, [1] maxMessageLength, [2] subcondition }`.
    pub fn fingerprint(&self) -> Result<[u8; 32]> {
        let mut content = Vec::with_capacity(self.prefix.len() + 64);
        der::write_tlv(&mut content, Tag::primitive(0), &self.prefix);
        der::write_tlv(
            &mut content,
            Tag::primitive(1),
            &der::encode_uint(self.max_message_length),
        );
        der::write_tlv(
            &mut content,
            Tag::constructed(2),
            &self.subcondition.encode_condition()?,
        );
        Ok(Sha256::digest(der::sequence(&content)).into())
    }

    pub fn cost(&self) -> u64 {
        (self.prefix.len() as u64)
            .saturating_add(self.max_message_length)
            .saturating_add(self.subcondition.cost())
            .saturating_add(PREFIX_COST)
    }

    pub(crate) fn write_fulfillment(&self, out: &mut Vec<u8>, mode: Mode) -> Result<()> {
        let mut sub = Vec::new();
        self.subcondition.write_fulfillment(&mut sub, mode)?;

        let mut content = Vec::with_capacity(self.prefix.len() + sub.len() + 16);
        der::write_tlv(&mut content, Tag::primitive(0), &self.prefix);
        der::write_tlv(
            &mut content,
            Tag::primitive(1),
            &der::encode_uint(self.max_message_length),
        );
        codec::write_bounded(&mut content, Tag::constructed(2), &sub)?;
        codec::write_bounded(out, Tag::constructed(TypeId::Prefix.id()), &content)
    }

    pub(crate) fn read_fulfillment(
        content: &[u8],
        mode: Mode,
    ) -> std::result::Result<Self, DecodeError> {
        let mut r = Reader::new(content);
        let prefix = r.expect(Tag::primitive(0))?.to_vec();
        let max_message_length = der::decode_uint(r.expect(Tag::primitive(1))?)?;

        let mut sub = Reader::new(r.expect(Tag::constructed(2))?);
        let subcondition = codec::read_fulfillment(&mut sub, mode)?;
        sub.finish()?;
        r.finish()?;

        Ok(Self {
            prefix,
            max_message_length,
            subcondition: Box::new(subcondition),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_message_is_truncated() {
        let prefix = Prefix {
            prefix: b"pre:".to_vec(),
            max_message_length: 3,
            subcondition: Box::new(Condition::preimage(b"x".to_vec())),
        };
        assert_eq!(prefix.prefixed(b"ab"), b"pre:ab".to_vec());
        assert_eq!(prefix.prefixed(b"abcdef"), b"pre:abc".to_vec());
    }

    #[test]
    fn fingerprint_commits_to_every_field() {
        let base = Prefix {
            prefix: b"pre".to_vec(),
            max_message_length: 10,
            subcondition: Box::new(Condition::preimage(b"x".to_vec())),
        };
        let fp = base.fingerprint().unwrap();

        let other_prefix = Prefix {
            prefix: b"pro".to_vec(),
            ..base.clone()
        };
        let other_length = Prefix {
            max_message_length: 11,
            ..base.clone()
        };
        let other_sub = Prefix {
            subcondition: Box::new(Condition::preimage(b"y".to_vec())),
            ..base.clone()
        };
        for other in [other_prefix, other_length, other_sub] {
            assert_ne!(other.fingerprint().unwrap(), fp);
        }
    }

    #[test]
    fn zero_value_never_fulfills() {
        let prefix = Prefix::default();
        assert!(prefix.subcondition.is_anon());
        assert!(!Condition::Prefix(prefix).is_fulfilled());
    }
}
