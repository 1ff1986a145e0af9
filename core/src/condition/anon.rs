#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::der::{self, Reader, Tag};
use crate::error::DecodeError;
use crate::registry::{self, CondType, TypeId};
#[cfg(feature = "json")]
use crate::serde::cond_type_serde;
use crate::Result;

/// Condition-only form of any subtree.
///
/// Carries the committed fingerprint plus what is needed to size and
/// cost the policy, and no proof material. It is what a condition
/// decodes to, and what unfulfilled threshold branches become.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anon {
    /// Type this node stands in for.
    #[cfg_attr(feature = "json", serde(with = "cond_type_serde"))]
    pub condition_type: &'static CondType,

    #[cfg_attr(feature = "json", serde(with = "crate::serde::b64"))]
    pub fingerprint: [u8; 32],

    pub cost: u64,

    /// Types used below the node, excluding its own.
    #[cfg_attr(feature = "json", serde(default))]
    pub subtypes: u32,
}

impl Anon {
    /// An all-zero preimage commitment; no fulfillment can ever match it.
    pub fn placeholder() -> Self {
        Self {
            condition_type: TypeId::Preimage.cond_type(),
            fingerprint: [0; 32],
            cost: 0,
            subtypes: 0,
        }
    }

    pub fn type_mask(&self) -> u32 {
        self.condition_type.id.bit() | self.subtypes
    }

    /// `[typeId] { [0] fingerprint, [1] cost, [2] subtypes }`, the last
    /// field only for compound types.
    pub(crate) fn write_condition(&self, out: &mut Vec<u8>) -> Result<()> {
        let mut content = Vec::with_capacity(48);
        der::write_tlv(&mut content, Tag::primitive(0), &self.fingerprint);
        der::write_tlv(&mut content, Tag::primitive(1), &der::encode_uint(self.cost));
        if self.condition_type.has_subtypes {
            let subtypes = self.subtypes & !self.condition_type.id.bit();
            der::write_tlv(&mut content, Tag::primitive(2), &der::encode_bits(subtypes));
        }
        codec::write_bounded(out, Tag::constructed(self.condition_type.id.id()), &content)
    }

    pub(crate) fn read_condition(r: &mut Reader<'_>) -> std::result::Result<Self, DecodeError> {
        let (tag, content) = r.read_tlv()?;
        let condition_type =
            registry::lookup(tag.number).map_err(|_| DecodeError::UnknownType(tag.number))?;
        if !tag.constructed {
            return Err(DecodeError::UnexpectedTag {
                expected: Tag::constructed(tag.number),
                found: tag,
            });
        }

        let mut fields = Reader::new(content);
        let fingerprint = fields.expect_array(Tag::primitive(0), "fingerprint")?;
        let cost = der::decode_uint(fields.expect(Tag::primitive(1))?)?;
        let subtypes = if condition_type.has_subtypes {
            der::decode_bits(fields.expect(Tag::primitive(2))?)?
        } else {
            0
        };
        fields.finish()?;

        if subtypes & condition_type.id.bit() != 0 {
            return Err(DecodeError::BitString);
        }
        Ok(Self {
            condition_type,
            fingerprint,
            cost,
            subtypes,
        })
    }
}
