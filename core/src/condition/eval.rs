#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec;
use crate::der::{self, Reader, Tag};
use crate::error::DecodeError;
use crate::registry::TypeId;
use crate::Result;

/// Cost charged for an eval predicate, whatever it does.
pub const EVAL_COST: u64 = 1_048_576;

/// Opaque predicate delegated to an [`EvalVerifier`](crate::EvalVerifier).
///
/// `code` is interpreted only by the embedding application. `fulfilled`
/// is set by a visitor pass and handed to the verifier callback; it is
/// never encoded.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Eval {
    #[cfg_attr(feature = "json", serde(with = "crate::serde::b64"))]
    pub code: Vec<u8>,

    #[cfg_attr(feature = "json", serde(skip))]
    pub fulfilled: bool,
}

impl Eval {
    pub fn fingerprint(&self) -> [u8; 32] {
        Sha256::digest(&self.code).into()
    }

    pub(crate) fn write_fulfillment(&self, out: &mut Vec<u8>) -> Result<()> {
        let mut content = Vec::with_capacity(self.code.len() + 4);
        der::write_tlv(&mut content, Tag::primitive(0), &self.code);
        codec::write_bounded(out, Tag::constructed(TypeId::Eval.id()), &content)
    }

    pub(crate) fn read_fulfillment(content: &[u8]) -> std::result::Result<Self, DecodeError> {
        let mut r = Reader::new(content);
        let code = r.expect(Tag::primitive(0))?.to_vec();
        r.finish()?;
        Ok(Self {
            code,
            fulfilled: false,
        })
    }
}
