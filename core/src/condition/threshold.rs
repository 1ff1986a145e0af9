#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Anon, Condition};
use crate::codec::{self, Mode};
use crate::der::{self, Reader, Tag};
use crate::error::{DecodeError, Error, ProofError, StructureError};
use crate::registry::TypeId;
use crate::verify::Verification;
use crate::Result;

/// Overhead charged per subcondition, used or not.
pub const THRESHOLD_COST_PER_SUBCONDITION: u64 = 1024;

const MAX_SUBCONDITIONS: usize = u8::MAX as usize;

/// N-of-M threshold condition.
///
/// Satisfied when at least `threshold` of the `subconditions` verify
/// successfully. Subconditions can be any [`Condition`] variant,
/// including nested thresholds and anonymous placeholders, which never
/// count towards the threshold.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Threshold {
    /// Minimum number of valid subconditions required.
    pub threshold: u32,

    /// Subconditions to evaluate.
    #[cfg_attr(feature = "json", serde(rename = "subfulfillments"))]
    pub subconditions: Vec<Condition>,
}

impl Threshold {
    pub fn size(&self) -> usize {
        self.subconditions.len()
    }

    pub(crate) fn check(&self) -> std::result::Result<(), StructureError> {
        if self.size() > MAX_SUBCONDITIONS {
            return Err(StructureError::TooManySubconditions(self.size()));
        }
        if self.threshold as usize > self.size() {
            return Err(StructureError::ThresholdExceedsSize {
                threshold: self.threshold,
                size: self.size(),
            });
        }
        Ok(())
    }

    /// SHA-256 over `SEQUENCE { [0] threshold, [1] SET OF Condition }`.
    ///
    /// Child conditions are sorted by their encoding, so the order in
    /// which the tree was built does not affect the fingerprint.
    pub fn fingerprint(&self) -> Result<[u8; 32]> {
        self.check()?;
        let mut conditions = self
            .subconditions
            .iter()
            .map(Condition::encode_condition)
            .collect::<Result<Vec<_>>>()?;
        conditions.sort_unstable();

        let mut content = Vec::new();
        der::write_tlv(
            &mut content,
            Tag::primitive(0),
            &der::encode_uint(u64::from(self.threshold)),
        );
        der::write_tlv(&mut content, Tag::constructed(1), &conditions.concat());
        Ok(Sha256::digest(der::sequence(&content)).into())
    }

    /// Sum of the `threshold` cheapest subconditions, plus a fixed
    /// overhead for every subcondition.
    pub fn cost(&self) -> u64 {
        let mut costs: Vec<u64> = self.subconditions.iter().map(Condition::cost).collect();
        costs.sort_unstable();
        let overhead = THRESHOLD_COST_PER_SUBCONDITION.saturating_mul(self.size() as u64);
        costs
            .into_iter()
            .take(self.threshold as usize)
            .fold(overhead, u64::saturating_add)
    }

    pub fn is_fulfilled(&self) -> bool {
        let fulfilled = self
            .subconditions
            .iter()
            .filter(|c| c.is_fulfilled())
            .count();
        fulfilled >= self.threshold as usize
    }

    /// Counts satisfied subconditions and checks against threshold.
    pub(crate) fn verify(
        &self,
        message: &[u8],
        ctx: &Verification<'_>,
    ) -> std::result::Result<(), ProofError> {
        if self.threshold == 0 {
            return Ok(());
        }
        let satisfied = self
            .subconditions
            .iter()
            .filter(|c| ctx.check(c, message).is_ok())
            .count() as u32;

        (satisfied >= self.threshold)
            .then_some(())
            .ok_or(ProofError::ThresholdNotMet {
                required: self.threshold,
                satisfied,
            })
    }

    /// Marks the `threshold` cheapest fulfilled subconditions.
    fn cheapest_fulfilled(&self) -> Vec<bool> {
        let mut order: Vec<usize> = (0..self.size()).collect();
        order.sort_by_key(|&i| self.subconditions[i].cost());

        let mut chosen = vec![false; self.size()];
        order
            .into_iter()
            .filter(|&i| self.subconditions[i].is_fulfilled())
            .take(self.threshold as usize)
            .for_each(|i| chosen[i] = true);
        chosen
    }

    pub(crate) fn write_fulfillment(&self, out: &mut Vec<u8>, mode: Mode) -> Result<()> {
        self.check()?;
        let mut fulfillments = Vec::new();
        let mut conditions = Vec::new();

        match mode {
            Mode::Full => {
                let chosen = self.cheapest_fulfilled();
                if chosen.iter().filter(|c| **c).count() < self.threshold as usize {
                    return Err(Error::NotFulfilled(TypeId::Threshold));
                }
                for (child, chosen) in self.subconditions.iter().zip(chosen) {
                    if chosen {
                        child.write_fulfillment(&mut fulfillments, mode)?;
                    } else {
                        child.to_anon()?.write_condition(&mut conditions)?;
                    }
                }
            }
            Mode::Partial => {
                for child in &self.subconditions {
                    match child {
                        Condition::Anon(anon) => anon.write_condition(&mut conditions)?,
                        _ => child.write_fulfillment(&mut fulfillments, mode)?,
                    }
                }
            }
        }

        let mut content = Vec::with_capacity(fulfillments.len() + conditions.len() + 12);
        codec::write_bounded(&mut content, Tag::constructed(0), &fulfillments)?;
        codec::write_bounded(&mut content, Tag::constructed(1), &conditions)?;
        if mode == Mode::Partial {
            der::write_tlv(
                &mut content,
                Tag::primitive(2),
                &der::encode_uint(u64::from(self.threshold)),
            );
        }
        codec::write_bounded(out, Tag::constructed(TypeId::Threshold.id()), &content)
    }

    /// In a full fulfillment the threshold is the number of fulfilled
    /// subconditions; a partial one carries it explicitly.
    pub(crate) fn read_fulfillment(
        content: &[u8],
        mode: Mode,
    ) -> std::result::Result<Self, DecodeError> {
        let mut r = Reader::new(content);

        let mut subconditions = Vec::new();
        let mut fulfillments = Reader::new(r.expect(Tag::constructed(0))?);
        while !fulfillments.is_empty() {
            subconditions.push(codec::read_fulfillment(&mut fulfillments, mode)?);
        }
        let fulfilled = subconditions.len();

        let mut conditions = Reader::new(r.expect(Tag::constructed(1))?);
        while !conditions.is_empty() {
            subconditions.push(Condition::Anon(Anon::read_condition(&mut conditions)?));
        }

        let threshold = match mode {
            Mode::Full => u32::try_from(fulfilled).map_err(|_| DecodeError::Integer)?,
            Mode::Partial => {
                let raw = der::decode_uint(r.expect(Tag::primitive(2))?)?;
                u32::try_from(raw).map_err(|_| DecodeError::Integer)?
            }
        };
        r.finish()?;

        let node = Self {
            threshold,
            subconditions,
        };
        node.check()?;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preimage(s: &str) -> Condition {
        Condition::preimage(s.as_bytes().to_vec())
    }

    #[test]
    fn fingerprint_is_order_independent() {
        let a = Threshold {
            threshold: 2,
            subconditions: vec![preimage("a"), preimage("b"), Condition::ed25519([1; 32])],
        };
        let b = Threshold {
            threshold: 2,
            subconditions: vec![Condition::ed25519([1; 32]), preimage("b"), preimage("a")],
        };
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        let c = Threshold {
            threshold: 1,
            ..a.clone()
        };
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }

    #[test]
    fn chooses_cheapest_fulfilled() {
        let t = Threshold {
            threshold: 2,
            subconditions: vec![
                preimage("expensive-preimage"),
                Condition::ed25519([1; 32]),
                preimage("ab"),
                preimage("abc"),
            ],
        };
        assert_eq!(t.cheapest_fulfilled(), vec![false, false, true, true]);
    }

    #[test]
    fn too_many_subconditions() {
        let t = Threshold {
            threshold: 1,
            subconditions: vec![preimage("a"); 256],
        };
        assert_eq!(t.check(), Err(StructureError::TooManySubconditions(256)));
    }

    #[test]
    fn full_encoding_needs_threshold_fulfilled() {
        let t = Threshold {
            threshold: 2,
            subconditions: vec![preimage("a"), Condition::ed25519([1; 32])],
        };
        let mut out = Vec::new();
        assert_eq!(
            t.write_fulfillment(&mut out, Mode::Full),
            Err(Error::NotFulfilled(TypeId::Threshold))
        );
        assert!(t.write_fulfillment(&mut out, Mode::Partial).is_ok());
    }
}
