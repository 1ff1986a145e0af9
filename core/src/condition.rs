//! The condition tree: one payload struct per condition type, wrapped in a
//! closed enum so a node can only ever hold the fields of its own type.

mod anon;
mod ed25519;
mod eval;
mod falcon512;
mod preimage;
mod prefix;
mod secp256k1;
mod threshold;

pub use anon::Anon;
pub use ed25519::{Ed25519, ED25519_COST};
pub use eval::{Eval, EVAL_COST};
pub use falcon512::{Falcon512, FALCON512_COST};
pub use preimage::Preimage;
pub use prefix::{Prefix, PREFIX_COST};
pub use secp256k1::{Secp256k1, SECP256K1_COST};
pub(crate) use secp256k1::{hash160, parse_signature};
pub use threshold::{Threshold, THRESHOLD_COST_PER_SUBCONDITION};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::registry::{CondType, TypeId};
use crate::Result;

/// A node of a condition or fulfillment tree.
///
/// Compound nodes own their children; dropping a node drops its subtree.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(tag = "type"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// SHA-256 hashlock.
    #[cfg_attr(feature = "json", serde(rename = "preimage-sha-256"))]
    Preimage(Preimage),
    /// Subcondition evaluated against `prefix || message`.
    #[cfg_attr(feature = "json", serde(rename = "prefix-sha-256"))]
    Prefix(Prefix),
    /// At least `threshold` of the subconditions must hold.
    #[cfg_attr(feature = "json", serde(rename = "threshold-sha-256"))]
    Threshold(Threshold),
    #[cfg_attr(feature = "json", serde(rename = "ed25519-sha-256"))]
    Ed25519(Ed25519),
    #[cfg_attr(feature = "json", serde(rename = "secp256k1-sha-256"))]
    Secp256k1(Secp256k1),
    /// Predicate resolved by an external verifier.
    #[cfg_attr(feature = "json", serde(rename = "eval-sha-256"))]
    Eval(Eval),
    #[cfg_attr(feature = "json", serde(rename = "falcon512-sha-256"))]
    Falcon512(Falcon512),
    /// Fingerprint-only stand-in for any subtree.
    #[cfg_attr(feature = "json", serde(rename = "condition"))]
    Anon(Anon),
}

impl Condition {
    pub fn preimage(preimage: impl Into<Vec<u8>>) -> Self {
        Self::Preimage(Preimage {
            preimage: preimage.into(),
        })
    }

    pub fn prefix(prefix: impl Into<Vec<u8>>, max_message_length: u64, subcondition: Self) -> Self {
        Self::Prefix(Prefix {
            prefix: prefix.into(),
            max_message_length,
            subcondition: Box::new(subcondition),
        })
    }

    pub fn threshold(threshold: u32, subconditions: Vec<Self>) -> Self {
        Self::Threshold(Threshold {
            threshold,
            subconditions,
        })
    }

    /// Unsigned Ed25519 leaf.
    pub fn ed25519(public_key: [u8; 32]) -> Self {
        Self::Ed25519(Ed25519 {
            public_key,
            signature: None,
        })
    }

    /// Unsigned secp256k1 leaf over a SEC1 public key.
    pub fn secp256k1(public_key: impl Into<Vec<u8>>) -> Self {
        Self::Secp256k1(Secp256k1 {
            public_key: public_key.into(),
            signature: None,
        })
    }

    pub fn eval(code: impl Into<Vec<u8>>) -> Self {
        Self::Eval(Eval {
            code: code.into(),
            fulfilled: false,
        })
    }

    /// Unsigned Falcon-512 leaf.
    pub fn falcon512(public_key: impl Into<Vec<u8>>) -> Self {
        Self::Falcon512(Falcon512 {
            public_key: public_key.into(),
            signature: None,
        })
    }

    /// Type of the node; for anonymous nodes, the type they stand in for.
    pub fn type_id(&self) -> TypeId {
        match self {
            Self::Preimage(_) => TypeId::Preimage,
            Self::Prefix(_) => TypeId::Prefix,
            Self::Threshold(_) => TypeId::Threshold,
            Self::Ed25519(_) => TypeId::Ed25519,
            Self::Secp256k1(_) => TypeId::Secp256k1,
            Self::Eval(_) => TypeId::Eval,
            Self::Falcon512(_) => TypeId::Falcon512,
            Self::Anon(anon) => anon.condition_type.id,
        }
    }

    pub fn cond_type(&self) -> &'static CondType {
        match self {
            Self::Anon(anon) => anon.condition_type,
            _ => self.type_id().cond_type(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.cond_type().name
    }

    pub fn is_anon(&self) -> bool {
        matches!(self, Self::Anon(_))
    }

    /// Direct children, in order.
    pub fn children(&self) -> &[Condition] {
        match self {
            Self::Prefix(prefix) => std::slice::from_ref(&*prefix.subcondition),
            Self::Threshold(threshold) => &threshold.subconditions,
            _ => &[],
        }
    }

    /// SHA-256 commitment to the node's content, excluding any proof.
    pub fn fingerprint(&self) -> Result<[u8; 32]> {
        match self {
            Self::Preimage(preimage) => Ok(preimage.fingerprint()),
            Self::Prefix(prefix) => prefix.fingerprint(),
            Self::Threshold(threshold) => threshold.fingerprint(),
            Self::Ed25519(ed25519) => Ok(ed25519.fingerprint()),
            Self::Secp256k1(secp256k1) => Ok(secp256k1.fingerprint()),
            Self::Eval(eval) => Ok(eval.fingerprint()),
            Self::Falcon512(falcon) => Ok(falcon.fingerprint()),
            Self::Anon(anon) => Ok(anon.fingerprint),
        }
    }

    /// Verification cost of the cheapest fulfillment of this node.
    pub fn cost(&self) -> u64 {
        match self {
            Self::Preimage(preimage) => preimage.cost(),
            Self::Prefix(prefix) => prefix.cost(),
            Self::Threshold(threshold) => threshold.cost(),
            Self::Ed25519(_) => ED25519_COST,
            Self::Secp256k1(_) => SECP256K1_COST,
            Self::Eval(_) => EVAL_COST,
            Self::Falcon512(_) => FALCON512_COST,
            Self::Anon(anon) => anon.cost,
        }
    }

    /// Types used strictly below this node, without the node's own bit.
    pub fn subtypes(&self) -> u32 {
        let own = self.type_id().bit();
        match self {
            Self::Anon(anon) => anon.subtypes & !own,
            _ => {
                self.children()
                    .iter()
                    .fold(0, |mask, child| mask | child.type_mask())
                    & !own
            }
        }
    }

    /// Union of the node's own type bit and every descendant's.
    pub fn type_mask(&self) -> u32 {
        self.type_id().bit() | self.subtypes()
    }

    /// Compresses the subtree to its fingerprint-only form.
    pub fn to_anon(&self) -> Result<Anon> {
        if let Self::Anon(anon) = self {
            return Ok(anon.clone());
        }
        Ok(Anon {
            condition_type: self.cond_type(),
            fingerprint: self.fingerprint()?,
            cost: self.cost(),
            subtypes: self.subtypes(),
        })
    }

    /// Whether the tree carries enough proof material to be encoded as
    /// a full fulfillment.
    pub fn is_fulfilled(&self) -> bool {
        match self {
            Self::Preimage(_) | Self::Eval(_) => true,
            Self::Prefix(prefix) => prefix.subcondition.is_fulfilled(),
            Self::Threshold(threshold) => threshold.is_fulfilled(),
            Self::Ed25519(ed25519) => ed25519.signature.is_some(),
            Self::Secp256k1(secp256k1) => secp256k1.signature.is_some(),
            Self::Falcon512(falcon) => falcon.signature.is_some(),
            Self::Anon(_) => false,
        }
    }

    /// Checks structural invariants over the whole tree.
    pub fn validate(&self) -> Result<()> {
        for node in self.iter() {
            match node {
                Self::Threshold(threshold) => threshold.check()?,
                Self::Secp256k1(secp256k1) => secp256k1.check()?,
                Self::Falcon512(falcon) => falcon.check()?,
                _ => {}
            }
        }
        Ok(())
    }
}
