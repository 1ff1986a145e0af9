//! Process-wide table of the condition types this crate understands.
//!
//! The table is built once on first use and never mutated afterwards, so
//! every lookup after initialization is a plain shared read.

use std::fmt;
use std::sync::OnceLock;

use crate::condition::{Condition, Ed25519, Eval, Falcon512, Preimage, Prefix, Secp256k1, Threshold};
use crate::error::Error;
use crate::Result;

/// Wire identifier of a registered condition type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TypeId {
    Preimage = 0,
    Prefix = 1,
    Threshold = 2,
    Ed25519 = 4,
    Secp256k1 = 5,
    Eval = 15,
    Falcon512 = 31,
}

impl TypeId {
    /// Every registered type, in ascending id order.
    pub const ALL: [TypeId; 7] = [
        TypeId::Preimage,
        TypeId::Prefix,
        TypeId::Threshold,
        TypeId::Ed25519,
        TypeId::Secp256k1,
        TypeId::Eval,
        TypeId::Falcon512,
    ];

    pub const fn id(self) -> u32 {
        self as u32
    }

    /// Bit of this type in a type mask.
    pub const fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub fn from_id(id: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.id() == id)
            .ok_or(Error::UnknownType(id))
    }

    /// The registry entry for this type.
    pub fn cond_type(self) -> &'static CondType {
        let index = match self {
            TypeId::Preimage => 0,
            TypeId::Prefix => 1,
            TypeId::Threshold => 2,
            TypeId::Ed25519 => 3,
            TypeId::Secp256k1 => 4,
            TypeId::Eval => 5,
            TypeId::Falcon512 => 6,
        };
        &registry()[index]
    }

    /// Types present in `mask`, in ascending id order.
    pub fn from_mask(mask: u32) -> impl Iterator<Item = TypeId> {
        Self::ALL.into_iter().filter(move |t| mask & t.bit() != 0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cond_type().name)
    }
}

/// Operation set registered for one condition type.
pub struct CondType {
    pub id: TypeId,
    /// Name used in JSON and condition URIs.
    pub name: &'static str,
    /// Whether the condition encoding carries a subtypes bit string.
    pub has_subtypes: bool,
    new: fn() -> Condition,
}

impl CondType {
    /// A zero-valued node of this type.
    pub fn new_node(&self) -> Condition {
        (self.new)()
    }
}

impl fmt::Debug for CondType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CondType")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("has_subtypes", &self.has_subtypes)
            .finish()
    }
}

impl PartialEq for CondType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CondType {}

fn registry() -> &'static [CondType; 7] {
    static REGISTRY: OnceLock<[CondType; 7]> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        [
            CondType {
                id: TypeId::Preimage,
                name: "preimage-sha-256",
                has_subtypes: false,
                new: || Condition::Preimage(Preimage::default()),
            },
            CondType {
                id: TypeId::Prefix,
                name: "prefix-sha-256",
                has_subtypes: true,
                new: || Condition::Prefix(Prefix::default()),
            },
            CondType {
                id: TypeId::Threshold,
                name: "threshold-sha-256",
                has_subtypes: true,
                new: || Condition::Threshold(Threshold::default()),
            },
            CondType {
                id: TypeId::Ed25519,
                name: "ed25519-sha-256",
                has_subtypes: false,
                new: || Condition::Ed25519(Ed25519::default()),
            },
            CondType {
                id: TypeId::Secp256k1,
                name: "secp256k1-sha-256",
                has_subtypes: false,
                new: || Condition::Secp256k1(Secp256k1::default()),
            },
            CondType {
                id: TypeId::Eval,
                name: "eval-sha-256",
                has_subtypes: false,
                new: || Condition::Eval(Eval::default()),
            },
            CondType {
                id: TypeId::Falcon512,
                name: "falcon512-sha-256",
                has_subtypes: false,
                new: || Condition::Falcon512(Falcon512::default()),
            },
        ]
    })
}

/// Looks up the registry entry for a wire type id.
pub fn lookup(id: u32) -> Result<&'static CondType> {
    TypeId::from_id(id).map(TypeId::cond_type)
}

/// Looks up a registry entry by its JSON/URI name.
pub fn lookup_name(name: &str) -> Option<&'static CondType> {
    registry().iter().find(|t| t.name == name)
}

impl Condition {
    /// Allocates a zero-valued node of the given type.
    ///
    /// Zero-valued signature nodes carry no signature, and a zero-valued
    /// prefix wraps an anonymous placeholder that never verifies.
    pub fn new(id: u32) -> Result<Self> {
        lookup(id).map(CondType::new_node)
    }
}
