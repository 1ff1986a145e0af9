/// Binary encoding of conditions and fulfillments
pub mod codec;
/// Condition tree data structures
/// and per-type operations
pub mod condition;
mod der;
pub mod error;
/// Registry of supported condition types
pub mod registry;
mod sign;
mod uri;
mod verify;
mod visit;

/// JSON view of condition trees
#[cfg(feature = "json")]
pub mod json;
#[cfg(feature = "json")]
pub mod serde;

pub use codec::MAX_BINARY_CC_SIZE;
pub use condition::{
    Anon, Condition, Ed25519, Eval, Falcon512, Preimage, Prefix, Secp256k1, Threshold,
};
pub use der::Tag;
pub use error::{DecodeError, Error, ProofError, StructureError};
pub use registry::{CondType, TypeId};
pub use sign::Secp256k1Key;
pub use verify::{EvalVerifier, RejectEvals, VerifyOptions};
pub use visit::{Iter, Visit, Visitor};

pub type Result<T> = std::result::Result<T, Error>;
