use thiserror::Error;

use crate::codec::MAX_BINARY_CC_SIZE;
use crate::der::Tag;
use crate::registry::TypeId;

/// Errors produced by condition construction, encoding and verification.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The type id is not in the registry.
    #[error("unknown condition type id: {0}")]
    UnknownType(u32),

    /// Wire or JSON input could not be decoded.
    #[error("malformed encoding: {0}")]
    MalformedEncoding(#[from] DecodeError),

    /// Encoding would exceed the binary size ceiling.
    #[error("encoding of {0} bytes exceeds the {limit} byte limit", limit = MAX_BINARY_CC_SIZE)]
    SizeExceeded(usize),

    /// A fulfillment was requested from a node that lacks proof material.
    #[error("{0} node is not fulfilled")]
    NotFulfilled(TypeId),

    /// The re-derived condition differs from the expected one.
    #[error("fulfillment does not match the expected condition")]
    ConditionMismatch,

    /// A proof was present but did not hold.
    #[error("invalid proof: {0}")]
    InvalidProof(#[from] ProofError),

    /// A node breaks a structural invariant.
    #[error("invalid structure: {0}")]
    InvalidStructure(#[from] StructureError),
}

/// Reasons a binary or JSON encoding is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("input of {0} bytes exceeds the size limit")]
    TooLarge(usize),

    #[error("unexpected end of input")]
    Truncated,

    #[error("{0} trailing bytes after encoding")]
    TrailingBytes(usize),

    #[error("unsupported length form")]
    UnsupportedLength,

    #[error("non-minimal length encoding")]
    NonMinimalLength,

    #[error("declared length {declared} exceeds the remaining {remaining} bytes")]
    LengthOverrun { declared: usize, remaining: usize },

    #[error("tag class {0:#04x} is not context-specific")]
    UnexpectedClass(u8),

    #[error("expected tag {expected}, found {found}")]
    UnexpectedTag { expected: Tag, found: Tag },

    #[error("unknown condition type id: {0}")]
    UnknownType(u32),

    #[error("invalid integer encoding")]
    Integer,

    #[error("invalid bit string encoding")]
    BitString,

    #[error("{field} must be {expected} bytes, got {actual}")]
    FieldLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[cfg(feature = "json")]
    #[error("json: {0}")]
    Json(String),
}

/// Reasons a present proof fails verification.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProofError {
    #[error("{0} signature is missing")]
    MissingSignature(TypeId),

    #[error("{0} public key cannot be decoded")]
    InvalidPublicKey(TypeId),

    #[error("{0} signature cannot be decoded")]
    InvalidSignature(TypeId),

    #[error("{0} signature verification failed")]
    VerificationFailed(TypeId),

    #[error("secp256k1 leaves need a 32 byte digest, got a {0} byte message")]
    DigestLength(usize),

    #[error("needed at least {required} passes, but only {satisfied} succeeded")]
    ThresholdNotMet { required: u32, satisfied: u32 },

    #[error("eval predicate rejected")]
    EvalRejected,

    #[error("{0} condition carries no proof")]
    Unfulfilled(TypeId),
}

/// Structural invariant violations.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum StructureError {
    #[error("threshold {threshold} exceeds {size} subconditions")]
    ThresholdExceedsSize { threshold: u32, size: usize },

    #[error("{0} subconditions exceed the limit of 255")]
    TooManySubconditions(usize),

    #[error("{kind} public key of {len} bytes is invalid")]
    PublicKey { kind: TypeId, len: usize },

    #[error("{kind} signature of {len} bytes is invalid")]
    Signature { kind: TypeId, len: usize },

    #[error("{0} secret key is invalid")]
    SecretKey(TypeId),
}
