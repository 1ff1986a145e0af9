//! JSON view of condition trees.
//!
//! A convenience format for tooling and fixtures. Trees read from JSON
//! are checked against the same invariants as decoded binary trees.

use serde_json::Value;

use crate::condition::Condition;
use crate::error::{DecodeError, Error};
use crate::Result;

fn malformed(e: impl std::fmt::Display) -> Error {
    Error::MalformedEncoding(DecodeError::Json(e.to_string()))
}

/// Builds a tree from its JSON object form.
pub fn to_tree(value: Value) -> Result<Condition> {
    let tree: Condition = serde_json::from_value(value).map_err(malformed)?;
    tree.validate().map_err(malformed)?;
    Ok(tree)
}

pub fn to_tree_str(s: &str) -> Result<Condition> {
    let tree: Condition = serde_json::from_str(s).map_err(malformed)?;
    tree.validate().map_err(malformed)?;
    Ok(tree)
}

pub fn from_tree(tree: &Condition) -> Result<Value> {
    serde_json::to_value(tree).map_err(malformed)
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", json)
    }
}
