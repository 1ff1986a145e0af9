//! JSON files holding condition trees, and hex arguments.

use std::fs::File;
use std::path::Path;

use anyhow::Context;
use cryptoconditions_core::{json, Condition};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CliError, Result};

/// Reads a JSON-encoded file from the given `path` and deserializes into type `T`.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be opened, read, or parsed.
pub fn load_json_data<P, T>(path: P) -> anyhow::Result<T>
where
    P: AsRef<Path>,
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let content =
        std::fs::read_to_string(path).with_context(|| format!("loading data: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("parsing JSON from {:?}", path))
}

/// Writes `data` (serializable) as pretty-printed JSON to the given `path`.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be created or data cannot be serialized.
pub fn save_json_data<P, T>(path: P, data: &T) -> anyhow::Result<()>
where
    P: AsRef<Path>,
    T: Serialize,
{
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating file {:?}", path))?;
    serde_json::to_writer_pretty(file, data)
        .with_context(|| format!("serializing to JSON to {:?}", path))
}

/// Loads a tree and checks its invariants.
pub fn load_tree<P: AsRef<Path>>(path: P) -> anyhow::Result<Condition> {
    let path = path.as_ref();
    let value: serde_json::Value = load_json_data(path)?;
    json::to_tree(value).with_context(|| format!("invalid condition tree in {:?}", path))
}

pub fn save_tree<P: AsRef<Path>>(path: P, tree: &Condition) -> anyhow::Result<()> {
    save_json_data(path, &json::from_tree(tree)?)
}

pub fn parse_hex(field: &'static str, s: &str) -> Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|source| CliError::Hex { field, source })
}

/// Hex argument that must decode to exactly `N` bytes.
pub fn parse_hex_array<const N: usize>(field: &'static str, s: &str) -> Result<[u8; N]> {
    let bytes = parse_hex(field, s)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| CliError::Length {
        field,
        expected: N,
        actual: bytes.len(),
    })
}
