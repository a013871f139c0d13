/// Decoder for the JSON document printed by `gocov test`.
///
/// Reference: https://github.com/axw/gocov
///
/// Format:
///   {"Packages": [{"Name": "...", "Functions": [{"Name": "...", "File": "...",
///     "Start": N, "End": N, "Statements": [{"Start": N, "End": N, "Reached": N}]}]}]}
///
/// Offsets are bytes from the beginning of the source file. gocov writes
/// `null` for empty lists, which decodes here as an empty `Vec`.
use serde::{Deserialize, Deserializer};

use crate::error::Result;

/// One complete collector run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoverageRun {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub packages: Vec<Package>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Package {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub functions: Vec<RawFunction>,
}

/// A function as reported by gocov, before normalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawFunction {
    pub name: String,
    pub file: String,
    pub start: usize,
    pub end: usize,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub statements: Vec<RawStatement>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawStatement {
    pub start: usize,
    pub end: usize,
    pub reached: u64,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse gocov JSON from raw bytes.
pub fn parse(input: &[u8]) -> Result<CoverageRun> {
    Ok(serde_json::from_slice(input)?)
}
