//! Payload fixtures and their grouping into test cases.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// One synthetic HTTP request used as a test stimulus. Immutable once
/// loaded from its fixture file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payload {
    pub method: String,
    /// Path + query, relative to the WAF base URL.
    pub url: String,
    /// Header map as read from the fixture, key-sorted so its serialized
    /// form is canonical. A literal `Host` entry is stripped by the sender
    /// so the transport derives it from the destination.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Request body, possibly empty.
    #[serde(default)]
    pub data: String,
}

/// Whether a test case holds benign or attack traffic. Stored as text in
/// the results table under `DataSetType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetType {
    Legitimate,
    Malicious,
}

impl DatasetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legitimate => "Legitimate",
            Self::Malicious => "Malicious",
        }
    }
}

impl std::fmt::Display for DatasetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named group of payloads sharing one scenario, identified by the
/// fixture file stem and its parent dataset type.
#[derive(Debug, Clone)]
pub struct TestCase {
    pub name: String,
    pub dataset_type: DatasetType,
    pub payloads: Vec<Payload>,
}

impl TestCase {
    /// Derive the stable test-case name from a fixture path, e.g.
    /// `.../Malicious/sqli.json` → `sqli`.
    pub fn name_from_path(path: &Path) -> String {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
