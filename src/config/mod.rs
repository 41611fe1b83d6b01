//! Runner configuration: filesystem layout, tuning constants, and the
//! validated WAF target map.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Results database table that collects one row per (payload, WAF) execution.
pub const DB_TABLE_NAME: &str = "waf_comparison";

/// Per-request timeout for payload and health-check sends.
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(500);

/// Total attempts per request before degrading to the `(0, false)` sentinel.
pub const SEND_ATTEMPTS: u32 = 3;

/// Default number of concurrent workers per dispatched batch.
pub const MAX_WORKERS: usize = 4;

/// Constant seed for reproducible shuffling in fast mode.
pub const FAST_MODE_SEED: u64 = 42;

/// Fraction of each test case kept in fast mode.
pub const FAST_MODE_SAMPLE_FRACTION: f64 = 0.15;

/// Filesystem layout of a run: where datasets, the database, and the saved
/// WAF config live. Kept as a value (not globals) so tests can point the
/// whole pipeline at a scratch directory.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub results: PathBuf,
    pub datasets: PathBuf,
    pub legitimate: PathBuf,
    pub malicious: PathBuf,
    pub db_dir: PathBuf,
    pub db_file: PathBuf,
    pub wafs_config_file: PathBuf,
}

impl RunPaths {
    /// Standard layout rooted at `results/`.
    pub fn new(results: impl Into<PathBuf>) -> Self {
        let results = results.into();
        let datasets = results.join("datasets");
        let db_dir = results.join("db");
        Self {
            legitimate: datasets.join("Legitimate"),
            malicious: datasets.join("Malicious"),
            db_file: db_dir.join("waf_comparison.sqlite"),
            wafs_config_file: db_dir.join("wafs_config.json"),
            datasets,
            db_dir,
            results,
        }
    }

    /// Create the results, database, and datasets directories if missing.
    pub fn bootstrap(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.results)?;
        fs::create_dir_all(&self.db_dir)?;
        fs::create_dir_all(&self.datasets)?;
        Ok(())
    }
}

impl Default for RunPaths {
    fn default() -> Self {
        Self::new("results")
    }
}

/// Validated WAF name ↔ URL map. The mapping is bijective: construction
/// fails on a duplicate name or a duplicate URL instead of letting a later
/// entry silently overwrite an earlier one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<WafEntry>", into = "Vec<WafEntry>")]
pub struct WafTargets {
    entries: Vec<WafEntry>,
}

/// One configured WAF under test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WafEntry {
    pub name: String,
    pub url: String,
}

impl WafTargets {
    pub fn new(entries: Vec<WafEntry>) -> Result<Self, AppError> {
        let mut names: HashSet<&str> = HashSet::with_capacity(entries.len());
        let mut urls: HashSet<&str> = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !names.insert(entry.name.as_str()) {
                return Err(AppError::Config(format!(
                    "Duplicate WAF name '{}'. Each WAF name must be unique.",
                    entry.name
                )));
            }
            if !urls.insert(entry.url.as_str()) {
                return Err(AppError::Config(format!(
                    "Duplicate WAF URL '{}'. Each WAF URL must be unique.",
                    entry.url
                )));
            }
        }
        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate targets in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &WafEntry> {
        self.entries.iter()
    }

    /// Inverse lookup, valid because URLs are unique by construction.
    pub fn name_by_url(&self, url: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.url == url)
            .map(|e| e.name.as_str())
    }

    /// Load a previously saved WAF config file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            AppError::Config(format!("Invalid WAF config file {}: {e}", path.display()))
        })
    }

    /// Persist the config next to the database so a later analyze-only run
    /// can reuse it.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let raw = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Internal(format!("Failed to serialize WAF config: {e}")))?;
        fs::write(path, raw)?;
        Ok(())
    }
}

impl TryFrom<Vec<WafEntry>> for WafTargets {
    type Error = AppError;

    fn try_from(entries: Vec<WafEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<WafTargets> for Vec<WafEntry> {
    fn from(targets: WafTargets) -> Self {
        targets.entries
    }
}
