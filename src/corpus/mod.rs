//! Fixture corpus: loading test-case files, enumerating dataset
//! directories, and the deterministic fast-mode sample.

use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use walkdir::WalkDir;

use crate::errors::AppError;
use crate::models::Payload;

/// Load one test-case fixture: a JSON array of payload objects.
///
/// A missing or malformed fixture invalidates the whole run, so the error
/// is fatal for the caller; it is never degraded to an empty list.
pub fn load_test_case(path: &Path) -> Result<Vec<Payload>, AppError> {
    let raw = fs::read_to_string(path).map_err(|e| AppError::Fixture {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| AppError::Fixture {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Recursively enumerate `*.json` test-case files under a dataset
/// directory. A missing directory yields no files.
pub fn test_case_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "json")
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// Deterministically sample a fraction of a payload list: shuffle a copy
/// with a fixed seed, then truncate to `max(1, round(len * fraction))`.
/// Same list, seed, and fraction always select the same subset in the
/// same order.
pub fn sample_payloads(payloads: &[Payload], fraction: f64, seed: u64) -> Vec<Payload> {
    let sample_size = ((payloads.len() as f64 * fraction).round() as usize).max(1);

    let mut sampled = payloads.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    sampled.shuffle(&mut rng);
    sampled.truncate(sample_size);
    sampled
}
