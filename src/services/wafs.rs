//! Orchestrator: owns the WAF target map, runs the pre-flight checks, and
//! drives the loader → dispatcher → recorder pipeline across the full
//! test-case × WAF matrix.

use std::collections::BTreeMap;
use std::path::PathBuf;

use sqlx::SqlitePool;

use crate::config::{
    RunPaths, WafTargets, DB_TABLE_NAME, FAST_MODE_SAMPLE_FRACTION, FAST_MODE_SEED,
};
use crate::corpus;
use crate::db;
use crate::errors::AppError;
use crate::models::{DatasetType, TestCase};
use crate::report::render_table;
use crate::services::dispatch::dispatch;
use crate::services::recorder::{BatchMeta, ResultRecorder};
use crate::services::sender::RequestSender;

const HEALTH_CHECK_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:105.0) Gecko/20100101 Firefox/105.0";

/// Obvious script-injection probe every WAF in prevention mode must block.
const FUNCTIONAL_CHECK_QUERY: &str = "/?a=<script>alert(1)</script>";

/// Outcome of the two pre-flight checks for one WAF.
#[derive(Debug, Clone)]
struct CheckResult {
    waf_name: String,
    url: String,
    health_ok: bool,
    functional_ok: bool,
}

/// Handles all WAF related operations: health checks, payload dispatch,
/// and result recording.
pub struct Wafs {
    targets: WafTargets,
    sender: RequestSender,
    max_workers: usize,
    fast_mode: bool,
}

impl Wafs {
    pub fn new(targets: WafTargets, max_workers: usize, fast_mode: bool) -> Self {
        Self {
            targets,
            sender: RequestSender::new(),
            max_workers,
            fast_mode,
        }
    }

    /// Execute one full run: pre-flight checks, then the complete
    /// test-case × WAF matrix. Reporting is left to the caller.
    pub async fn run(&self, pool: &SqlitePool, paths: &RunPaths) -> Result<(), AppError> {
        self.check_connection().await?;
        self.send_payloads(pool, paths).await
    }

    /// Perform health and functionality checks for all WAFs, printing a
    /// summary table. Any failing check aborts the run before any payload
    /// is dispatched or the store is touched.
    pub async fn check_connection(&self) -> Result<(), AppError> {
        tracing::debug!(
            "Initiating WAF health and functionality checks to verify connectivity and confirm prevention mode"
        );
        let mut results = Vec::with_capacity(self.targets.len());

        for waf in self.targets.iter() {
            // Health check: a benign browser-like GET must pass through.
            let mut headers = BTreeMap::new();
            headers.insert("User-Agent".to_string(), HEALTH_CHECK_USER_AGENT.to_string());
            let outcome = self.sender.send("GET", &waf.url, Some(&headers), None).await;
            let health_ok = outcome.status_code == 200;
            if health_ok {
                tracing::info!(waf = %waf.name, "Health check passed");
            } else {
                tracing::error!(
                    waf = %waf.name,
                    url = %waf.url,
                    status = outcome.status_code,
                    "Health check failed, please ensure the WAF allows a plain GET to its base URL"
                );
            }

            // Functional check: an obvious script injection must be blocked.
            let probe = format!("{}{FUNCTIONAL_CHECK_QUERY}", waf.url);
            let outcome = self.sender.send("GET", &probe, None, None).await;
            let functional_ok = outcome.blocked;
            if functional_ok {
                tracing::info!(waf = %waf.name, "WAF functionality check passed");
            } else {
                tracing::error!(
                    waf = %waf.name,
                    payload = %probe,
                    "WAF functionality check failed, please ensure the WAF blocks this payload"
                );
            }

            results.push(CheckResult {
                waf_name: waf.name.clone(),
                url: waf.url.clone(),
                health_ok,
                functional_ok,
            });
        }

        let rows: Vec<Vec<String>> = results
            .iter()
            .map(|r| {
                vec![
                    r.waf_name.clone(),
                    r.url.clone(),
                    if r.health_ok { "✓" } else { "✗" }.to_string(),
                    if r.functional_ok { "✓" } else { "✗" }.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            render_table(
                "WAF Health & Functional Check Summary",
                &["Waf Name", "URL", "Health Check", "Functional Check"],
                &rows,
            )
        );

        let failed: Vec<&CheckResult> = results
            .iter()
            .filter(|r| !r.health_ok || !r.functional_ok)
            .collect();
        if failed.is_empty() {
            tracing::debug!("All checks have been successfully completed");
            Ok(())
        } else {
            Err(AppError::HealthCheck(format!(
                "{} WAF(s) failed health or functionality checks: {}. \
                 Verify the URLs are reachable and the WAFs run in prevention mode.",
                failed.len(),
                failed
                    .iter()
                    .map(|r| r.waf_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }

    /// Send every test case to every WAF, recording one batch per pair.
    /// Clears the previous run's results first.
    pub async fn send_payloads(&self, pool: &SqlitePool, paths: &RunPaths) -> Result<(), AppError> {
        if self.targets.is_empty() {
            return Err(AppError::Config(
                "WAF configuration is empty, nothing to run.".to_string(),
            ));
        }

        db::drop_table_if_exists(pool, DB_TABLE_NAME).await?;

        let recorder = ResultRecorder::new(pool.clone());
        let matrix = self.test_case_matrix(paths);
        if matrix.is_empty() {
            tracing::warn!(
                datasets = %paths.datasets.display(),
                "No test-case fixtures found, the run will produce no results"
            );
        }
        tracing::info!("Starting to send legitimate & malicious requests to WAFs...");

        for (dataset_type, file) in matrix {
            let mut payloads = corpus::load_test_case(&file)?;
            if self.fast_mode {
                payloads = corpus::sample_payloads(&payloads, FAST_MODE_SAMPLE_FRACTION, FAST_MODE_SEED);
            }
            let test_case = TestCase {
                name: TestCase::name_from_path(&file),
                dataset_type,
                payloads,
            };

            for waf in self.targets.iter() {
                tracing::info!(
                    waf = %waf.name,
                    test = %test_case.name,
                    dataset = %dataset_type,
                    payloads = test_case.payloads.len(),
                    "Dispatching test case"
                );
                let outcomes =
                    dispatch(&self.sender, &test_case.payloads, &waf.url, self.max_workers).await?;
                recorder
                    .record(
                        &test_case.payloads,
                        &outcomes,
                        &BatchMeta {
                            waf_name: &waf.name,
                            destination_url: &waf.url,
                            test_name: &test_case.name,
                            dataset_type,
                        },
                    )
                    .await?;
            }
        }

        tracing::info!("Finished sending legitimate & malicious requests.");
        Ok(())
    }

    /// All (dataset type, fixture file) pairs for one run: the malicious
    /// corpus first, then the legitimate one. Each file appears exactly
    /// once.
    fn test_case_matrix(&self, paths: &RunPaths) -> Vec<(DatasetType, PathBuf)> {
        let mut matrix: Vec<(DatasetType, PathBuf)> = corpus::test_case_files(&paths.malicious)
            .into_iter()
            .map(|f| (DatasetType::Malicious, f))
            .collect();
        matrix.extend(
            corpus::test_case_files(&paths.legitimate)
                .into_iter()
                .map(|f| (DatasetType::Legitimate, f)),
        );
        matrix
    }
}
