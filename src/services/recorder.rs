//! Result recorder: enriches dispatch outcomes with run metadata and
//! appends them to the results table as one atomic batch.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;

use crate::config::DB_TABLE_NAME;
use crate::db;
use crate::errors::AppError;
use crate::models::{DatasetType, Payload};
use crate::services::sender::SendOutcome;

/// Static TestName → attack/traffic category table, shipped with the
/// binary.
const CATEGORY_MAPPING: &str = include_str!("../../assets/file_category_mapping.json");

/// Metadata shared by every row of one recorded batch.
#[derive(Debug, Clone)]
pub struct BatchMeta<'a> {
    pub waf_name: &'a str,
    pub destination_url: &'a str,
    pub test_name: &'a str,
    pub dataset_type: DatasetType,
}

/// Writes labeled result batches to the persistent store.
pub struct ResultRecorder {
    pool: SqlitePool,
    machine_name: String,
    categories: HashMap<String, String>,
}

impl ResultRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        let categories: HashMap<String, String> = serde_json::from_str(CATEGORY_MAPPING)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Invalid bundled category mapping, categories disabled");
                HashMap::new()
            });
        Self {
            pool,
            machine_name: sysinfo::System::host_name().unwrap_or_else(|| "unknown".to_string()),
            categories,
        }
    }

    /// Append one batch: one row per payload/outcome pair, in order, with
    /// `TestId` running 1..=N within the batch. The insert is wrapped in a
    /// transaction so a crash mid-write never leaves a partial batch.
    pub async fn record(
        &self,
        payloads: &[Payload],
        outcomes: &[SendOutcome],
        meta: &BatchMeta<'_>,
    ) -> Result<(), AppError> {
        // Batch size in must equal batch size out; a silent zip-truncation
        // here would corrupt the aggregate metrics.
        if payloads.len() != outcomes.len() {
            return Err(AppError::Internal(format!(
                "Batch size mismatch: {} payloads but {} outcomes for test '{}'",
                payloads.len(),
                outcomes.len(),
                meta.test_name
            )));
        }

        db::ensure_results_table(&self.pool).await?;

        let now = Utc::now();
        let category = self.resolve_category(meta.test_name, meta.dataset_type);

        let mut tx = self.pool.begin().await?;
        for (i, (payload, outcome)) in payloads.iter().zip(outcomes).enumerate() {
            let headers = serde_json::to_string(&payload.headers)
                .map_err(|e| AppError::Internal(format!("Failed to serialize headers: {e}")))?;

            sqlx::query(&format!(
                r#"
                INSERT INTO "{DB_TABLE_NAME}" (
                    method, url, headers, data,
                    machineName, DestinationURL, WAF_Name, DateTime,
                    TestName, DataSetType, TestId, Category,
                    response_status_code, isBlocked
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#
            ))
            .bind(&payload.method)
            .bind(sanitize(&payload.url))
            .bind(&headers)
            .bind(sanitize(&payload.data))
            .bind(&self.machine_name)
            .bind(meta.destination_url)
            .bind(meta.waf_name)
            .bind(now)
            .bind(meta.test_name)
            .bind(meta.dataset_type.as_str())
            .bind((i + 1) as i64)
            .bind(category.as_deref())
            .bind(i64::from(outcome.status_code))
            .bind(outcome.blocked)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::debug!(
            waf = meta.waf_name,
            test = meta.test_name,
            rows = payloads.len(),
            "Recorded batch"
        );
        Ok(())
    }

    /// Look up the category for a test case. Malicious cases without a
    /// mapping fall back to their own name; legitimate ones stay unmapped.
    fn resolve_category(&self, test_name: &str, dataset_type: DatasetType) -> Option<String> {
        match self.categories.get(test_name) {
            Some(category) => Some(category.clone()),
            None if dataset_type == DatasetType::Malicious => Some(test_name.to_string()),
            None => None,
        }
    }
}

/// Replace NUL characters with U+FFFD so every value stays storable as a
/// text column.
fn sanitize(value: &str) -> String {
    if value.contains('\0') {
        value.replace('\0', "\u{FFFD}")
    } else {
        value.to_string()
    }
}
