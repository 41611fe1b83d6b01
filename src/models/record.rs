//! Result rows written to and read back from the results table.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One row of the `waf_comparison` table: a payload, the WAF it was sent
/// to, and the normalized outcome. Column names follow the table schema
/// consumed by the reporting layer.
#[derive(Debug, Clone, FromRow)]
pub struct ResultRecord {
    pub method: String,
    pub url: String,
    /// Canonical JSON rendering of the payload header map.
    pub headers: String,
    pub data: String,
    #[sqlx(rename = "machineName")]
    pub machine_name: String,
    #[sqlx(rename = "DestinationURL")]
    pub destination_url: String,
    #[sqlx(rename = "WAF_Name")]
    pub waf_name: String,
    #[sqlx(rename = "DateTime")]
    pub date_time: DateTime<Utc>,
    #[sqlx(rename = "TestName")]
    pub test_name: String,
    #[sqlx(rename = "DataSetType")]
    pub dataset_type: String,
    /// 1-based sequence number, contiguous within one batch write.
    #[sqlx(rename = "TestId")]
    pub test_id: i64,
    #[sqlx(rename = "Category")]
    pub category: Option<String>,
    /// HTTP status of the response; `0` means no response was obtained
    /// after all attempts.
    pub response_status_code: i64,
    #[sqlx(rename = "isBlocked")]
    pub is_blocked: bool,
}

/// Per-WAF accuracy metrics aggregated by the analyzer. Rates are
/// percentages; rows with status code 0 are excluded as "no signal".
#[derive(Debug, Clone, FromRow)]
pub struct AccuracyRow {
    pub waf_name: String,
    pub true_positive_rate: f64,
    pub true_negative_rate: f64,
    pub false_positive_rate: f64,
    pub false_negative_rate: f64,
    pub balanced_accuracy: f64,
}

/// Row count per WAF for one dataset type.
#[derive(Debug, Clone, FromRow)]
pub struct DatasetCountRow {
    pub waf_name: String,
    pub row_count: i64,
}

/// Blocked coverage of one attack category for one WAF.
#[derive(Debug, Clone, FromRow)]
pub struct CategoryCoverageRow {
    pub category: String,
    pub blocked_rate: f64,
}
