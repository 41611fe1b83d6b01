//! Analyzer: set-based aggregate queries over the results table, rendered
//! as plain-text report tables.
//!
//! Rows with `response_status_code = 0` carry no signal (the request never
//! produced a response) and are excluded from the rate calculations.

use sqlx::SqlitePool;

use crate::config::DB_TABLE_NAME;
use crate::db;
use crate::errors::AppError;
use crate::models::{AccuracyRow, CategoryCoverageRow, DatasetCountRow};
use crate::report::render_table;

/// Per-WAF accuracy metrics, best balanced accuracy first.
pub async fn accuracy_metrics(pool: &SqlitePool) -> Result<Vec<AccuracyRow>, AppError> {
    let rows = sqlx::query_as::<_, AccuracyRow>(&format!(
        r#"
        WITH tnr AS (
            SELECT WAF_Name,
                   SUM(CASE WHEN isBlocked = 0 THEN 1.0 ELSE 0.0 END) / COUNT(*) * 100
                       AS true_negative_rate
            FROM "{DB_TABLE_NAME}"
            WHERE response_status_code != 0 AND DataSetType = 'Legitimate'
            GROUP BY WAF_Name
        ),
        tpr AS (
            SELECT WAF_Name,
                   SUM(CASE WHEN isBlocked = 1 THEN 1.0 ELSE 0.0 END) / COUNT(*) * 100
                       AS true_positive_rate
            FROM "{DB_TABLE_NAME}"
            WHERE response_status_code != 0 AND DataSetType = 'Malicious'
            GROUP BY WAF_Name
        )
        SELECT tpr.WAF_Name                                                AS waf_name,
               ROUND(tpr.true_positive_rate, 1)                            AS true_positive_rate,
               ROUND(tnr.true_negative_rate, 1)                            AS true_negative_rate,
               ROUND(100 - tnr.true_negative_rate, 1)                      AS false_positive_rate,
               ROUND(100 - tpr.true_positive_rate, 1)                      AS false_negative_rate,
               ROUND((tpr.true_positive_rate + tnr.true_negative_rate) / 2, 1)
                                                                           AS balanced_accuracy
        FROM tpr
        JOIN tnr ON tpr.WAF_Name = tnr.WAF_Name
        ORDER BY balanced_accuracy DESC
        "#
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Row count per WAF for one dataset type.
pub async fn dataset_counts(
    pool: &SqlitePool,
    dataset_type: &str,
) -> Result<Vec<DatasetCountRow>, AppError> {
    let rows = sqlx::query_as::<_, DatasetCountRow>(&format!(
        r#"
        SELECT WAF_Name AS waf_name, COUNT(*) AS row_count
        FROM "{DB_TABLE_NAME}"
        WHERE DataSetType = ?1
        GROUP BY WAF_Name
        ORDER BY WAF_Name
        "#
    ))
    .bind(dataset_type)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Blocked coverage per attack category for one WAF.
pub async fn category_coverage(
    pool: &SqlitePool,
    waf_name: &str,
) -> Result<Vec<CategoryCoverageRow>, AppError> {
    let rows = sqlx::query_as::<_, CategoryCoverageRow>(&format!(
        r#"
        SELECT Category AS category,
               ROUND(SUM(CASE WHEN isBlocked = 1 THEN 1.0 ELSE 0.0 END) / COUNT(*) * 100, 1)
                   AS blocked_rate
        FROM "{DB_TABLE_NAME}"
        WHERE DataSetType = 'Malicious' AND WAF_Name = ?1
        GROUP BY Category
        ORDER BY Category ASC
        "#
    ))
    .bind(waf_name)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Load the recorded results and print the comparison report. Warns and
/// returns cleanly when the runner has not produced a results table yet.
pub async fn analyze(pool: &SqlitePool) -> Result<(), AppError> {
    if !db::table_exists(pool, DB_TABLE_NAME).await? {
        tracing::warn!(
            table = DB_TABLE_NAME,
            "Results table does not exist, the analyzer was called before the runner"
        );
        tracing::warn!(
            "Provide '--waf-name' and '--waf-url' and run the command again to produce results"
        );
        return Ok(());
    }

    let metrics = accuracy_metrics(pool).await?;
    let rows: Vec<Vec<String>> = metrics
        .iter()
        .map(|m| {
            vec![
                m.waf_name.clone(),
                format!("{:.1}", m.true_positive_rate),
                format!("{:.1}", m.true_negative_rate),
                format!("{:.1}", m.false_positive_rate),
                format!("{:.1}", m.false_negative_rate),
                format!("{:.1}", m.balanced_accuracy),
            ]
        })
        .collect();
    println!(
        "\n{}",
        render_table(
            "WAF Comparison Results",
            &[
                "WAF Name",
                "True Positive Rate",
                "True Negative Rate",
                "False Positive Rate",
                "False Negative Rate",
                "Balanced Accuracy",
            ],
            &rows,
        )
    );

    let legitimate = dataset_counts(pool, "Legitimate").await?;
    let malicious = dataset_counts(pool, "Malicious").await?;
    let count_rows: Vec<Vec<String>> = legitimate
        .iter()
        .map(|l| {
            let malicious_count = malicious
                .iter()
                .find(|m| m.waf_name == l.waf_name)
                .map_or(0, |m| m.row_count);
            vec![
                l.waf_name.clone(),
                l.row_count.to_string(),
                malicious_count.to_string(),
            ]
        })
        .collect();
    println!(
        "\n{}",
        render_table(
            "Requests Sent Per WAF",
            &["WAF Name", "Legitimate Count", "Malicious Count"],
            &count_rows,
        )
    );

    for metric in &metrics {
        let coverage = category_coverage(pool, &metric.waf_name).await?;
        let coverage_rows: Vec<Vec<String>> = coverage
            .iter()
            .map(|c| vec![c.category.clone(), format!("{:.1}", c.blocked_rate)])
            .collect();
        println!(
            "\n{}",
            render_table(
                &format!("Blocked Attack Coverage - {}", metric.waf_name),
                &["Attack Category", "Blocked Malicious Coverage"],
                &coverage_rows,
            )
        );
    }

    Ok(())
}
