//! End-to-end integration test for the full comparison pipeline: mock WAF
//! endpoints, scratch dataset directories, and a scratch SQLite database.

use std::fs;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Router;
use sqlx::SqlitePool;

use waf_comparison::config::{RunPaths, WafEntry, WafTargets, DB_TABLE_NAME};
use waf_comparison::db;
use waf_comparison::services::analyzer;
use waf_comparison::services::wafs::Wafs;

/// Mock WAF in prevention mode: lets a plain GET to `/` through and
/// blocks everything else with a 403.
async fn prevention_waf(req: Request) -> impl IntoResponse {
    if req.uri().path() == "/" && req.uri().query().is_none() {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    }
}

/// Broken endpoint: answers 500 to everything, so the health check fails.
async fn broken_waf(_req: Request) -> impl IntoResponse {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Scratch run layout with one legitimate test case (2 payloads) and one
/// malicious test case (3 payloads).
fn scratch_datasets() -> (tempfile::TempDir, RunPaths) {
    let dir = tempfile::tempdir().unwrap();
    let paths = RunPaths::new(dir.path());
    paths.bootstrap().unwrap();
    fs::create_dir_all(&paths.legitimate).unwrap();
    fs::create_dir_all(&paths.malicious).unwrap();

    fs::write(
        paths.legitimate.join("browsing.json"),
        r#"[
            {"method": "GET", "url": "/home", "headers": {"User-Agent": "Mozilla/5.0"}, "data": ""},
            {"method": "GET", "url": "/about", "headers": {"Host": "stripped.example"}, "data": ""}
        ]"#,
    )
    .unwrap();
    fs::write(
        paths.malicious.join("sqli_basic.json"),
        r#"[
            {"method": "GET", "url": "/?p=1%27%20OR%201=1--", "headers": {}, "data": ""},
            {"method": "POST", "url": "/login", "headers": {"Content-Type": "application/x-www-form-urlencoded"}, "data": "u=admin'--"},
            {"method": "GET", "url": "/?p=<script>alert(1)</script>", "headers": {}, "data": ""}
        ]"#,
    )
    .unwrap();

    (dir, paths)
}

async fn pool_for(paths: &RunPaths) -> SqlitePool {
    db::create_pool(&paths.db_file).await.unwrap()
}

#[tokio::test]
async fn full_run_records_every_pair_exactly_once() {
    let base_url = spawn_server(Router::new().fallback(prevention_waf)).await;
    let (_dir, paths) = scratch_datasets();
    let pool = pool_for(&paths).await;

    let targets = WafTargets::new(vec![WafEntry {
        name: "TestWAF".to_string(),
        url: base_url,
    }])
    .unwrap();

    Wafs::new(targets, 4, false).run(&pool, &paths).await.unwrap();

    let total: i64 = sqlx::query_scalar(&format!(r#"SELECT COUNT(*) FROM "{DB_TABLE_NAME}""#))
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 5);

    let blocked: i64 = sqlx::query_scalar(&format!(
        r#"SELECT COUNT(*) FROM "{DB_TABLE_NAME}" WHERE isBlocked = 1"#
    ))
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(blocked, 5, "the mock WAF blocks every payload");

    for (dataset_type, expected) in [("Legitimate", 2), ("Malicious", 3)] {
        let count: i64 = sqlx::query_scalar(&format!(
            r#"SELECT COUNT(*) FROM "{DB_TABLE_NAME}" WHERE DataSetType = ?1"#
        ))
        .bind(dataset_type)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(count, expected, "{dataset_type} row count");
    }

    // The unmapped malicious test case falls back to its own name.
    let categories: Vec<String> = sqlx::query_scalar(&format!(
        r#"SELECT DISTINCT Category FROM "{DB_TABLE_NAME}" WHERE DataSetType = 'Malicious'"#
    ))
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(categories, vec!["sqli_basic".to_string()]);

    // A WAF that blocks everything: perfect TPR, zero TNR.
    let metrics = analyzer::accuracy_metrics(&pool).await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].true_positive_rate, 100.0);
    assert_eq!(metrics[0].true_negative_rate, 0.0);
    assert_eq!(metrics[0].balanced_accuracy, 50.0);
}

#[tokio::test]
async fn rerun_clears_previous_results_before_appending() {
    let base_url = spawn_server(Router::new().fallback(prevention_waf)).await;
    let (_dir, paths) = scratch_datasets();
    let pool = pool_for(&paths).await;

    let targets = WafTargets::new(vec![WafEntry {
        name: "TestWAF".to_string(),
        url: base_url,
    }])
    .unwrap();
    let wafs = Wafs::new(targets, 4, false);

    wafs.run(&pool, &paths).await.unwrap();
    wafs.run(&pool, &paths).await.unwrap();

    let total: i64 = sqlx::query_scalar(&format!(r#"SELECT COUNT(*) FROM "{DB_TABLE_NAME}""#))
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 5, "old rows are dropped, not appended to");
}

#[tokio::test]
async fn fast_mode_samples_each_test_case() {
    let base_url = spawn_server(Router::new().fallback(prevention_waf)).await;
    let (_dir, paths) = scratch_datasets();
    let pool = pool_for(&paths).await;

    let targets = WafTargets::new(vec![WafEntry {
        name: "TestWAF".to_string(),
        url: base_url,
    }])
    .unwrap();

    Wafs::new(targets, 4, true).run(&pool, &paths).await.unwrap();

    // 15% of tiny test cases rounds down to the 1-payload floor.
    let total: i64 = sqlx::query_scalar(&format!(r#"SELECT COUNT(*) FROM "{DB_TABLE_NAME}""#))
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(total, 2);
}

#[tokio::test]
async fn failing_health_check_aborts_before_any_write() {
    let base_url = spawn_server(Router::new().fallback(broken_waf)).await;
    let (_dir, paths) = scratch_datasets();
    let pool = pool_for(&paths).await;

    let targets = WafTargets::new(vec![WafEntry {
        name: "BrokenWAF".to_string(),
        url: base_url,
    }])
    .unwrap();

    let err = Wafs::new(targets, 4, false)
        .run(&pool, &paths)
        .await
        .unwrap_err();
    assert!(err.is_health_check());
    assert!(err.to_string().contains("BrokenWAF"));

    // The run aborted before the store was mutated.
    assert!(!db::table_exists(&pool, DB_TABLE_NAME).await.unwrap());
}

#[tokio::test]
async fn health_check_requires_blocking_the_probe() {
    // A pass-through endpoint answers 200 to everything: health passes
    // but the functional check fails.
    async fn pass_through(_req: Request) -> impl IntoResponse {
        StatusCode::OK
    }
    let base_url = spawn_server(Router::new().fallback(pass_through)).await;
    let (_dir, paths) = scratch_datasets();
    let pool = pool_for(&paths).await;

    let targets = WafTargets::new(vec![WafEntry {
        name: "DetectOnlyWAF".to_string(),
        url: base_url,
    }])
    .unwrap();

    let err = Wafs::new(targets, 4, false)
        .run(&pool, &paths)
        .await
        .unwrap_err();
    assert!(err.is_health_check());
}
