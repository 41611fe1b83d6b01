use std::fs;

use clap::Parser;
use mimalloc::MiMalloc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use waf_comparison::config::{RunPaths, WafEntry, WafTargets, FAST_MODE_SAMPLE_FRACTION, MAX_WORKERS};
use waf_comparison::db;
use waf_comparison::errors::AppError;
use waf_comparison::services::analyzer;
use waf_comparison::services::wafs::Wafs;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Benchmark multiple WAFs by replaying labeled request corpora against
/// them and aggregating block decisions into accuracy metrics.
#[derive(Debug, Parser)]
#[command(name = "waf-comparison", version)]
struct Cli {
    /// Delete the existing results database and WAF config file, then run
    /// a fresh analysis.
    #[arg(long)]
    fresh_run: bool,

    /// WAF name (can be used multiple times, paired with --waf-url).
    #[arg(long = "waf-name")]
    waf_name: Vec<String>,

    /// WAF URL (can be used multiple times, paired with --waf-name).
    #[arg(long = "waf-url")]
    waf_url: Vec<String>,

    /// Number of concurrent workers for sending payloads.
    #[arg(long, default_value_t = MAX_WORKERS)]
    max_workers: usize,

    /// Fast mode: process only ~15% of requests, sampled with a constant
    /// seed for reproducibility.
    #[arg(long)]
    fast: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "waf_comparison=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let paths = RunPaths::default();
    paths.bootstrap()?;

    let is_fresh_run =
        cli.fresh_run || !(paths.db_file.exists() && paths.wafs_config_file.exists());

    if is_fresh_run {
        clean_existing_data(&paths)?;
        let targets = validate_waf_args(&cli.waf_name, &cli.waf_url)?;
        targets.save(&paths.wafs_config_file)?;

        tracing::info!("Running fresh analysis...");
        if cli.fast {
            tracing::info!(
                "Fast mode initialized: will sample ~{}% of requests with a constant seed.",
                (FAST_MODE_SAMPLE_FRACTION * 100.0) as u32
            );
        }

        let pool = db::create_pool(&paths.db_file).await?;
        let wafs = Wafs::new(targets, cli.max_workers, cli.fast);
        wafs.run(&pool, &paths).await?;
        analyzer::analyze(&pool).await?;
        Ok(())
    } else {
        tracing::info!("Using existing database & WAFs config files for analysis.");
        let targets = WafTargets::load(&paths.wafs_config_file)?;
        tracing::info!(
            "Analyzing existing results for: {}",
            targets
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        tracing::warn!(
            "Changes to '--waf-name', '--waf-url', '--max-workers' and '--fast' have *NO EFFECT* on an existing run."
        );
        tracing::warn!(
            "To apply configuration changes use '--fresh-run'; it will *DELETE* the existing results database and WAF config, then regenerate results."
        );

        let pool = db::create_pool(&paths.db_file).await?;
        analyzer::analyze(&pool).await?;
        Ok(())
    }
}

/// Delete a previous run's database and WAF config file if present.
fn clean_existing_data(paths: &RunPaths) -> Result<(), AppError> {
    for file in [&paths.db_file, &paths.wafs_config_file] {
        if file.exists() {
            tracing::info!(file = %file.display(), "Deleting for fresh rerun.");
            fs::remove_file(file)?;
        }
    }
    Ok(())
}

/// Validate the --waf-name/--waf-url argument lists and build the target
/// map. Every violation is a fatal configuration error.
fn validate_waf_args(names: &[String], urls: &[String]) -> Result<WafTargets, AppError> {
    if names.is_empty() && urls.is_empty() {
        return Err(AppError::Config(
            "Both '--waf-name' and '--waf-url' arguments must be provided.".to_string(),
        ));
    }
    if names.is_empty() || urls.is_empty() {
        return Err(AppError::Config(
            "Both '--waf-name' and '--waf-url' arguments must be provided if either is used."
                .to_string(),
        ));
    }
    if names.len() != urls.len() {
        return Err(AppError::Config(
            "Number of '--waf-name' and '--waf-url' arguments must match.".to_string(),
        ));
    }
    if names.iter().any(|name| name.trim().is_empty()) {
        return Err(AppError::Config(
            "Empty values detected in '--waf-name' arguments. Each WAF name must be non-empty."
                .to_string(),
        ));
    }
    for url in urls {
        if url.trim().is_empty() {
            return Err(AppError::Config(
                "Empty values detected in '--waf-url' arguments. Each WAF URL must be non-empty."
                    .to_string(),
            ));
        }
        let lower = url.trim().to_lowercase();
        if !lower.starts_with("http://") && !lower.starts_with("https://") {
            return Err(AppError::Config(format!(
                "Invalid URL format in '--waf-url' argument: '{url}'. Each URL must start with 'http://' or 'https://'."
            )));
        }
    }

    // Uniqueness of names and URLs is enforced by the target map itself.
    WafTargets::new(
        names
            .iter()
            .zip(urls)
            .map(|(name, url)| WafEntry {
                name: name.clone(),
                url: url.clone(),
            })
            .collect(),
    )
}
