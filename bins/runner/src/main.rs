//! Stratum run CLI
//!
//! Reads a JSON run scenario, executes it and prints the run summary as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use stratum_core::lock::RunLockRegistry;
use stratum_core::run::{RunEngine, RunRequest};
use stratum_shared::{AppConfig, AppError, LoggingConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Consolidate and allocate a budget scenario.
#[derive(Debug, Parser)]
#[command(name = "stratum-run", version, about)]
struct Cli {
    /// Path to the JSON run scenario.
    scenario: PathBuf,

    /// Print the hierarchy, consolidated rows and allocations, not just the summary.
    #[arg(long)]
    full: bool,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Serialize)]
struct ErrorReport<'a> {
    code: &'a str,
    message: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let raw = std::fs::read_to_string(&cli.scenario)
        .with_context(|| format!("failed to read {}", cli.scenario.display()))?;
    let request: RunRequest = serde_json::from_str(&raw).context("invalid run scenario")?;
    info!(
        scenario = %cli.scenario.display(),
        budget = %request.budget.id,
        rules = request.rules.len(),
        line_items = request.line_items.len(),
        "Scenario loaded"
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let engine = RunEngine::new(config.engine, RunLockRegistry::new());
    match engine.execute(&request, &cancel).await {
        Ok(outcome) => {
            let json = if cli.full {
                render(&outcome, cli.pretty)?
            } else {
                render(&outcome.summary, cli.pretty)?
            };
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let err = AppError::from(err);
            error!(code = err.error_code(), "{err}");
            let report = ErrorReport {
                code: err.error_code(),
                message: err.to_string(),
            };
            println!("{}", render(&report, cli.pretty)?);
            Ok(ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1)))
        }
    }
}

/// Logs go to stderr so stdout carries only the JSON result.
fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.filter.as_str().into());
    let json = logging.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text = (!logging.json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

fn render<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}
