use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use superstore::cli::{Cli, Command};
use superstore::server::{self, AppState};
use superstore_core::{run_batch, ArimaForecaster, ReportConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config(|key| std::env::var(key).ok())?;

    match cli.command {
        Command::Report(_) => report(&config),
        Command::Serve(_) => {
            let state = AppState::new(config.source(), config.top_n);
            server::serve(state, config.bind).await
        }
    }
}

fn report(config: &ReportConfig) -> Result<()> {
    let table = config
        .source()
        .load()
        .with_context(|| format!("loading transactions from {}", config.data_path.display()))?;
    info!(rows = table.height(), path = %config.data_path.display(), "transactions loaded");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = run_batch(&table, config, &ArimaForecaster::default(), &mut out)?;
    out.flush()?;

    for failure in &summary.failed {
        warn!(step = failure.step, error = %failure.error, "step produced no output");
    }
    info!(
        charts = summary.charts.len(),
        spreadsheet = ?summary.spreadsheet,
        negative_products = summary.negative_products,
        "report written to {}",
        config.output_dir.display()
    );
    Ok(())
}
