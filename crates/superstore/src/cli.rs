use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use superstore_core::ReportConfig;
use superstore_parser::TextEncoding;

pub const DATA_ENV: &str = "SUPERSTORE_DATA";
pub const BIND_ENV: &str = "SUPERSTORE_BIND";

/// Retail transactions reporting: batch report and dashboard server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Transactions CSV [env: SUPERSTORE_DATA] [default: store_dataset.csv]
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Text encoding of the CSV (latin1 or utf8)
    #[arg(long, global = true)]
    pub encoding: Option<TextEncoding>,

    /// TOML file with report settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every aggregate, save charts and the correlation spreadsheet
    Report(ReportArgs),
    /// Serve the interactive dashboard over HTTP
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
pub struct ReportArgs {
    /// Directory for chart images and the spreadsheet
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Listen address [env: SUPERSTORE_BIND] [default: 127.0.0.1:8501]
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

impl Cli {
    /// Settings with precedence flag > environment > config file > default.
    pub fn resolve_config<F>(&self, env: F) -> Result<ReportConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match &self.config {
            Some(path) => ReportConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ReportConfig::default(),
        };

        if let Some(data) = env(DATA_ENV).filter(|value| !value.trim().is_empty()) {
            config.data_path = PathBuf::from(data);
        }
        if let Some(bind) = env(BIND_ENV).filter(|value| !value.trim().is_empty()) {
            config.bind = bind
                .trim()
                .parse()
                .with_context(|| format!("{BIND_ENV} is not a socket address: {bind}"))?;
        }

        if let Some(data) = &self.data {
            config.data_path = data.clone();
        }
        if let Some(encoding) = self.encoding {
            config.encoding = encoding;
        }
        match &self.command {
            Command::Report(args) => {
                if let Some(dir) = &args.output_dir {
                    config.output_dir = dir.clone();
                }
            }
            Command::Serve(args) => {
                if let Some(bind) = args.bind {
                    config.bind = bind;
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}
