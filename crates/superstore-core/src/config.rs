use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use superstore_parser::TextEncoding;

use crate::cache::DataSource;
use crate::error::ReportError;

pub const DEFAULT_DATA_PATH: &str = "store_dataset.csv";
pub const DEFAULT_SPREADSHEET: &str = "negative_correlation_products.xlsx";
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

/// Settings shared by the batch report and the dashboard server. Every field
/// has a default, so a config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub data_path: PathBuf,
    pub encoding: TextEncoding,
    pub output_dir: PathBuf,
    pub spreadsheet_name: String,
    pub top_n: usize,
    pub forecast_horizon: usize,
    pub bind: SocketAddr,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            encoding: TextEncoding::Latin1,
            output_dir: PathBuf::from("."),
            spreadsheet_name: DEFAULT_SPREADSHEET.to_string(),
            top_n: 10,
            forecast_horizon: 6,
            bind: SocketAddr::from(([127, 0, 0, 1], 8501)),
        }
    }
}

impl ReportConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ReportError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ReportError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ReportError> {
        let content = fs::read_to_string(path).map_err(|err| {
            ReportError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        if self.top_n == 0 {
            return Err(ReportError::Config("top_n must be at least 1".into()));
        }
        if self.forecast_horizon == 0 {
            return Err(ReportError::Config(
                "forecast_horizon must be at least 1".into(),
            ));
        }
        if self.spreadsheet_name.trim().is_empty() {
            return Err(ReportError::Config("spreadsheet_name is empty".into()));
        }
        Ok(())
    }

    pub fn source(&self) -> DataSource {
        DataSource::new(&self.data_path, self.encoding)
    }

    pub fn spreadsheet_path(&self) -> PathBuf {
        self.output_dir.join(&self.spreadsheet_name)
    }

    pub fn chart_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{name}.svg"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = ReportConfig::from_toml_str(
            r#"
            data_path = "data/superstore.csv"
            encoding = "utf-8"
            top_n = 5
            "#,
        )
        .expect("valid config");
        assert_eq!(config.data_path, PathBuf::from("data/superstore.csv"));
        assert_eq!(config.encoding, TextEncoding::Utf8);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.forecast_horizon, 6);
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(
            config.spreadsheet_path(),
            PathBuf::from(".").join(DEFAULT_SPREADSHEET)
        );
    }

    #[test]
    fn rejects_unknown_keys_and_zero_sizes() {
        assert!(matches!(
            ReportConfig::from_toml_str("colour = \"red\""),
            Err(ReportError::Config(_))
        ));
        assert!(matches!(
            ReportConfig::from_toml_str("forecast_horizon = 0"),
            Err(ReportError::Config(_))
        ));
    }
}
