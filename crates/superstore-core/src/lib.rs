pub mod aggregates;
pub mod cache;
pub mod calendar;
pub mod charts;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod filter;
pub mod forecast;
pub mod report;
pub mod stats;

pub use aggregates::{Aggregator, GroupEntry, Grouped, SortOrder};
pub use cache::{DataSource, TableCache};
pub use config::ReportConfig;
pub use dashboard::DashboardView;
pub use error::{ComputationError, RenderError, ReportError};
pub use filter::RegionFilter;
pub use forecast::{ArimaForecaster, ArimaOrder, Forecast, Forecaster};
pub use report::{run_batch, BatchReport};
