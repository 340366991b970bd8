//! Univariate forecasting behind a narrow interface so callers do not depend
//! on the model that backs it.

mod arima;
mod optimizer;

use serde::Serialize;

use crate::error::ComputationError;

pub use arima::{ArimaForecaster, ArimaOrder};
pub use optimizer::{Minimum, NelderMead};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelParameter {
    pub name: String,
    pub value: f64,
}

/// Point forecasts plus the fitted parameters that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub model: String,
    pub values: Vec<f64>,
    pub parameters: Vec<ModelParameter>,
    /// Residual variance of the fit.
    pub sigma2: f64,
}

impl Forecast {
    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name == name)
            .map(|parameter| parameter.value)
    }
}

pub trait Forecaster: Send + Sync {
    fn name(&self) -> String;

    /// Fits the model to `series` (oldest first) and forecasts `horizon`
    /// steps past its end.
    fn forecast(&self, series: &[f64], horizon: usize) -> Result<Forecast, ComputationError>;
}
