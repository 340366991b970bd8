use tracing::debug;

use super::optimizer::NelderMead;
use super::{Forecast, Forecaster, ModelParameter};
use crate::error::ComputationError;

const MIN_OBSERVATIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self { p: 1, d: 1, q: 1 }
    }
}

/// ARIMA(p, d, q) without a constant term, fitted by conditional sum of
/// squares. AR coefficients are kept stationary and MA coefficients
/// invertible by optimizing over partial autocorrelations.
#[derive(Debug, Clone, Default)]
pub struct ArimaForecaster {
    pub order: ArimaOrder,
    pub optimizer: NelderMead,
}

impl ArimaForecaster {
    pub fn new(order: ArimaOrder) -> Self {
        Self {
            order,
            optimizer: NelderMead::default(),
        }
    }

    fn required_observations(&self) -> usize {
        (self.order.d + self.order.p.max(self.order.q) + 1).max(MIN_OBSERVATIONS)
    }

    fn unpack(&self, unconstrained: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let (ar, ma) = unconstrained.split_at(self.order.p);
        let phi = constrain_stationary(ar);
        let theta = constrain_stationary(ma).into_iter().map(|c| -c).collect();
        (phi, theta)
    }
}

impl Forecaster for ArimaForecaster {
    fn name(&self) -> String {
        let ArimaOrder { p, d, q } = self.order;
        format!("ARIMA({p},{d},{q})")
    }

    fn forecast(&self, series: &[f64], horizon: usize) -> Result<Forecast, ComputationError> {
        let required = self.required_observations();
        if series.len() < required {
            return Err(ComputationError::TooFewObservations {
                required,
                found: series.len(),
            });
        }
        if series.iter().any(|value| !value.is_finite()) {
            return Err(ComputationError::NonFinite("series"));
        }

        let (differenced, tails) = difference(series, self.order.d);
        if variance(&differenced) == 0.0 {
            return Err(ComputationError::DegenerateSeries(format!(
                "zero variance after differencing {} time(s)",
                self.order.d
            )));
        }

        let ArimaOrder { p, q, .. } = self.order;
        let start = vec![0.0; p + q];
        let minimum = self.optimizer.minimize(
            |params| {
                let (phi, theta) = self.unpack(params);
                conditional_sum_of_squares(&differenced, &phi, &theta)
            },
            &start,
        );
        let (phi, theta) = self.unpack(&minimum.point);
        if phi.iter().chain(&theta).any(|value| !value.is_finite()) {
            return Err(ComputationError::NonFinite("model parameters"));
        }

        let residuals = residuals(&differenced, &phi, &theta);
        let effective = differenced.len().saturating_sub(p).max(1);
        let sigma2 = residuals.iter().skip(p).map(|e| e * e).sum::<f64>() / effective as f64;

        let steps = project(&differenced, &residuals, &phi, &theta, horizon);
        let values = integrate(steps, &tails);
        if values.iter().any(|value| !value.is_finite()) || !sigma2.is_finite() {
            return Err(ComputationError::NonFinite("forecast"));
        }

        debug!(
            model = %self.name(),
            iterations = minimum.iterations,
            converged = minimum.converged,
            sigma2,
            "fitted forecast model"
        );

        let parameters = phi
            .iter()
            .enumerate()
            .map(|(lag, value)| ModelParameter {
                name: format!("ar.L{}", lag + 1),
                value: *value,
            })
            .chain(theta.iter().enumerate().map(|(lag, value)| ModelParameter {
                name: format!("ma.L{}", lag + 1),
                value: *value,
            }))
            .collect();

        Ok(Forecast {
            model: self.name(),
            values,
            parameters,
            sigma2,
        })
    }
}

/// Maps unconstrained reals to the coefficients of a stationary AR
/// polynomial: each value becomes a partial autocorrelation in (-1, 1), then
/// the Durbin–Levinson recursion turns those into coefficients.
fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let mut coefficients: Vec<f64> = Vec::with_capacity(unconstrained.len());
    for (k, value) in unconstrained.iter().enumerate() {
        let partial = value.tanh();
        let previous = coefficients.clone();
        for i in 0..k {
            coefficients[i] = previous[i] - partial * previous[k - 1 - i];
        }
        coefficients.push(partial);
    }
    coefficients
}

/// Differences `series` `d` times. Also returns the last value at each
/// differencing level, needed to integrate forecasts back.
fn difference(series: &[f64], d: usize) -> (Vec<f64>, Vec<f64>) {
    let mut current = series.to_vec();
    let mut tails = Vec::with_capacity(d);
    for _ in 0..d {
        tails.push(current.last().copied().unwrap_or(0.0));
        current = current.windows(2).map(|pair| pair[1] - pair[0]).collect();
    }
    (current, tails)
}

fn integrate(mut values: Vec<f64>, tails: &[f64]) -> Vec<f64> {
    for tail in tails.iter().rev() {
        let mut level = *tail;
        for value in values.iter_mut() {
            level += *value;
            *value = level;
        }
    }
    values
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// One-step prediction errors with pre-sample values and errors fixed at 0.
fn residuals(series: &[f64], phi: &[f64], theta: &[f64]) -> Vec<f64> {
    let mut errors = vec![0.0; series.len()];
    for t in phi.len()..series.len() {
        let ar: f64 = phi.iter().enumerate().map(|(i, c)| c * series[t - 1 - i]).sum();
        let ma: f64 = theta
            .iter()
            .enumerate()
            .filter(|(j, _)| *j < t)
            .map(|(j, c)| c * errors[t - 1 - j])
            .sum();
        errors[t] = series[t] - ar - ma;
    }
    errors
}

fn conditional_sum_of_squares(series: &[f64], phi: &[f64], theta: &[f64]) -> f64 {
    residuals(series, phi, theta)
        .iter()
        .skip(phi.len())
        .map(|e| e * e)
        .sum()
}

/// Point forecasts on the differenced scale; future shocks are zero.
fn project(series: &[f64], errors: &[f64], phi: &[f64], theta: &[f64], horizon: usize) -> Vec<f64> {
    let mut history = series.to_vec();
    let mut shocks = errors.to_vec();
    for _ in 0..horizon {
        let t = history.len();
        let ar: f64 = phi
            .iter()
            .enumerate()
            .filter(|(i, _)| *i < t)
            .map(|(i, c)| c * history[t - 1 - i])
            .sum();
        let ma: f64 = theta
            .iter()
            .enumerate()
            .filter(|(j, _)| *j < t)
            .map(|(j, c)| c * shocks[t - 1 - j])
            .sum();
        history.push(ar + ma);
        shocks.push(0.0);
    }
    history.split_off(series.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stationary_constraint_stays_inside_unit_interval() {
        for raw in [-3.0, -1.0, 0.0, 0.3, 3.0] {
            let phi = constrain_stationary(&[raw]);
            assert!(phi[0].abs() < 1.0);
        }
        let pair = constrain_stationary(&[0.5, -0.5]);
        assert_eq!(pair.len(), 2);
        assert!(pair[1].abs() < 1.0);
        assert_eq!(constrain_stationary(&[]), Vec::<f64>::new());
    }

    #[test]
    fn difference_then_integrate_restores_levels() {
        let series = [3.0, 5.0, 4.0, 8.0];
        let (diffs, tails) = difference(&series, 1);
        assert_eq!(diffs, vec![2.0, -1.0, 4.0]);
        assert_eq!(tails, vec![8.0]);
        assert_eq!(integrate(vec![1.0, 1.0], &tails), vec![9.0, 10.0]);
    }

    #[test]
    fn projection_uses_last_shock_once() {
        let forecast = project(&[1.0, 2.0], &[0.0, 0.5], &[0.5], &[0.4], 2);
        assert!((forecast[0] - (0.5 * 2.0 + 0.4 * 0.5)).abs() < 1e-12);
        assert!((forecast[1] - 0.5 * forecast[0]).abs() < 1e-12);
    }
}
