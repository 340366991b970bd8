use chrono::NaiveDate;
use superstore_core::aggregates::Aggregator;
use superstore_core::error::ComputationError;
use superstore_core::filter::RegionFilter;
use superstore_core::forecast::{ArimaForecaster, ArimaOrder, Forecast, Forecaster};
use superstore_parser::{TransactionRow, TransactionsTable};

/// Deterministic uniform noise in [-1, 1).
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    }
}

fn monthly_row(date: NaiveDate, sales: f64) -> TransactionRow {
    TransactionRow {
        order_id: format!("O-{date}"),
        order_date: Some(date),
        customer_id: "C-1".to_string(),
        region: "East".to_string(),
        state: "Ohio".to_string(),
        segment: "Consumer".to_string(),
        category: "Furniture".to_string(),
        sub_category: "Chairs".to_string(),
        product_name: "Chair".to_string(),
        sales: Some(sales),
        profit: Some(1.0),
        discount: Some(0.0),
    }
}

struct FixedForecaster;

impl Forecaster for FixedForecaster {
    fn name(&self) -> String {
        "fixed".to_string()
    }

    fn forecast(&self, series: &[f64], horizon: usize) -> Result<Forecast, ComputationError> {
        let last = series.last().copied().unwrap_or_default();
        Ok(Forecast {
            model: self.name(),
            values: vec![last; horizon],
            parameters: Vec::new(),
            sigma2: 0.0,
        })
    }
}

#[test]
fn too_few_observations_fail() {
    let err = ArimaForecaster::default()
        .forecast(&[10.0, 12.0], 6)
        .expect_err("two points cannot fit");
    assert!(matches!(
        err,
        ComputationError::TooFewObservations {
            required: 3,
            found: 2
        }
    ));
}

#[test]
fn constant_and_linear_series_are_degenerate() {
    let forecaster = ArimaForecaster::default();
    for series in [vec![5.0; 12], (0..12).map(|t| 3.0 * t as f64).collect()] {
        let err = forecaster.forecast(&series, 6).expect_err("degenerate");
        assert!(matches!(err, ComputationError::DegenerateSeries(_)));
    }
}

#[test]
fn non_finite_input_is_rejected() {
    let err = ArimaForecaster::default()
        .forecast(&[1.0, f64::NAN, 3.0, 4.0], 2)
        .expect_err("nan input");
    assert!(matches!(err, ComputationError::NonFinite(_)));
}

#[test]
fn arima_111_produces_bounded_parameters() {
    let mut noise = Lcg(7);
    let mut level = 1_000.0;
    let series: Vec<f64> = (0..48)
        .map(|month| {
            level += 50.0 * noise.next();
            level + 200.0 * ((month % 12) as f64 / 12.0 * std::f64::consts::TAU).sin()
        })
        .collect();

    let forecast = ArimaForecaster::default()
        .forecast(&series, 6)
        .expect("fit succeeds");

    assert_eq!(forecast.model, "ARIMA(1,1,1)");
    assert_eq!(forecast.values.len(), 6);
    assert!(forecast.values.iter().all(|value| value.is_finite()));
    let phi = forecast.parameter("ar.L1").expect("ar term");
    let theta = forecast.parameter("ma.L1").expect("ma term");
    assert!(phi.abs() <= 1.0);
    assert!(theta.abs() <= 1.0);
    assert!(forecast.sigma2 > 0.0);
}

#[test]
fn recovers_autoregressive_coefficient() {
    let mut noise = Lcg(42);
    let mut series = vec![0.0];
    for t in 1..400 {
        let previous = series[t - 1];
        series.push(0.7 * previous + noise.next());
    }

    let forecaster = ArimaForecaster::new(ArimaOrder { p: 1, d: 0, q: 0 });
    let forecast = forecaster.forecast(&series, 3).expect("fit succeeds");
    let phi = forecast.parameter("ar.L1").expect("ar term");
    assert!((phi - 0.7).abs() < 0.15, "phi = {phi}");

    let last = series[399];
    assert!((forecast.values[0] - phi * last).abs() < 1e-9);
    assert!((forecast.values[1] - phi * phi * last).abs() < 1e-9);
}

#[test]
fn random_walk_forecast_repeats_last_level() {
    let forecaster = ArimaForecaster::new(ArimaOrder { p: 0, d: 1, q: 0 });
    let forecast = forecaster
        .forecast(&[3.0, 7.0, 4.0, 9.0, 8.0], 4)
        .expect("random walk");
    assert_eq!(forecast.values, vec![8.0; 4]);
    assert!(forecast.parameters.is_empty());
}

#[test]
fn sales_forecast_continues_monthly_periods() -> Result<(), Box<dyn std::error::Error>> {
    let rows = [
        (NaiveDate::from_ymd_opt(2017, 9, 3).unwrap(), 100.0),
        (NaiveDate::from_ymd_opt(2017, 10, 3).unwrap(), 140.0),
        (NaiveDate::from_ymd_opt(2017, 12, 3).unwrap(), 90.0),
    ];
    let table = TransactionsTable::from_rows(rows.map(|(date, sales)| monthly_row(date, sales)))?;
    let aggregator = Aggregator::new(&table, &RegionFilter::all())?;

    let forecast = aggregator.sales_forecast(&FixedForecaster, 3)?;
    assert_eq!(forecast.history.len(), 4);
    let periods: Vec<NaiveDate> = forecast.forecast.keys().copied().collect();
    assert_eq!(
        periods,
        vec![
            NaiveDate::from_ymd_opt(2018, 1, 31).unwrap(),
            NaiveDate::from_ymd_opt(2018, 2, 28).unwrap(),
            NaiveDate::from_ymd_opt(2018, 3, 31).unwrap(),
        ]
    );
    assert!(forecast.forecast.values().all(|value| value == 90.0));
    Ok(())
}

#[test]
fn short_monthly_series_reports_failure() -> Result<(), Box<dyn std::error::Error>> {
    let rows = [
        (NaiveDate::from_ymd_opt(2017, 1, 3).unwrap(), 100.0),
        (NaiveDate::from_ymd_opt(2017, 2, 3).unwrap(), 140.0),
    ];
    let table = TransactionsTable::from_rows(rows.map(|(date, sales)| monthly_row(date, sales)))?;
    let aggregator = Aggregator::new(&table, &RegionFilter::all())?;

    let err = aggregator
        .sales_forecast(&ArimaForecaster::default(), 6)
        .expect_err("two months cannot be forecast");
    assert!(matches!(err, ComputationError::TooFewObservations { .. }));
    Ok(())
}
