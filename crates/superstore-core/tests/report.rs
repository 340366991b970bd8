use std::path::PathBuf;

use chrono::NaiveDate;
use superstore_core::config::ReportConfig;
use superstore_core::forecast::ArimaForecaster;
use superstore_core::report::{run_batch, step_names};
use superstore_parser::{load_transactions, TextEncoding, TransactionRow, TransactionsTable};

fn sample_table() -> TransactionsTable {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../superstore-parser/tests/data/store_sample.csv");
    load_transactions(path, TextEncoding::Latin1).expect("sample fixture loads")
}

fn config_in(dir: &std::path::Path) -> ReportConfig {
    ReportConfig {
        output_dir: dir.to_path_buf(),
        ..ReportConfig::default()
    }
}

#[test]
fn batch_run_prints_in_catalog_order_and_writes_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config_in(dir.path());
    let mut out = Vec::new();

    let report = run_batch(&sample_table(), &config, &ArimaForecaster::default(), &mut out)
        .expect("batch run");
    let text = String::from_utf8(out).expect("utf8 output");

    assert!(text.contains("Total Sales: 3470.28"), "{text}");
    let positions: Vec<usize> = [
        "Total Sales:",
        "Total Profit:",
        "Profit Margin %:",
        "Sales by Region",
        "Monthly Sales",
        "Top 10 Products by Sales",
        "Loss Percentage:",
        "KPI Summary",
    ]
    .iter()
    .map(|label| text.find(label).unwrap_or_else(|| panic!("missing {label}")))
    .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));

    let spreadsheet = report.spreadsheet.clone().expect("spreadsheet written");
    assert!(spreadsheet.ends_with("negative_correlation_products.xlsx"));
    assert!(spreadsheet.exists());
    assert!(dir.path().join("sales_by_region.svg").exists());
    assert!(dir.path().join("monthly_sales.svg").exists());
    assert!(report.completed.contains(&"kpi_summary"));
    assert_eq!(
        report.completed.len() + report.failed.len(),
        step_names().count()
    );
}

#[test]
fn failing_steps_do_not_stop_the_run() {
    let row = |sales: f64, profit: f64| TransactionRow {
        order_id: "O-1".to_string(),
        order_date: NaiveDate::from_ymd_opt(2017, 3, 4),
        customer_id: "C-1".to_string(),
        region: "East".to_string(),
        state: "Ohio".to_string(),
        segment: "Consumer".to_string(),
        category: "Furniture".to_string(),
        sub_category: "Chairs".to_string(),
        product_name: "Chair".to_string(),
        sales: Some(sales),
        profit: Some(profit),
        discount: Some(0.1),
    };
    let table = TransactionsTable::from_rows(vec![row(100.0, 10.0), row(50.0, -2.0)])
        .expect("table");
    let dir = tempfile::tempdir().expect("tempdir");
    let mut out = Vec::new();

    let report = run_batch(&table, &config_in(dir.path()), &ArimaForecaster::default(), &mut out)
        .expect("batch run");
    let text = String::from_utf8(out).expect("utf8 output");

    assert!(report.failed.iter().any(|failure| failure.step == "sales_forecast"));
    assert!(text.contains("Sales Forecast: N/A"), "{text}");
    assert!(report.completed.contains(&"kpi_summary"));
    assert!(text.find("Sales Forecast: N/A") < text.find("KPI Summary"));
    assert!(!report.is_complete());
}
