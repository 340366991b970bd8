use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;
use superstore_parser::{TransactionColumn, TransactionsTable};
use tracing::{debug, info, warn};

use crate::aggregates::{Aggregator, Grouped, YearlyGrowth};
use crate::charts::{self, AxisFormat, BarOrientation, LineSeriesData};
use crate::config::ReportConfig;
use crate::error::{RenderError, Result};
use crate::export::write_correlation_workbook;
use crate::filter::RegionFilter;
use crate::forecast::Forecaster;

pub const UNAVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepFailure {
    pub step: &'static str,
    pub error: String,
}

/// What a batch run produced. Failed steps are listed, not fatal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub completed: Vec<&'static str>,
    pub failed: Vec<StepFailure>,
    pub charts: Vec<PathBuf>,
    pub spreadsheet: Option<PathBuf>,
    pub negative_products: usize,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

struct BatchContext<'a> {
    aggregator: Aggregator,
    config: &'a ReportConfig,
    forecaster: &'a dyn Forecaster,
    out: &'a mut dyn Write,
    report: BatchReport,
}

type Step = fn(&mut BatchContext<'_>) -> Result<()>;

/// Every batch step in output order.
const STEPS: &[(&str, Step)] = &[
    ("total_sales", total_sales),
    ("total_profit", total_profit),
    ("profit_margin", profit_margin),
    ("sales_by_region", sales_by_region),
    ("monthly_sales", monthly_sales),
    ("top_products_by_sales", top_products_by_sales),
    ("top_products_by_profit", top_products_by_profit),
    ("sales_by_category", sales_by_category),
    ("category_summary", category_summary),
    ("sales_by_segment", sales_by_segment),
    ("discount_vs_profit", discount_vs_profit),
    ("sales_profit_correlation", sales_profit_correlation),
    ("negative_correlation_products", negative_correlation_products),
    ("yearly_sales_growth", yearly_sales_growth),
    ("yearly_profit_growth", yearly_profit_growth),
    ("top_states_by_sales", top_states_by_sales),
    ("average_purchase_frequency", average_purchase_frequency),
    ("average_order_value_by_segment", average_order_value_by_segment),
    ("subcategory_profit_margin", subcategory_profit_margin),
    ("discount_sales_correlation", discount_sales_correlation),
    ("loss_order_percentage", loss_order_percentage),
    ("quarterly_sales", quarterly_sales),
    ("average_sales_by_month", average_sales_by_month),
    ("sales_forecast", sales_forecast),
    ("kpi_summary", kpi_summary),
];

pub fn step_names() -> impl Iterator<Item = &'static str> {
    STEPS.iter().map(|(name, _)| *name)
}

/// Runs every aggregate over the whole table in catalog order, printing to
/// `out` and writing charts and the spreadsheet under `config.output_dir`.
/// A failing step prints `N/A`, is logged, and the run moves on.
pub fn run_batch(
    table: &TransactionsTable,
    config: &ReportConfig,
    forecaster: &dyn Forecaster,
    out: &mut dyn Write,
) -> Result<BatchReport> {
    fs::create_dir_all(&config.output_dir)?;
    let aggregator = Aggregator::new(table, &RegionFilter::all())?;

    let mut ctx = BatchContext {
        aggregator,
        config,
        forecaster,
        out,
        report: BatchReport::default(),
    };

    for &(name, step) in STEPS {
        debug!(step = name, "running report step");
        match step(&mut ctx) {
            Ok(()) => ctx.report.completed.push(name),
            Err(err) => {
                warn!(step = name, error = %err, "report step failed");
                writeln!(ctx.out, "{}: {UNAVAILABLE}", heading(name))?;
                ctx.report.failed.push(StepFailure {
                    step: name,
                    error: err.to_string(),
                });
            }
        }
    }

    info!(
        completed = ctx.report.completed.len(),
        failed = ctx.report.failed.len(),
        charts = ctx.report.charts.len(),
        "batch report finished"
    );
    Ok(ctx.report)
}

impl BatchContext<'_> {
    fn scalar(&mut self, label: &str, value: impl Display) -> Result<()> {
        writeln!(self.out, "{label}: {value}")?;
        Ok(())
    }

    fn table(&mut self, title: &str, table: Table) -> Result<()> {
        writeln!(self.out, "{title}")?;
        writeln!(self.out, "{table}")?;
        Ok(())
    }

    fn grouped<K: Display>(
        &mut self,
        title: &str,
        key_header: &str,
        value_header: &str,
        grouped: &Grouped<K>,
    ) -> Result<()> {
        let mut table = new_table([key_header, value_header]);
        for entry in grouped.iter() {
            table.add_row(vec![entry.key.to_string(), format_amount(entry.value)]);
        }
        self.table(title, table)
    }

    fn save_chart(&mut self, name: &str, svg: std::result::Result<String, RenderError>) -> Result<()> {
        let svg = svg?;
        let path = self.config.chart_path(name);
        fs::write(&path, svg).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "saved chart");
        self.report.charts.push(path);
        Ok(())
    }
}

fn total_sales(ctx: &mut BatchContext<'_>) -> Result<()> {
    let value = ctx.aggregator.total_sales()?;
    ctx.scalar("Total Sales", format_amount(value))
}

fn total_profit(ctx: &mut BatchContext<'_>) -> Result<()> {
    let value = ctx.aggregator.total_profit()?;
    ctx.scalar("Total Profit", format_amount(value))
}

fn profit_margin(ctx: &mut BatchContext<'_>) -> Result<()> {
    let value = ctx.aggregator.profit_margin()?;
    ctx.scalar("Profit Margin %", format_amount(value))
}

fn sales_by_region(ctx: &mut BatchContext<'_>) -> Result<()> {
    let grouped = ctx.aggregator.sales_by_region()?;
    ctx.grouped("Sales by Region", "Region", "Sales", &grouped)?;
    let svg = charts::grouped_bar_chart(
        "Total Sales by Region",
        "Sales",
        &grouped,
        BarOrientation::Horizontal,
    );
    ctx.save_chart("sales_by_region", svg)
}

fn monthly_sales(ctx: &mut BatchContext<'_>) -> Result<()> {
    let grouped = ctx.aggregator.monthly_sales()?;
    ctx.grouped("Monthly Sales", "Month End", "Sales", &grouped)?;
    let svg = charts::line_chart(
        "Monthly Sales Over Time",
        "Sales",
        AxisFormat::Month,
        &[LineSeriesData::from_dates("Sales", &grouped)],
        false,
    );
    ctx.save_chart("monthly_sales", svg)
}

fn top_products_by_sales(ctx: &mut BatchContext<'_>) -> Result<()> {
    let grouped = ctx.aggregator.top_products_by_sales(ctx.config.top_n)?;
    let title = format!("Top {} Products by Sales", ctx.config.top_n);
    ctx.grouped(&title, "Product Name", "Sales", &grouped)?;
    let svg = charts::grouped_bar_chart(&title, "Sales", &grouped, BarOrientation::Vertical);
    ctx.save_chart("top_products_by_sales", svg)
}

fn top_products_by_profit(ctx: &mut BatchContext<'_>) -> Result<()> {
    let grouped = ctx.aggregator.top_products_by_profit(ctx.config.top_n)?;
    let title = format!("Top {} Products by Profit", ctx.config.top_n);
    ctx.grouped(&title, "Product Name", "Profit", &grouped)
}

fn sales_by_category(ctx: &mut BatchContext<'_>) -> Result<()> {
    let grouped = ctx.aggregator.sales_by_category()?;
    ctx.grouped("Sales by Category", "Category", "Sales", &grouped)?;
    let svg = charts::grouped_bar_chart(
        "Total Sales by Category",
        "Sales",
        &grouped,
        BarOrientation::Horizontal,
    );
    ctx.save_chart("sales_by_category", svg)
}

fn category_summary(ctx: &mut BatchContext<'_>) -> Result<()> {
    let summary = ctx.aggregator.category_summary()?;
    let mut table = new_table(["Category", "Sales", "Profit"]);
    for row in &summary {
        table.add_row(vec![
            row.category.clone(),
            format_amount(row.sales),
            format_amount(row.profit),
        ]);
    }
    ctx.table("Category Summary", table)
}

fn sales_by_segment(ctx: &mut BatchContext<'_>) -> Result<()> {
    let grouped = ctx.aggregator.sales_by_segment()?;
    ctx.grouped("Sales by Segment", "Segment", "Sales", &grouped)?;
    let svg = charts::grouped_bar_chart(
        "Total Revenue by Segment",
        "Sales",
        &grouped,
        BarOrientation::Vertical,
    );
    ctx.save_chart("sales_by_segment", svg)
}

fn discount_vs_profit(ctx: &mut BatchContext<'_>) -> Result<()> {
    let pairs = ctx.aggregator.discount_vs_profit()?;
    ctx.scalar("Discount vs Profit points", pairs.len())?;
    let svg = charts::scatter_chart("Discount vs Profit", "Discount", "Profit", &pairs);
    ctx.save_chart("discount_vs_profit", svg)
}

fn sales_profit_correlation(ctx: &mut BatchContext<'_>) -> Result<()> {
    let value = ctx.aggregator.sales_profit_correlation()?;
    ctx.scalar("Sales-Profit Correlation", format_optional(value))?;
    let pairs = ctx.aggregator.sales_vs_profit()?;
    let svg = charts::scatter_chart("Sales vs Profit", "Sales", "Profit", &pairs);
    ctx.save_chart("sales_vs_profit", svg)
}

fn negative_correlation_products(ctx: &mut BatchContext<'_>) -> Result<()> {
    let products = ctx.aggregator.negative_correlation_products()?;
    ctx.scalar("Products with negative sales-profit correlation", products.len())?;
    let path = ctx.config.spreadsheet_path();
    let rows = write_correlation_workbook(&products, &path)?;
    ctx.report.negative_products = rows;
    ctx.report.spreadsheet = Some(path);
    Ok(())
}

fn yearly_sales_growth(ctx: &mut BatchContext<'_>) -> Result<()> {
    let growth = ctx.aggregator.yearly_growth(TransactionColumn::Sales)?;
    yearly_growth(ctx, "Sales", "Yearly Sales Growth", "yearly_sales_growth", &growth)
}

fn yearly_profit_growth(ctx: &mut BatchContext<'_>) -> Result<()> {
    let growth = ctx.aggregator.yearly_growth(TransactionColumn::Profit)?;
    yearly_growth(ctx, "Profit", "Yearly Profit Growth", "yearly_profit_growth", &growth)
}

fn yearly_growth(
    ctx: &mut BatchContext<'_>,
    measure: &str,
    title: &str,
    chart_name: &str,
    growth: &[YearlyGrowth],
) -> Result<()> {
    let mut table = new_table(["Year", measure, "Growth %"]);
    for year in growth {
        table.add_row(vec![
            year.year.to_string(),
            format_amount(year.total),
            format_optional(year.growth_pct),
        ]);
    }
    ctx.table(title, table)?;

    let points: Vec<(f64, f64)> = growth
        .iter()
        .filter_map(|year| year.growth_pct.map(|pct| (f64::from(year.year), pct)))
        .collect();
    let svg = charts::line_chart(
        title,
        "Growth %",
        AxisFormat::Year,
        &[LineSeriesData {
            name: format!("{measure} growth"),
            points,
        }],
        true,
    );
    ctx.save_chart(chart_name, svg)
}

fn top_states_by_sales(ctx: &mut BatchContext<'_>) -> Result<()> {
    let grouped = ctx.aggregator.top_states_by_sales(ctx.config.top_n)?;
    let title = format!("Top {} States by Sales", ctx.config.top_n);
    ctx.grouped(&title, "State", "Sales", &grouped)?;
    let svg = charts::grouped_bar_chart(&title, "Sales", &grouped, BarOrientation::Vertical);
    ctx.save_chart("top_states_by_sales", svg)
}

fn average_purchase_frequency(ctx: &mut BatchContext<'_>) -> Result<()> {
    let value = ctx.aggregator.average_purchase_frequency()?;
    ctx.scalar("Average Purchase Frequency", format_optional(value))
}

fn average_order_value_by_segment(ctx: &mut BatchContext<'_>) -> Result<()> {
    let grouped = ctx.aggregator.average_order_value_by_segment()?;
    ctx.grouped(
        "Average Order Value by Segment",
        "Segment",
        "Average Order Value",
        &grouped,
    )?;
    let svg = charts::grouped_bar_chart(
        "Average Order Value by Segment",
        "Average Order Value",
        &grouped,
        BarOrientation::Vertical,
    );
    ctx.save_chart("average_order_value_by_segment", svg)
}

fn subcategory_profit_margin(ctx: &mut BatchContext<'_>) -> Result<()> {
    let margins = ctx.aggregator.subcategory_margins()?;
    let mut table = new_table(["Sub-Category", "Profit Margin"]);
    for row in &margins {
        table.add_row(vec![row.sub_category.clone(), format_optional(row.margin)]);
    }
    ctx.table("Profit Margin by Sub-Category", table)?;

    let defined: Grouped<String> = margins
        .into_iter()
        .filter_map(|row| row.margin.map(|margin| (row.sub_category, margin)))
        .collect();
    let svg = charts::grouped_bar_chart(
        "Profit Margin by Sub-Category",
        "Profit Margin",
        &defined,
        BarOrientation::Vertical,
    );
    ctx.save_chart("subcategory_profit_margin", svg)
}

fn discount_sales_correlation(ctx: &mut BatchContext<'_>) -> Result<()> {
    let value = ctx.aggregator.discount_sales_correlation()?;
    ctx.scalar("Correlation between Discount and Sales", format_optional(value))?;
    let pairs = ctx.aggregator.discount_vs_sales()?;
    let svg = charts::scatter_chart("Discount vs Sales", "Discount", "Sales", &pairs);
    ctx.save_chart("discount_vs_sales", svg)
}

fn loss_order_percentage(ctx: &mut BatchContext<'_>) -> Result<()> {
    let value = ctx.aggregator.loss_order_percentage()?;
    ctx.scalar("Loss Percentage", format_amount(value))
}

fn quarterly_sales(ctx: &mut BatchContext<'_>) -> Result<()> {
    let grouped = ctx.aggregator.quarterly_sales()?;
    ctx.grouped("Quarterly Sales", "Quarter End", "Sales", &grouped)?;
    let svg = charts::line_chart(
        "Quarterly Sales",
        "Sales",
        AxisFormat::Month,
        &[LineSeriesData::from_dates("Sales", &grouped)],
        false,
    );
    ctx.save_chart("quarterly_sales", svg)
}

fn average_sales_by_month(ctx: &mut BatchContext<'_>) -> Result<()> {
    let grouped = ctx.aggregator.average_sales_by_month()?;
    ctx.grouped("Average Sales per Month", "Month", "Average Sales", &grouped)?;
    let svg = charts::grouped_bar_chart(
        "Average Sales per Month (Across Years)",
        "Average Sales",
        &grouped,
        BarOrientation::Vertical,
    );
    ctx.save_chart("average_sales_by_month", svg)
}

fn sales_forecast(ctx: &mut BatchContext<'_>) -> Result<()> {
    let forecast = ctx
        .aggregator
        .sales_forecast(ctx.forecaster, ctx.config.forecast_horizon)?;

    let mut parameters = new_table(["Parameter", "Value"]);
    for parameter in &forecast.model.parameters {
        parameters.add_row(vec![parameter.name.clone(), format!("{:.4}", parameter.value)]);
    }
    parameters.add_row(vec!["sigma2".to_string(), format!("{:.4}", forecast.model.sigma2)]);
    ctx.table(&format!("{} fit", forecast.model.model), parameters)?;

    let title = format!("Sales Forecast (Next {} Months)", ctx.config.forecast_horizon);
    ctx.grouped(&title, "Month End", "Forecast", &forecast.forecast)?;
    let svg = charts::line_chart(
        &title,
        "Sales",
        AxisFormat::Month,
        &[
            LineSeriesData::from_dates("Historical", &forecast.history),
            LineSeriesData::from_dates("Forecast", &forecast.forecast),
        ],
        false,
    );
    ctx.save_chart("sales_forecast", svg)
}

fn kpi_summary(ctx: &mut BatchContext<'_>) -> Result<()> {
    let kpi = ctx.aggregator.kpi_summary()?;
    let mut table = new_table([
        "Total Revenue",
        "Total Profit",
        "Average Order Value",
        "Profit Margin",
        "Discount-Sales Correlation",
    ]);
    table.add_row(vec![
        format_amount(kpi.total_revenue),
        format_amount(kpi.total_profit),
        format_optional(kpi.average_order_value),
        format_amount(kpi.profit_margin),
        format_optional(kpi.discount_sales_correlation),
    ]);
    ctx.table("KPI Summary", table)
}

fn new_table<const N: usize>(header: [&str; N]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn heading(step: &str) -> String {
    let mut words = step.split('_').map(|word| {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        }
    });
    let first = words.next().unwrap_or_default();
    words.fold(first, |acc, word| acc + " " + &word)
}

pub fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

pub fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| UNAVAILABLE.to_string(), |value| format!("{value:.4}"))
}

