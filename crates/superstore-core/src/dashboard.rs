use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::Serialize;
use superstore_parser::TransactionsTable;
use tracing::warn;

use crate::aggregates::{Aggregator, Grouped, SubCategoryMargin};
use crate::charts::{self, AxisFormat, BarOrientation, LineSeriesData};
use crate::error::{ComputationResult, RenderError};
use crate::filter::RegionFilter;

/// Everything the dashboard shows for one region selection. Aggregates that
/// fail are `None` and render as placeholders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub regions: Vec<String>,
    pub selected: Vec<String>,
    pub rows: usize,
    pub top_n: usize,
    pub total_sales: Option<f64>,
    pub total_profit: Option<f64>,
    pub profit_margin: Option<f64>,
    pub sales_by_region: Option<Grouped<String>>,
    pub monthly_sales: Option<Grouped<NaiveDate>>,
    pub top_products: Option<Grouped<String>>,
    pub sales_by_category: Option<Grouped<String>>,
    pub sales_by_segment: Option<Grouped<String>>,
    pub discount_vs_profit: Option<Vec<(f64, f64)>>,
    pub subcategory_margins: Option<Vec<SubCategoryMargin>>,
}

fn available<T>(name: &str, result: ComputationResult<T>) -> Option<T> {
    result
        .map_err(|err| warn!(aggregate = name, error = %err, "dashboard aggregate unavailable"))
        .ok()
}

impl DashboardView {
    pub fn build(
        table: &TransactionsTable,
        filter: &RegionFilter,
        top_n: usize,
    ) -> ComputationResult<Self> {
        let aggregator = Aggregator::new(table, filter)?;
        Ok(Self {
            regions: table.regions()?,
            selected: filter.regions().map(str::to_string).collect(),
            rows: aggregator.row_count(),
            top_n,
            total_sales: available("total_sales", aggregator.total_sales()),
            total_profit: available("total_profit", aggregator.total_profit()),
            profit_margin: available("profit_margin", aggregator.profit_margin()),
            sales_by_region: available("sales_by_region", aggregator.sales_by_region()),
            monthly_sales: available("monthly_sales", aggregator.monthly_sales()),
            top_products: available("top_products", aggregator.top_products_by_sales(top_n)),
            sales_by_category: available("sales_by_category", aggregator.sales_by_category()),
            sales_by_segment: available("sales_by_segment", aggregator.sales_by_segment()),
            discount_vs_profit: available("discount_vs_profit", aggregator.discount_vs_profit()),
            subcategory_margins: available(
                "subcategory_margins",
                aggregator.subcategory_margins(),
            ),
        })
    }

    fn is_selected(&self, region: &str) -> bool {
        self.selected.is_empty() || self.selected.iter().any(|selected| selected == region)
    }

    /// The seven dashboard charts as `(title, svg or failure)` in page order.
    pub fn charts(&self) -> Vec<(String, Result<String, RenderError>)> {
        let missing = |title: &str| Err(RenderError::NoData(title.to_string()));
        let top_title = format!("Top {} Products by Sales", self.top_n);

        vec![
            (
                "Sales by Region".to_string(),
                self.sales_by_region.as_ref().map_or_else(
                    || missing("Sales by Region"),
                    |grouped| {
                        charts::grouped_bar_chart(
                            "Sales by Region",
                            "Total Sales",
                            grouped,
                            BarOrientation::Horizontal,
                        )
                    },
                ),
            ),
            (
                "Monthly Sales Trend".to_string(),
                self.monthly_sales.as_ref().map_or_else(
                    || missing("Monthly Sales Trend"),
                    |grouped| {
                        charts::line_chart(
                            "Monthly Sales Trend",
                            "Sales",
                            AxisFormat::Month,
                            &[LineSeriesData::from_dates("Sales", grouped)],
                            false,
                        )
                    },
                ),
            ),
            (
                top_title.clone(),
                self.top_products.as_ref().map_or_else(
                    || missing(&top_title),
                    |grouped| {
                        charts::grouped_bar_chart(&top_title, "Sales", grouped, BarOrientation::Vertical)
                    },
                ),
            ),
            (
                "Sales by Category".to_string(),
                self.sales_by_category.as_ref().map_or_else(
                    || missing("Sales by Category"),
                    |grouped| {
                        charts::grouped_bar_chart(
                            "Sales by Category",
                            "Sales",
                            grouped,
                            BarOrientation::Horizontal,
                        )
                    },
                ),
            ),
            (
                "Sales by Customer Segment".to_string(),
                self.sales_by_segment.as_ref().map_or_else(
                    || missing("Sales by Customer Segment"),
                    |grouped| {
                        charts::grouped_bar_chart(
                            "Sales by Customer Segment",
                            "Sales",
                            grouped,
                            BarOrientation::Vertical,
                        )
                    },
                ),
            ),
            (
                "Discount vs Profit".to_string(),
                self.discount_vs_profit.as_ref().map_or_else(
                    || missing("Discount vs Profit"),
                    |points| charts::scatter_chart("Discount vs Profit", "Discount", "Profit", points),
                ),
            ),
            (
                "Profit Margin by Sub-Category".to_string(),
                self.subcategory_margins.as_ref().map_or_else(
                    || missing("Profit Margin by Sub-Category"),
                    |margins| {
                        let defined: Grouped<String> = margins
                            .iter()
                            .filter_map(|row| row.margin.map(|m| (row.sub_category.clone(), m)))
                            .collect();
                        charts::grouped_bar_chart(
                            "Profit Margin by Sub-Category",
                            "Profit Margin",
                            &defined,
                            BarOrientation::Vertical,
                        )
                    },
                ),
            ),
        ]
    }

    pub fn render_html(&self) -> String {
        let mut html = String::with_capacity(64 * 1024);
        html.push_str(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>Superstore Sales Dashboard</title>\n<style>\n\
             body{font-family:sans-serif;margin:0;display:flex}\n\
             aside{width:220px;padding:16px;background:#f4f4f6;min-height:100vh}\n\
             main{flex:1;padding:16px}\n\
             .cards{display:flex;gap:16px}\n\
             .card{flex:1;padding:12px;border:1px solid #ddd;border-radius:6px}\n\
             .card .value{font-size:1.8em}\n\
             .charts{display:grid;grid-template-columns:1fr 1fr;gap:16px;margin-top:16px}\n\
             .placeholder{padding:48px;color:#777;border:1px dashed #bbb;text-align:center}\n\
             </style>\n</head>\n<body>\n",
        );

        html.push_str("<aside>\n<h3>Filter Data</h3>\n<form method=\"get\" action=\"/\">\n");
        html.push_str("<label for=\"region\">Select Region</label>\n");
        let _ = writeln!(
            html,
            "<select id=\"region\" name=\"region\" multiple size=\"{}\">",
            self.regions.len().max(1)
        );
        for region in &self.regions {
            let _ = writeln!(
                html,
                "<option value=\"{0}\"{1}>{0}</option>",
                escape_html(region),
                if self.is_selected(region) { " selected" } else { "" }
            );
        }
        html.push_str("</select>\n<p><button type=\"submit\">Apply</button></p>\n</form>\n");
        let _ = writeln!(html, "<p>{} rows</p>\n</aside>", self.rows);

        html.push_str("<main>\n<h1>Superstore Sales Dashboard</h1>\n<div class=\"cards\">\n");
        for (label, value) in [
            ("Total Sales", self.total_sales.map(format_currency)),
            ("Total Profit", self.total_profit.map(format_currency)),
            ("Profit Margin", self.profit_margin.map(|m| format!("{m:.2}%"))),
        ] {
            let _ = writeln!(
                html,
                "<div class=\"card\"><div class=\"label\">{label}</div><div class=\"value\">{}</div></div>",
                value.unwrap_or_else(|| "N/A".to_string())
            );
        }
        html.push_str("</div>\n<div class=\"charts\">\n");

        for (title, chart) in self.charts() {
            let _ = write!(html, "<section>\n<h3>{title}</h3>\n");
            match chart {
                Ok(svg) => html.push_str(&svg),
                Err(err) => {
                    let _ = write!(
                        html,
                        "<div class=\"placeholder\">Chart unavailable: {}</div>",
                        escape_html(&err.to_string())
                    );
                }
            }
            html.push_str("\n</section>\n");
        }

        html.push_str("</div>\n</main>\n</body>\n</html>\n");
        html
    }
}

/// Whole-dollar amount with thousands separators, e.g. `$12,345`.
pub fn format_currency(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("$-{grouped}")
    } else {
        format!("${grouped}")
    }
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(0.0), "$0");
        assert_eq!(format_currency(999.6), "$1,000");
        assert_eq!(format_currency(2_297_200.86), "$2,297,201");
        assert_eq!(format_currency(-12_345.0), "$-12,345");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("R&D <West>"), "R&amp;D &lt;West&gt;");
    }
}
