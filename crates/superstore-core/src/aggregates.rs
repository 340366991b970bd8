use std::collections::HashMap;

use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use superstore_parser::{TransactionColumn, TransactionsTable};
use tracing::debug;

use crate::calendar::{last_day_of_month, Period};
use crate::error::{ComputationError, ComputationResult};
use crate::filter::RegionFilter;
use crate::forecast::{Forecast, Forecaster};
use crate::stats::{pearson, percent_change, ratio};

const YEAR: &str = "year";
const MONTH: &str = "month";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupEntry<K> {
    pub key: K,
    pub value: f64,
}

/// Ordered key → value mapping produced by a grouped aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Grouped<K> {
    pub entries: Vec<GroupEntry<K>>,
}

impl<K> Default for Grouped<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K> FromIterator<(K, f64)> for Grouped<K> {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| GroupEntry { key, value })
                .collect(),
        }
    }
}

impl<K> Grouped<K> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GroupEntry<K>> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|entry| &entry.key)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|entry| entry.value)
    }

    /// Stable sort by value: equal values keep their current order.
    pub fn sorted(mut self, order: SortOrder) -> Self {
        match order {
            SortOrder::Ascending => self.entries.sort_by(|a, b| a.value.total_cmp(&b.value)),
            SortOrder::Descending => self.entries.sort_by(|a, b| b.value.total_cmp(&a.value)),
        }
        self
    }

    pub fn top(mut self, n: usize) -> Self {
        self.entries.truncate(n);
        self
    }
}

impl<K: PartialEq> Grouped<K> {
    pub fn get(&self, key: &K) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| &entry.key == key)
            .map(|entry| entry.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyGrowth {
    pub year: i32,
    pub total: f64,
    /// Percent change against the previous year; `None` for the first year
    /// or when the previous total is zero.
    pub growth_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCorrelation {
    pub product_name: String,
    pub correlation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubCategoryMargin {
    pub sub_category: String,
    /// Profit over sales as a fraction; `None` when sales sum to zero.
    pub margin: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub sales: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_revenue: f64,
    pub total_profit: f64,
    pub average_order_value: Option<f64>,
    pub profit_margin: f64,
    pub discount_sales_correlation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesForecast {
    pub history: Grouped<NaiveDate>,
    pub forecast: Grouped<NaiveDate>,
    pub model: Forecast,
}

/// Computes every aggregate over the rows passing a region filter. The
/// filtered rows are materialized once at construction.
#[derive(Debug, Clone)]
pub struct Aggregator {
    table: TransactionsTable,
}

impl Aggregator {
    pub fn new(table: &TransactionsTable, filter: &RegionFilter) -> ComputationResult<Self> {
        let table = filter.apply(table)?;
        debug!(
            rows = table.height(),
            unrestricted = filter.is_unrestricted(),
            "filtered transactions"
        );
        Ok(Self { table })
    }

    pub fn table(&self) -> &TransactionsTable {
        &self.table
    }

    pub fn row_count(&self) -> usize {
        self.table.height()
    }

    pub fn regions(&self) -> ComputationResult<Vec<String>> {
        Ok(self.table.regions()?)
    }

    pub fn total_sales(&self) -> ComputationResult<f64> {
        self.column_sum(TransactionColumn::Sales)
    }

    pub fn total_profit(&self) -> ComputationResult<f64> {
        self.column_sum(TransactionColumn::Profit)
    }

    /// Profit as a percentage of sales, 0 when there are no sales.
    pub fn profit_margin(&self) -> ComputationResult<f64> {
        let sales = self.total_sales()?;
        let profit = self.total_profit()?;
        Ok(ratio(profit, sales).map_or(0.0, |margin| margin * 100.0))
    }

    /// Sum of sales per distinct value of `key`, sorted by `order`. Equal sums
    /// keep the order in which their keys first appear.
    pub fn sales_by(
        &self,
        key: TransactionColumn,
        order: SortOrder,
    ) -> ComputationResult<Grouped<String>> {
        Ok(self
            .grouped_sum(key, TransactionColumn::Sales)?
            .sorted(order))
    }

    pub fn sales_by_region(&self) -> ComputationResult<Grouped<String>> {
        self.sales_by(TransactionColumn::Region, SortOrder::Ascending)
    }

    pub fn sales_by_category(&self) -> ComputationResult<Grouped<String>> {
        self.sales_by(TransactionColumn::Category, SortOrder::Ascending)
    }

    pub fn sales_by_segment(&self) -> ComputationResult<Grouped<String>> {
        self.sales_by(TransactionColumn::Segment, SortOrder::Ascending)
    }

    pub fn monthly_sales(&self) -> ComputationResult<Grouped<NaiveDate>> {
        self.period_sales(Period::Month)
    }

    pub fn quarterly_sales(&self) -> ComputationResult<Grouped<NaiveDate>> {
        self.period_sales(Period::Quarter)
    }

    pub fn top_products_by_sales(&self, n: usize) -> ComputationResult<Grouped<String>> {
        Ok(self
            .sales_by(TransactionColumn::ProductName, SortOrder::Descending)?
            .top(n))
    }

    pub fn top_products_by_profit(&self, n: usize) -> ComputationResult<Grouped<String>> {
        Ok(self
            .grouped_sum(TransactionColumn::ProductName, TransactionColumn::Profit)?
            .sorted(SortOrder::Descending)
            .top(n))
    }

    pub fn top_states_by_sales(&self, n: usize) -> ComputationResult<Grouped<String>> {
        Ok(self
            .sales_by(TransactionColumn::State, SortOrder::Descending)?
            .top(n))
    }

    pub fn discount_vs_profit(&self) -> ComputationResult<Vec<(f64, f64)>> {
        self.pairs(TransactionColumn::Discount, TransactionColumn::Profit)
    }

    pub fn discount_vs_sales(&self) -> ComputationResult<Vec<(f64, f64)>> {
        self.pairs(TransactionColumn::Discount, TransactionColumn::Sales)
    }

    pub fn sales_vs_profit(&self) -> ComputationResult<Vec<(f64, f64)>> {
        self.pairs(TransactionColumn::Sales, TransactionColumn::Profit)
    }

    pub fn sales_profit_correlation(&self) -> ComputationResult<Option<f64>> {
        Ok(pearson(&self.sales_vs_profit()?))
    }

    pub fn discount_sales_correlation(&self) -> ComputationResult<Option<f64>> {
        Ok(pearson(&self.discount_vs_sales()?))
    }

    /// Sales–profit correlation within each product, ordered by product name.
    pub fn product_correlations(&self) -> ComputationResult<Vec<ProductCorrelation>> {
        let product = TransactionColumn::ProductName.canonical_name();
        let sales = TransactionColumn::Sales.canonical_name();
        let profit = TransactionColumn::Profit.canonical_name();
        let paired = col(sales).is_not_null().and(col(profit).is_not_null());
        let per_product = self
            .lazy()
            .filter(col(product).is_not_null())
            .group_by([col(product)])
            .agg([
                col(sales).filter(paired.clone()).alias(sales),
                col(profit).filter(paired).alias(profit),
            ])
            .sort([product], SortMultipleOptions::default())
            .collect()?;

        let names = per_product.column(product)?.str()?;
        let sales_lists = per_product.column(sales)?.list()?;
        let profit_lists = per_product.column(profit)?.list()?;

        let mut correlations = Vec::with_capacity(per_product.height());
        for ((name, xs), ys) in names
            .into_iter()
            .zip(sales_lists.into_iter())
            .zip(profit_lists.into_iter())
        {
            let Some(name) = name else { continue };
            correlations.push(ProductCorrelation {
                product_name: name.to_string(),
                correlation: pearson(&paired_values(xs, ys)?),
            });
        }
        Ok(correlations)
    }

    /// Products whose sales and profit move in opposite directions.
    pub fn negative_correlation_products(&self) -> ComputationResult<Grouped<String>> {
        Ok(self
            .product_correlations()?
            .into_iter()
            .filter_map(|product| match product.correlation {
                Some(r) if r < 0.0 => Some((product.product_name, r)),
                _ => None,
            })
            .collect())
    }

    /// Year totals of `column` (sales or profit) with year-over-year change.
    pub fn yearly_growth(&self, column: TransactionColumn) -> ComputationResult<Vec<YearlyGrowth>> {
        let date = TransactionColumn::OrderDate.canonical_name();
        let value = column.canonical_name();
        let totals = self
            .lazy()
            .filter(col(date).is_not_null())
            .group_by([col(date).dt().year().cast(DataType::Int32).alias(YEAR)])
            .agg([col(value).sum()])
            .sort([YEAR], SortMultipleOptions::default())
            .collect()?;

        let years = totals.column(YEAR)?.i32()?;
        let sums = totals.column(value)?.f64()?;
        let mut previous: Option<f64> = None;
        Ok(years
            .into_iter()
            .zip(sums)
            .filter_map(|(year, total)| Some((year?, total.unwrap_or(0.0))))
            .map(|(year, total)| {
                let growth_pct = previous.and_then(|prior| percent_change(prior, total));
                previous = Some(total);
                YearlyGrowth {
                    year,
                    total,
                    growth_pct,
                }
            })
            .collect())
    }

    /// Mean over customers of the number of distinct orders each placed.
    pub fn average_purchase_frequency(&self) -> ComputationResult<Option<f64>> {
        let customer = TransactionColumn::CustomerId.canonical_name();
        let order = TransactionColumn::OrderId.canonical_name();
        let per_customer = self
            .lazy()
            .group_by([col(customer)])
            .agg([col(order)
                .n_unique()
                .cast(DataType::Float64)
                .alias("orders")])
            .collect()?;
        Ok(per_customer.column("orders")?.f64()?.mean())
    }

    /// Mean of per-order sales totals.
    pub fn average_order_value(&self) -> ComputationResult<Option<f64>> {
        let order = TransactionColumn::OrderId.canonical_name();
        let sales = TransactionColumn::Sales.canonical_name();
        let per_order = self
            .lazy()
            .group_by([col(order)])
            .agg([col(sales).sum()])
            .collect()?;
        Ok(per_order.column(sales)?.f64()?.mean())
    }

    /// Mean per-order sales total within each segment, descending.
    pub fn average_order_value_by_segment(&self) -> ComputationResult<Grouped<String>> {
        let order = TransactionColumn::OrderId.canonical_name();
        let segment = TransactionColumn::Segment.canonical_name();
        let sales = TransactionColumn::Sales.canonical_name();
        let by_segment = self
            .lazy()
            .group_by_stable([col(order), col(segment)])
            .agg([col(sales).sum()])
            .group_by_stable([col(segment)])
            .agg([col(sales).mean()])
            .collect()?;
        Ok(grouped_from_frame(&by_segment, segment, sales)?.sorted(SortOrder::Descending))
    }

    /// Profit over sales per sub-category, descending with undefined margins last.
    pub fn subcategory_margins(&self) -> ComputationResult<Vec<SubCategoryMargin>> {
        let sub_category = TransactionColumn::SubCategory.canonical_name();
        let sales = TransactionColumn::Sales.canonical_name();
        let profit = TransactionColumn::Profit.canonical_name();
        let sums = self
            .lazy()
            .group_by_stable([col(sub_category)])
            .agg([col(profit).sum(), col(sales).sum()])
            .collect()?;

        let keys = sums.column(sub_category)?.str()?;
        let profits = sums.column(profit)?.f64()?;
        let sales = sums.column(sales)?.f64()?;

        let mut margins: Vec<SubCategoryMargin> = keys
            .into_iter()
            .zip(profits)
            .zip(sales)
            .filter_map(|((key, profit), sales)| {
                key.map(|key| SubCategoryMargin {
                    sub_category: key.to_string(),
                    margin: ratio(profit.unwrap_or(0.0), sales.unwrap_or(0.0)),
                })
            })
            .collect();
        margins.sort_by(|a, b| match (a.margin, b.margin) {
            (Some(a), Some(b)) => b.total_cmp(&a),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        Ok(margins)
    }

    /// Share of rows with negative profit, as a percentage. 0 for no rows.
    pub fn loss_order_percentage(&self) -> ComputationResult<f64> {
        let rows = self.table.height();
        if rows == 0 {
            return Ok(0.0);
        }
        let losses = self
            .table
            .f64_column(TransactionColumn::Profit)?
            .into_iter()
            .filter(|profit| profit.is_some_and(|profit| profit < 0.0))
            .count();
        Ok(losses as f64 / rows as f64 * 100.0)
    }

    /// Mean sale per calendar month number (1–12) across all years.
    pub fn average_sales_by_month(&self) -> ComputationResult<Grouped<u32>> {
        let date = TransactionColumn::OrderDate.canonical_name();
        let sales = TransactionColumn::Sales.canonical_name();
        let by_month = self
            .lazy()
            .filter(col(date).is_not_null().and(col(sales).is_not_null()))
            .group_by([col(date).dt().month().cast(DataType::Int32).alias(MONTH)])
            .agg([col(sales).mean()])
            .sort([MONTH], SortMultipleOptions::default())
            .collect()?;

        let months = by_month.column(MONTH)?.i32()?;
        let means = by_month.column(sales)?.f64()?;
        Ok(months
            .into_iter()
            .zip(means)
            .filter_map(|(month, mean)| Some((u32::try_from(month?).ok()?, mean?)))
            .collect())
    }

    /// Sales and profit per category, descending by sales.
    pub fn category_summary(&self) -> ComputationResult<Vec<CategorySummary>> {
        let sales = self.grouped_sum(TransactionColumn::Category, TransactionColumn::Sales)?;
        let profit: HashMap<String, f64> = self
            .grouped_sum(TransactionColumn::Category, TransactionColumn::Profit)?
            .entries
            .into_iter()
            .map(|entry| (entry.key, entry.value))
            .collect();

        Ok(sales
            .sorted(SortOrder::Descending)
            .entries
            .into_iter()
            .map(|entry| CategorySummary {
                profit: profit.get(&entry.key).copied().unwrap_or(0.0),
                category: entry.key,
                sales: entry.value,
            })
            .collect())
    }

    pub fn kpi_summary(&self) -> ComputationResult<KpiSummary> {
        Ok(KpiSummary {
            total_revenue: self.total_sales()?,
            total_profit: self.total_profit()?,
            average_order_value: self.average_order_value()?,
            profit_margin: self.profit_margin()?,
            discount_sales_correlation: self.discount_sales_correlation()?,
        })
    }

    /// Fits `forecaster` to the monthly sales series and projects `horizon`
    /// month ends past the last observed month.
    pub fn sales_forecast(
        &self,
        forecaster: &dyn Forecaster,
        horizon: usize,
    ) -> ComputationResult<SalesForecast> {
        let history = self.monthly_sales()?;
        let observations: Vec<f64> = history.values().collect();
        let model = forecaster.forecast(&observations, horizon)?;

        let mut periods = Vec::with_capacity(model.values.len());
        let mut last = history.keys().last().copied();
        for _ in 0..model.values.len() {
            let next = last
                .and_then(|end| Period::Month.next_end(end))
                .ok_or_else(|| ComputationError::DegenerateSeries("no forecast periods".into()))?;
            periods.push(next);
            last = Some(next);
        }

        let forecast = periods.into_iter().zip(model.values.iter().copied()).collect();
        Ok(SalesForecast {
            history,
            forecast,
            model,
        })
    }

    fn lazy(&self) -> LazyFrame {
        self.table.frame().clone().lazy()
    }

    fn column_sum(&self, column: TransactionColumn) -> ComputationResult<f64> {
        Ok(self.table.f64_column(column)?.sum().unwrap_or(0.0))
    }

    fn grouped_sum(
        &self,
        key: TransactionColumn,
        value: TransactionColumn,
    ) -> ComputationResult<Grouped<String>> {
        let key = key.canonical_name();
        let value = value.canonical_name();
        let sums = self
            .lazy()
            .group_by_stable([col(key)])
            .agg([col(value).sum()])
            .collect()?;
        grouped_from_frame(&sums, key, value)
    }

    fn period_sales(&self, period: Period) -> ComputationResult<Grouped<NaiveDate>> {
        let date = TransactionColumn::OrderDate.canonical_name();
        let sales = TransactionColumn::Sales.canonical_name();
        let sums = self
            .lazy()
            .filter(col(date).is_not_null())
            .group_by([
                col(date).dt().year().cast(DataType::Int32).alias(YEAR),
                period.closing_month(col(date)).alias(MONTH),
            ])
            .agg([col(sales).sum()])
            .sort([YEAR, MONTH], SortMultipleOptions::default())
            .collect()?;

        let years = sums.column(YEAR)?.i32()?;
        let months = sums.column(MONTH)?.i32()?;
        let values = sums.column(sales)?.f64()?;
        let totals: HashMap<NaiveDate, f64> = years
            .into_iter()
            .zip(months)
            .zip(values)
            .filter_map(|((year, month), total)| {
                let end = last_day_of_month(year?, u32::try_from(month?).ok()?)?;
                Some((end, total.unwrap_or(0.0)))
            })
            .collect();

        let (Some(&first), Some(&last)) = (totals.keys().min(), totals.keys().max()) else {
            return Ok(Grouped::default());
        };
        Ok(period
            .range(first, last)
            .into_iter()
            .map(|end| (end, totals.get(&end).copied().unwrap_or(0.0)))
            .collect())
    }

    fn pairs(
        &self,
        x: TransactionColumn,
        y: TransactionColumn,
    ) -> ComputationResult<Vec<(f64, f64)>> {
        let xs = self.table.f64_column(x)?;
        let ys = self.table.f64_column(y)?;
        Ok(xs
            .into_iter()
            .zip(ys)
            .filter_map(|(x, y)| Some((x?, y?)))
            .collect())
    }
}

/// Rows of two aggregated list columns paired up, dropping nulls.
fn paired_values(xs: Option<Series>, ys: Option<Series>) -> PolarsResult<Vec<(f64, f64)>> {
    let (Some(xs), Some(ys)) = (xs, ys) else {
        return Ok(Vec::new());
    };
    Ok(xs
        .f64()?
        .into_iter()
        .zip(ys.f64()?)
        .filter_map(|(x, y)| Some((x?, y?)))
        .collect())
}

fn grouped_from_frame(
    df: &DataFrame,
    key: &str,
    value: &str,
) -> ComputationResult<Grouped<String>> {
    let keys = df.column(key)?.str()?;
    let values = df.column(value)?.f64()?;
    Ok(keys
        .into_iter()
        .zip(values)
        .filter_map(|(key, value)| key.map(|key| (key.to_string(), value.unwrap_or(0.0))))
        .collect())
}
