use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::LoadError;
use crate::schema::TransactionColumn;

/// Days between 0001-01-01 (CE day 1) and the unix epoch.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub fn date_to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

pub fn epoch_days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    #[default]
    #[serde(alias = "latin-1", alias = "iso-8859-1")]
    Latin1,
    #[serde(alias = "utf-8")]
    Utf8,
}

impl TextEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Latin1 => "latin1",
            TextEncoding::Utf8 => "utf8",
        }
    }

    /// Latin-1 maps each byte to the code point with the same value, so it
    /// accepts any input. UTF-8 rejects invalid sequences.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, LoadError> {
        match self {
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&byte| char::from(byte)).collect()),
            TextEncoding::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|err| {
                LoadError::Encoding {
                    encoding: *self,
                    message: err.to_string(),
                }
            }),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "latin1" | "latin-1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            "utf8" | "utf-8" => Ok(TextEncoding::Utf8),
            other => Err(format!("unsupported text encoding '{other}'")),
        }
    }
}

/// One retail order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub order_id: String,
    pub order_date: Option<NaiveDate>,
    pub customer_id: String,
    pub region: String,
    pub state: String,
    pub segment: String,
    pub category: String,
    pub sub_category: String,
    pub product_name: String,
    pub sales: Option<f64>,
    pub profit: Option<f64>,
    pub discount: Option<f64>,
}

#[derive(Debug, Default)]
pub(crate) struct TransactionColumns {
    order_id: Vec<String>,
    order_date: Vec<Option<i32>>,
    customer_id: Vec<String>,
    region: Vec<String>,
    state: Vec<String>,
    segment: Vec<String>,
    category: Vec<String>,
    sub_category: Vec<String>,
    product_name: Vec<String>,
    sales: Vec<Option<f64>>,
    profit: Vec<Option<f64>>,
    discount: Vec<Option<f64>>,
}

impl TransactionColumns {
    pub(crate) fn push(&mut self, row: TransactionRow) {
        self.order_id.push(row.order_id);
        self.order_date.push(row.order_date.map(date_to_epoch_days));
        self.customer_id.push(row.customer_id);
        self.region.push(row.region);
        self.state.push(row.state);
        self.segment.push(row.segment);
        self.category.push(row.category);
        self.sub_category.push(row.sub_category);
        self.product_name.push(row.product_name);
        self.sales.push(row.sales);
        self.profit.push(row.profit);
        self.discount.push(row.discount);
    }

    pub(crate) fn into_frame(self) -> Result<DataFrame, PolarsError> {
        let order_date = Series::new(
            TransactionColumn::OrderDate.canonical_name().into(),
            self.order_date,
        )
        .cast(&DataType::Date)?;

        DataFrame::new(vec![
            Series::new(TransactionColumn::OrderId.canonical_name().into(), self.order_id).into(),
            order_date.into(),
            Series::new(
                TransactionColumn::CustomerId.canonical_name().into(),
                self.customer_id,
            )
            .into(),
            Series::new(TransactionColumn::Region.canonical_name().into(), self.region).into(),
            Series::new(TransactionColumn::State.canonical_name().into(), self.state).into(),
            Series::new(TransactionColumn::Segment.canonical_name().into(), self.segment).into(),
            Series::new(TransactionColumn::Category.canonical_name().into(), self.category).into(),
            Series::new(
                TransactionColumn::SubCategory.canonical_name().into(),
                self.sub_category,
            )
            .into(),
            Series::new(
                TransactionColumn::ProductName.canonical_name().into(),
                self.product_name,
            )
            .into(),
            Series::new(TransactionColumn::Sales.canonical_name().into(), self.sales).into(),
            Series::new(TransactionColumn::Profit.canonical_name().into(), self.profit).into(),
            Series::new(TransactionColumn::Discount.canonical_name().into(), self.discount).into(),
        ])
    }
}

/// The loaded transactions, read-only after construction. Column names and
/// dtypes always match [`TransactionColumn`].
#[derive(Debug, Clone)]
pub struct TransactionsTable {
    df: DataFrame,
}

impl TransactionsTable {
    /// Wraps a frame after checking every declared column is present with the
    /// declared dtype. Extra columns are dropped.
    pub fn new(df: DataFrame) -> Result<Self, LoadError> {
        let mut missing = Vec::new();
        for column in TransactionColumn::ALL {
            let name = column.canonical_name();
            let Ok(found) = df.column(name) else {
                missing.push(name);
                continue;
            };
            let expected = column.semantic_type().dtype();
            if found.dtype() != &expected {
                return Err(LoadError::ColumnType {
                    column: name,
                    expected: expected.to_string(),
                    found: found.dtype().to_string(),
                });
            }
        }
        if !missing.is_empty() {
            return Err(LoadError::MissingColumn { missing });
        }

        let df = df.select(TransactionColumn::ALL.map(|column| column.canonical_name()))?;
        Ok(Self { df })
    }

    pub fn from_rows<I>(rows: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = TransactionRow>,
    {
        let mut columns = TransactionColumns::default();
        for row in rows {
            columns.push(row);
        }
        Self::new(columns.into_frame()?)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Keeps the rows whose mask entry is true.
    pub fn filter(&self, mask: &BooleanChunked) -> Result<Self, PolarsError> {
        Ok(Self {
            df: self.df.filter(mask)?,
        })
    }

    pub fn str_column(&self, column: TransactionColumn) -> PolarsResult<&StringChunked> {
        self.df.column(column.canonical_name())?.str()
    }

    pub fn f64_column(&self, column: TransactionColumn) -> PolarsResult<&Float64Chunked> {
        self.df.column(column.canonical_name())?.f64()
    }

    pub fn order_dates(&self) -> PolarsResult<Vec<Option<NaiveDate>>> {
        let physical = self
            .df
            .column(TransactionColumn::OrderDate.canonical_name())?
            .as_materialized_series()
            .to_physical_repr();
        let days = physical.i32()?;
        Ok(days
            .into_iter()
            .map(|value| value.and_then(epoch_days_to_date))
            .collect())
    }

    pub fn null_order_dates(&self) -> usize {
        self.df
            .column(TransactionColumn::OrderDate.canonical_name())
            .map(|column| column.null_count())
            .unwrap_or(0)
    }

    /// Distinct values of a text column in first-seen order.
    pub fn distinct(&self, column: TransactionColumn) -> PolarsResult<Vec<String>> {
        let values = self.str_column(column)?;
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for value in values.into_iter().flatten() {
            if seen.insert(value) {
                ordered.push(value.to_string());
            }
        }
        Ok(ordered)
    }

    pub fn regions(&self) -> PolarsResult<Vec<String>> {
        self.distinct(TransactionColumn::Region)
    }
}
