use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::{debug, info};

use crate::errors::LoadError;
use crate::model::{TextEncoding, TransactionColumns, TransactionRow, TransactionsTable};
use crate::schema::TransactionColumn;

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d", "%m-%d-%Y", "%Y/%m/%d", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Reads and decodes a transactions file, then parses it with
/// [`parse_transactions`].
pub fn load_transactions(
    path: impl AsRef<Path>,
    encoding: TextEncoding,
) -> Result<TransactionsTable, LoadError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let content = encoding.decode(&bytes)?;
    let table = parse_transactions(&content)?;
    info!(
        path = %path.display(),
        %encoding,
        rows = table.height(),
        null_order_dates = table.null_order_dates(),
        "loaded transactions"
    );
    Ok(table)
}

/// Parses comma-delimited transactions with a header row. Order dates that do
/// not parse become null; everything else that is malformed is an error.
pub fn parse_transactions(content: &str) -> Result<TransactionsTable, LoadError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|cell| cell.trim().is_empty()) {
        return Err(LoadError::MissingHeader);
    }
    let positions = locate_columns(&headers)?;

    let mut columns = TransactionColumns::default();
    let mut rows = 0usize;
    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        let line_index = row_idx + 2; // header is line 1
        columns.push(parse_row(&record, &positions, line_index)?);
        rows += 1;
    }
    debug!(rows, "parsed transaction rows");

    TransactionsTable::new(columns.into_frame()?)
}

/// Parses one order-date cell, returning `None` for anything unrecognized.
pub fn parse_order_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
                .map(|datetime| datetime.date())
        })
}

struct ColumnPositions([usize; TransactionColumn::COUNT]);

impl ColumnPositions {
    fn get(&self, column: TransactionColumn) -> usize {
        self.0[column.index()]
    }
}

fn locate_columns(headers: &StringRecord) -> Result<ColumnPositions, LoadError> {
    let mut found: [Option<usize>; TransactionColumn::COUNT] = [None; TransactionColumn::COUNT];

    for (idx, header) in headers.iter().enumerate() {
        let Some(column) = TransactionColumn::classify(header) else {
            continue;
        };
        // first occurrence wins
        found[column.index()].get_or_insert(idx);
    }

    let missing: Vec<&'static str> = TransactionColumn::ALL
        .iter()
        .zip(found.iter())
        .filter(|(_, position)| position.is_none())
        .map(|(column, _)| column.source_header())
        .collect();
    if !missing.is_empty() {
        return Err(LoadError::MissingColumn { missing });
    }

    Ok(ColumnPositions(found.map(|position| position.unwrap_or_default())))
}

fn parse_row(
    record: &StringRecord,
    positions: &ColumnPositions,
    line_index: usize,
) -> Result<TransactionRow, LoadError> {
    let text = |column: TransactionColumn| -> String {
        record
            .get(positions.get(column))
            .unwrap_or("")
            .trim()
            .to_string()
    };
    let number = |column: TransactionColumn| -> Result<Option<f64>, LoadError> {
        parse_optional_f64(
            record.get(positions.get(column)).unwrap_or(""),
            line_index,
            column,
        )
    };

    Ok(TransactionRow {
        order_id: text(TransactionColumn::OrderId),
        order_date: parse_order_date(
            record
                .get(positions.get(TransactionColumn::OrderDate))
                .unwrap_or(""),
        ),
        customer_id: text(TransactionColumn::CustomerId),
        region: text(TransactionColumn::Region),
        state: text(TransactionColumn::State),
        segment: text(TransactionColumn::Segment),
        category: text(TransactionColumn::Category),
        sub_category: text(TransactionColumn::SubCategory),
        product_name: text(TransactionColumn::ProductName),
        sales: number(TransactionColumn::Sales)?,
        profit: number(TransactionColumn::Profit)?,
        discount: number(TransactionColumn::Discount)?,
    })
}

fn parse_optional_f64(
    value: &str,
    line_index: usize,
    column: TransactionColumn,
) -> Result<Option<f64>, LoadError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| LoadError::InvalidNumber {
            line_index,
            column: column.source_header(),
            value: trimmed.to_string(),
        })
}
