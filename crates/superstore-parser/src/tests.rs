use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::errors::LoadError;
use crate::model::{TextEncoding, TransactionRow, TransactionsTable};
use crate::schema::TransactionColumn;
use crate::{load_transactions, parse_order_date, parse_transactions};

fn fixture_path(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(path)
}

fn fixture_bytes(path: &str) -> Vec<u8> {
    let full_path = fixture_path(path);
    fs::read(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

fn row(region: &str, sales: f64, profit: f64) -> TransactionRow {
    TransactionRow {
        order_id: "O-1".to_string(),
        order_date: NaiveDate::from_ymd_opt(2017, 1, 15),
        customer_id: "C-1".to_string(),
        region: region.to_string(),
        state: "Ohio".to_string(),
        segment: "Consumer".to_string(),
        category: "Furniture".to_string(),
        sub_category: "Chairs".to_string(),
        product_name: "Chair".to_string(),
        sales: Some(sales),
        profit: Some(profit),
        discount: Some(0.0),
    }
}

#[test]
fn loads_latin1_store_export() {
    let table = load_transactions(fixture_path("store_sample.csv"), TextEncoding::Latin1)
        .expect("latin1 load failed");

    assert_eq!(table.height(), 13);
    let expected: Vec<&str> = TransactionColumn::ALL
        .iter()
        .map(|column| column.canonical_name())
        .collect();
    assert_eq!(table.frame().get_column_names(), expected);

    let products = table
        .str_column(TransactionColumn::ProductName)
        .expect("product column");
    assert_eq!(products.get(12), Some("Café Phone Stand"));
    assert_eq!(
        products.get(1),
        Some("Hon Deluxe Fabric Upholstered Stacking Chairs, Rounded Back")
    );
}

#[test]
fn unparsable_order_dates_become_null() {
    let table = load_transactions(fixture_path("store_sample.csv"), TextEncoding::Latin1)
        .expect("load failed");

    assert_eq!(table.null_order_dates(), 1);
    let dates = table.order_dates().expect("order dates");
    assert_eq!(dates[0], NaiveDate::from_ymd_opt(2016, 11, 8));
    assert_eq!(dates[6], None);
}

#[test]
fn utf8_rejects_latin1_bytes() {
    let err = load_transactions(fixture_path("store_sample.csv"), TextEncoding::Utf8)
        .expect_err("latin1 bytes are not utf8");
    assert!(matches!(
        err,
        LoadError::Encoding {
            encoding: TextEncoding::Utf8,
            ..
        }
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_transactions(fixture_path("does_not_exist.csv"), TextEncoding::Latin1)
        .expect_err("missing file must fail");
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn missing_required_columns_are_reported() {
    let content = TextEncoding::Latin1
        .decode(&fixture_bytes("missing_columns.csv"))
        .expect("decode");
    let err = parse_transactions(&content).expect_err("schema check must fail");
    match err {
        LoadError::MissingColumn { missing } => {
            assert_eq!(missing, vec!["Sub-Category", "Discount"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_input_has_no_header() {
    let err = parse_transactions("").expect_err("empty input");
    assert!(matches!(err, LoadError::MissingHeader));
}

#[test]
fn non_numeric_sales_fail_the_load() {
    let content = "Order ID,Order Date,Customer ID,Region,State,Segment,Category,Sub-Category,Product Name,Sales,Profit,Discount\n\
                   A-1,1/2/2017,C-1,East,Ohio,Consumer,Furniture,Chairs,Desk,ten,1,0\n";
    let err = parse_transactions(content).expect_err("bad number");
    assert_eq!(err.to_string(), "line 2 column 'Sales' is not numeric: 'ten'");
    match err {
        LoadError::InvalidNumber {
            line_index,
            column,
            value,
        } => {
            assert_eq!(line_index, 2);
            assert_eq!(column, "Sales");
            assert_eq!(value, "ten");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_numeric_cells_load_as_null() {
    let content = "order_id,order_date,customer_id,region,state,segment,category,sub_category,product_name,sales,profit,discount\n\
                   A-1,2017-01-02,C-1,East,Ohio,Consumer,Furniture,Chairs,Desk,,1.5,\n";
    let table = parse_transactions(content).expect("canonical headers parse");
    let sales = table.f64_column(TransactionColumn::Sales).expect("sales");
    assert_eq!(sales.get(0), None);
    assert_eq!(sales.null_count(), 1);
    let profit = table.f64_column(TransactionColumn::Profit).expect("profit");
    assert_eq!(profit.get(0), Some(1.5));
}

#[test]
fn order_date_formats() {
    assert_eq!(
        parse_order_date("11/8/2016"),
        NaiveDate::from_ymd_opt(2016, 11, 8)
    );
    assert_eq!(
        parse_order_date("2016-11-08"),
        NaiveDate::from_ymd_opt(2016, 11, 8)
    );
    assert_eq!(
        parse_order_date("2016-11-08 13:45:00"),
        NaiveDate::from_ymd_opt(2016, 11, 8)
    );
    assert_eq!(parse_order_date("13/45/2016"), None);
    assert_eq!(parse_order_date("  "), None);
}

#[test]
fn header_classification_is_lenient() {
    assert_eq!(
        TransactionColumn::classify("\u{feff}Sub-Category"),
        Some(TransactionColumn::SubCategory)
    );
    assert_eq!(
        TransactionColumn::classify(" product name "),
        Some(TransactionColumn::ProductName)
    );
    assert_eq!(
        TransactionColumn::classify("order_date"),
        Some(TransactionColumn::OrderDate)
    );
    assert_eq!(TransactionColumn::classify("Ship Mode"), None);
}

#[test]
fn table_from_rows_lists_regions_in_first_seen_order() {
    let table = TransactionsTable::from_rows(vec![
        row("West", 1.0, 0.5),
        row("East", 2.0, 0.5),
        row("West", 3.0, 0.5),
    ])
    .expect("table");
    assert_eq!(table.regions().expect("regions"), vec!["West", "East"]);
}

#[test]
fn empty_table_keeps_schema() {
    let table = TransactionsTable::from_rows(Vec::new()).expect("empty table");
    assert!(table.is_empty());
    assert_eq!(table.frame().width(), TransactionColumn::COUNT);
}

#[test]
fn encoding_names_parse() {
    assert_eq!("latin-1".parse::<TextEncoding>(), Ok(TextEncoding::Latin1));
    assert_eq!("UTF-8".parse::<TextEncoding>(), Ok(TextEncoding::Utf8));
    assert!("cp1252".parse::<TextEncoding>().is_err());
}
