use polars::prelude::DataType;

/// Semantic role of a transactions column, checked once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    Text,
    Date,
    Currency,
    Fraction,
}

impl SemanticType {
    pub fn dtype(&self) -> DataType {
        match self {
            SemanticType::Text => DataType::String,
            SemanticType::Date => DataType::Date,
            SemanticType::Currency | SemanticType::Fraction => DataType::Float64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionColumn {
    OrderId,
    OrderDate,
    CustomerId,
    Region,
    State,
    Segment,
    Category,
    SubCategory,
    ProductName,
    Sales,
    Profit,
    Discount,
}

impl TransactionColumn {
    pub const COUNT: usize = 12;

    pub const ALL: [TransactionColumn; Self::COUNT] = [
        TransactionColumn::OrderId,
        TransactionColumn::OrderDate,
        TransactionColumn::CustomerId,
        TransactionColumn::Region,
        TransactionColumn::State,
        TransactionColumn::Segment,
        TransactionColumn::Category,
        TransactionColumn::SubCategory,
        TransactionColumn::ProductName,
        TransactionColumn::Sales,
        TransactionColumn::Profit,
        TransactionColumn::Discount,
    ];

    /// Position of the column in [`TransactionColumn::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn canonical_name(&self) -> &'static str {
        match self {
            TransactionColumn::OrderId => "order_id",
            TransactionColumn::OrderDate => "order_date",
            TransactionColumn::CustomerId => "customer_id",
            TransactionColumn::Region => "region",
            TransactionColumn::State => "state",
            TransactionColumn::Segment => "segment",
            TransactionColumn::Category => "category",
            TransactionColumn::SubCategory => "sub_category",
            TransactionColumn::ProductName => "product_name",
            TransactionColumn::Sales => "sales",
            TransactionColumn::Profit => "profit",
            TransactionColumn::Discount => "discount",
        }
    }

    /// Header text used by the store export files.
    pub fn source_header(&self) -> &'static str {
        match self {
            TransactionColumn::OrderId => "Order ID",
            TransactionColumn::OrderDate => "Order Date",
            TransactionColumn::CustomerId => "Customer ID",
            TransactionColumn::Region => "Region",
            TransactionColumn::State => "State",
            TransactionColumn::Segment => "Segment",
            TransactionColumn::Category => "Category",
            TransactionColumn::SubCategory => "Sub-Category",
            TransactionColumn::ProductName => "Product Name",
            TransactionColumn::Sales => "Sales",
            TransactionColumn::Profit => "Profit",
            TransactionColumn::Discount => "Discount",
        }
    }

    pub fn semantic_type(&self) -> SemanticType {
        match self {
            TransactionColumn::OrderDate => SemanticType::Date,
            TransactionColumn::Sales | TransactionColumn::Profit => SemanticType::Currency,
            TransactionColumn::Discount => SemanticType::Fraction,
            _ => SemanticType::Text,
        }
    }

    /// Matches a header cell against the source header or the canonical name.
    /// Comparison ignores case, surrounding whitespace, a leading BOM, and the
    /// difference between spaces, dashes and underscores.
    pub fn classify(header: &str) -> Option<TransactionColumn> {
        let normalized = normalize_header(header);
        Self::ALL.into_iter().find(|column| {
            normalize_header(column.source_header()) == normalized
                || normalize_header(column.canonical_name()) == normalized
        })
    }
}

fn normalize_header(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .trim()
        .chars()
        .filter_map(|ch| match ch {
            ' ' | '-' | '_' => None,
            other => Some(other.to_ascii_lowercase()),
        })
        .collect()
}
