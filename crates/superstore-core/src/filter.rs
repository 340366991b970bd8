use std::collections::BTreeSet;

use polars::prelude::*;
use superstore_parser::{TransactionColumn, TransactionsTable};

/// Allowed region values. An empty selection means every region passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionFilter {
    allowed: BTreeSet<String>,
}

impl RegionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<I, S>(regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: regions
                .into_iter()
                .map(Into::into)
                .filter(|region: &String| !region.trim().is_empty())
                .collect(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn allows(&self, region: &str) -> bool {
        self.is_unrestricted() || self.allowed.contains(region)
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    pub fn apply(&self, table: &TransactionsTable) -> PolarsResult<TransactionsTable> {
        if self.is_unrestricted() {
            return Ok(table.clone());
        }
        let mask: BooleanChunked = table
            .str_column(TransactionColumn::Region)?
            .into_iter()
            .map(|region| region.is_some_and(|region| self.allows(region)))
            .collect();
        table.filter(&mask)
    }
}
