use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use superstore_parser::{load_transactions, LoadError, TextEncoding, TransactionsTable};
use tracing::{debug, info};

/// Where a transactions table comes from; the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataSource {
    pub path: PathBuf,
    pub encoding: TextEncoding,
}

impl DataSource {
    pub fn new(path: impl Into<PathBuf>, encoding: TextEncoding) -> Self {
        Self {
            path: path.into(),
            encoding,
        }
    }

    pub fn load(&self) -> Result<TransactionsTable, LoadError> {
        load_transactions(&self.path, self.encoding)
    }
}

/// Loaded tables keyed by source. A source is read at most once until
/// [`TableCache::clear`] is called.
#[derive(Debug, Default)]
pub struct TableCache {
    entries: HashMap<DataSource, Arc<TransactionsTable>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&mut self, source: &DataSource) -> Result<Arc<TransactionsTable>, LoadError> {
        self.get_or_load_with(source, DataSource::load)
    }

    pub fn get_or_load_with<F>(
        &mut self,
        source: &DataSource,
        loader: F,
    ) -> Result<Arc<TransactionsTable>, LoadError>
    where
        F: FnOnce(&DataSource) -> Result<TransactionsTable, LoadError>,
    {
        if let Some(table) = self.entries.get(source) {
            debug!(path = %source.path.display(), "transactions cache hit");
            return Ok(Arc::clone(table));
        }

        let table = Arc::new(loader(source)?);
        self.entries.insert(source.clone(), Arc::clone(&table));
        Ok(table)
    }

    pub fn contains(&self, source: &DataSource) -> bool {
        self.entries.contains_key(source)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        info!(entries = self.entries.len(), "clearing transactions cache");
        self.entries.clear();
    }
}
