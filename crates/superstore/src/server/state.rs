use std::sync::Arc;

use anyhow::Result;
use superstore_core::{DataSource, TableCache};
use superstore_parser::TransactionsTable;
use tokio::sync::Mutex;

/// Shared by every request: where the data lives and the tables loaded so far.
pub struct AppState {
    source: DataSource,
    top_n: usize,
    cache: Arc<Mutex<TableCache>>,
}

impl AppState {
    pub fn new(source: DataSource, top_n: usize) -> Arc<Self> {
        Arc::new(Self {
            source,
            top_n,
            cache: Arc::new(Mutex::new(TableCache::new())),
        })
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Reads and parses on the blocking pool. Concurrent first requests wait
    /// on the cache lock, so the file is still read once.
    pub async fn table(&self) -> Result<Arc<TransactionsTable>> {
        let cache = Arc::clone(&self.cache);
        let source = self.source.clone();
        let table = tokio::task::spawn_blocking(move || cache.blocking_lock().get_or_load(&source))
            .await??;
        Ok(table)
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    pub async fn is_cached(&self) -> bool {
        self.cache.lock().await.contains(&self.source)
    }
}
