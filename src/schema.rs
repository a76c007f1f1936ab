//! Live schema resolution with per-table caching.
//!
//! Column lists come from the store by describing a zero-row projection of
//! the target table; only the headers are read. The cache holds one entry,
//! keyed by table name, and is invalidated whenever the session retargets.

use crate::engine::SqliteStore;
use crate::error::{TidyError, TidyResult};

/// Cached ordered column list for the current target table.
#[derive(Debug, Clone, Default)]
pub struct SchemaCache {
    entry: Option<(String, Vec<String>)>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table the cache currently holds columns for.
    pub fn cached_table(&self) -> Option<&str> {
        self.entry.as_ref().map(|(table, _)| table.as_str())
    }

    /// Drop the cached entry so the next resolve refetches.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// Ordered column names of `table`, fetched once and held until the
    /// target changes. Discovery failures propagate; nothing is retried.
    pub async fn resolve(&mut self, store: &SqliteStore, table: &str) -> TidyResult<&[String]> {
        let hit = matches!(&self.entry, Some((cached, _)) if cached == table);
        if !hit {
            let columns = store
                .columns(table)
                .await
                .map_err(|e| TidyError::schema(table, e.to_string()))?;
            self.entry = Some((table.to_string(), columns));
        }
        Ok(self
            .entry
            .as_ref()
            .map(|(_, columns)| columns.as_slice())
            .unwrap_or(&[]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with_events() -> SqliteStore {
        let store = SqliteStore::open(":memory:").await.unwrap();
        store
            .execute("CREATE TABLE events (country TEXT, year INTEGER, deaths INTEGER)")
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_resolve_reads_ordered_columns() {
        let store = store_with_events().await;
        let mut cache = SchemaCache::new();
        let columns = cache.resolve(&store, "events").await.unwrap();
        assert_eq!(columns, &["country", "year", "deaths"]);
        assert_eq!(cache.cached_table(), Some("events"));
    }

    #[tokio::test]
    async fn test_cache_survives_store_changes_until_invalidated() {
        let store = store_with_events().await;
        let mut cache = SchemaCache::new();
        cache.resolve(&store, "events").await.unwrap();

        store.execute("DROP TABLE events").await.unwrap();

        // Cached entry still answers for the same table.
        let columns = cache.resolve(&store, "events").await.unwrap();
        assert_eq!(columns.len(), 3);

        cache.invalidate();
        let err = cache.resolve(&store, "events").await.unwrap_err();
        assert!(matches!(err, TidyError::SchemaUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_missing_table_is_schema_unavailable() {
        let store = SqliteStore::open(":memory:").await.unwrap();
        let mut cache = SchemaCache::new();
        let err = cache.resolve(&store, "nowhere").await.unwrap_err();
        match err {
            TidyError::SchemaUnavailable { table, .. } => assert_eq!(table, "nowhere"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
