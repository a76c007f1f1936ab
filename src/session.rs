//! The fluent session: clause accumulation and chain lifecycle.
//!
//! A [`TidyDb`] owns the store connection, the accumulated [`QueryState`],
//! the cached table list and schema, and the chaining flag. Every fluent
//! verb returns `TidyResult<&mut Self>` so chains read naturally; the
//! chaining flag governs only the reset lifecycle around materializing
//! calls, never the return shape.

use crate::ast::{Aggregate, QueryState, Selection};
use crate::engine::{Frame, SqliteStore};
use crate::error::{TidyError, TidyResult};
use crate::parser;
use crate::schema::SchemaCache;
use crate::transpiler::ToSql;

/// A session against one embedded SQLite store.
///
/// One logical writer per session: every operation runs to completion before
/// the next is issued, and the `&mut self` receivers make concurrent use of
/// one handle a compile error rather than a data race.
///
/// # Example
///
/// ```rust,ignore
/// use tidylite::prelude::*;
///
/// let mut db = TidyDb::new();
/// db.connect("~/data/conflicts.sqlite").await?;
/// db.table("events").await?
///     .select("country, eventid:iday").await?
///     .filter("year > 2001")?
///     .arrange("desc(year), country")?;
/// let frame = db.collect().await?;
/// ```
#[derive(Debug)]
pub struct TidyDb {
    store: Option<SqliteStore>,
    tables: Option<Vec<String>>,
    schema: SchemaCache,
    state: QueryState,
    chaining: bool,
    last: Option<Frame>,
}

impl TidyDb {
    /// Fresh session with no connection and no table targeted.
    pub fn new() -> Self {
        Self {
            store: None,
            tables: None,
            schema: SchemaCache::new(),
            state: QueryState::new(),
            chaining: false,
            last: None,
        }
    }

    /// Open (or create) the database file at `path` and gather its tables.
    ///
    /// Connecting resets all query state. A failed attempt leaves the
    /// session exactly as it was.
    pub async fn connect(&mut self, path: &str) -> TidyResult<&mut Self> {
        let store = SqliteStore::open(path).await?;
        self.store = Some(store);
        self.tables = None;
        self.schema.invalidate();
        self.state.reset_all();
        self.last = None;
        self.gather_tables().await?;
        Ok(self)
    }

    /// Whether a connection has been established.
    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    /// All tables discovered in the store.
    pub async fn list_tables(&mut self) -> TidyResult<&[String]> {
        self.gather_tables().await?;
        Ok(self.tables.as_deref().unwrap_or(&[]))
    }

    /// Target a table for the accumulating query.
    ///
    /// An unknown name is reported without touching state, so the caller can
    /// retry with a corrected one. Retargeting invalidates the schema cache.
    pub async fn table(&mut self, name: &str) -> TidyResult<&mut Self> {
        self.gather_tables().await?;
        let known = self
            .tables
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .any(|table| table == name);
        if !known {
            return Err(TidyError::UnknownTable(name.to_string()));
        }
        if self.state.table.as_deref() != Some(name) {
            self.state.table = Some(name.to_string());
            self.schema.invalidate();
        }
        Ok(self)
    }

    /// The currently targeted table, if any.
    pub fn target_table(&self) -> Option<&str> {
        self.state.table.as_deref()
    }

    /// Ordered column names of the targeted table.
    pub async fn list_columns(&mut self) -> TidyResult<Vec<String>> {
        self.resolve_schema().await
    }

    /// Select columns by expression: comma-separated names, `first:last`
    /// ranges, and `*` wildcards, resolved against the live schema.
    ///
    /// An expression resolving to nothing falls back to all columns.
    pub async fn select(&mut self, columns: &str) -> TidyResult<&mut Self> {
        let schema = self.resolve_schema().await?;
        self.state.selection = parser::resolve_selection(columns, &schema);
        Ok(self)
    }

    /// Rename columns with `new = old` pairs, rewriting matching entries of
    /// the active column list to `old AS new`.
    pub async fn rename(&mut self, mapping: &str) -> TidyResult<&mut Self> {
        self.ensure_queued().await?;
        let pairs = parser::parse_renames(mapping);
        let schema = if self.state.selection.is_all() {
            self.resolve_schema().await?
        } else {
            Vec::new()
        };
        self.state.apply_renames(&pairs, &schema);
        Ok(self)
    }

    /// Keep rows matching a predicate. The text is passed through verbatim;
    /// the engine reports bad predicates at materialization.
    pub fn filter(&mut self, predicate: &str) -> TidyResult<&mut Self> {
        self.store()?;
        self.state.filter = Some(predicate.to_string());
        Ok(self)
    }

    /// Order rows by comma-separated entries, `col` ascending or `desc(col)`
    /// descending, in precedence order.
    pub fn arrange(&mut self, columns: &str) -> TidyResult<&mut Self> {
        self.store()?;
        self.state.order = parser::parse_order(columns);
        Ok(self)
    }

    /// Reduce to distinct rows of the selected columns. Idempotent.
    pub fn distinct(&mut self) -> TidyResult<&mut Self> {
        self.store()?;
        self.state.distinct = true;
        Ok(self)
    }

    /// Group by comma-separated columns. Required before any aggregation
    /// takes effect.
    pub async fn group_by(&mut self, columns: &str) -> TidyResult<&mut Self> {
        self.ensure_queued().await?;
        self.state.group = parser::parse_list(columns);
        Ok(self)
    }

    /// Mean of the named columns per group, aliased `<col>_mean`. With an
    /// empty expression the group columns themselves are aggregated.
    pub fn mean(&mut self, columns: &str) -> TidyResult<&mut Self> {
        self.aggregate(Aggregate::Mean, columns)
    }

    /// Minimum of the named columns per group, aliased `<col>_min`.
    pub fn min(&mut self, columns: &str) -> TidyResult<&mut Self> {
        self.aggregate(Aggregate::Min, columns)
    }

    /// Maximum of the named columns per group, aliased `<col>_max`.
    pub fn max(&mut self, columns: &str) -> TidyResult<&mut Self> {
        self.aggregate(Aggregate::Max, columns)
    }

    /// Sum of the named columns per group, aliased `<col>_sum`.
    pub fn sum(&mut self, columns: &str) -> TidyResult<&mut Self> {
        self.aggregate(Aggregate::Sum, columns)
    }

    /// Min and max of the named columns per group, aliased `<col>_min` and
    /// `<col>_max`.
    pub fn range(&mut self, columns: &str) -> TidyResult<&mut Self> {
        self.aggregate(Aggregate::Range, columns)
    }

    /// Row count per group, aliased `n`.
    pub fn count(&mut self) -> TidyResult<&mut Self> {
        self.aggregate(Aggregate::Count, "")
    }

    /// Share of the table's rows per group, aliased `prop`. The denominator
    /// always counts the full target table, ignoring any active filter.
    pub fn prop(&mut self) -> TidyResult<&mut Self> {
        self.aggregate(Aggregate::Prop, "")
    }

    /// Execute the accumulated query over all rows.
    pub async fn collect(&mut self) -> TidyResult<Frame> {
        self.ensure_queued().await?;
        let sql = self.state.to_sql();
        let frame = self.store()?.fetch(&sql).await?;
        self.last = Some(frame.clone());
        self.after_materialize();
        Ok(frame)
    }

    /// Execute the accumulated query over the first `n` rows.
    pub async fn head(&mut self, n: usize) -> TidyResult<Frame> {
        self.ensure_queued().await?;
        let sql = self.state.to_sql_limited(n);
        let frame = self.store()?.fetch(&sql).await?;
        self.last = Some(frame.clone());
        self.after_materialize();
        Ok(frame)
    }

    /// Escape hatch: run caller-supplied statement text unchanged and
    /// collect its rows. Accumulated clause state is not touched.
    pub async fn raw(&mut self, sql: &str) -> TidyResult<Frame> {
        let frame = self.store()?.fetch(sql).await?;
        self.last = Some(frame.clone());
        Ok(frame)
    }

    /// Escape hatch: run caller-supplied DDL/DML text, returning affected
    /// rows. Invalidates the cached table list so new tables become visible.
    pub async fn execute(&mut self, sql: &str) -> TidyResult<u64> {
        let affected = self.store()?.execute(sql).await?;
        self.tables = None;
        Ok(affected)
    }

    /// Render the accumulated statement without executing it.
    pub fn sql(&self) -> String {
        self.state.to_sql()
    }

    /// The most recently materialized result, if any.
    pub fn last_result(&self) -> Option<&Frame> {
        self.last.as_ref()
    }

    /// Clear the column selection back to all columns.
    pub fn clear_selected(&mut self) -> &mut Self {
        self.state.selection = Selection::All;
        self
    }

    /// Clear the filter predicate.
    pub fn clear_filter(&mut self) -> &mut Self {
        self.state.filter = None;
        self
    }

    /// Clear the ordering.
    pub fn clear_arrange(&mut self) -> &mut Self {
        self.state.order.clear();
        self
    }

    /// Clear the grouping.
    pub fn clear_groupby(&mut self) -> &mut Self {
        self.state.group.clear();
        self
    }

    /// Clear every clause field and the cached last result. The target
    /// table survives an explicit clear.
    pub fn clear(&mut self) -> &mut Self {
        self.state.reset_clauses();
        self.last = None;
        self
    }

    /// Enter chaining mode: clause state is cleared now, and every
    /// materializing call resets clause state and the target table right
    /// after producing its result. One pipeline, one result.
    pub fn enable_chaining(&mut self) -> &mut Self {
        self.chaining = true;
        self.state.reset_clauses();
        self
    }

    /// Leave chaining mode; accumulated state persists across
    /// materializing calls again.
    pub fn disable_chaining(&mut self) -> &mut Self {
        self.chaining = false;
        self
    }

    /// Whether chaining mode is active.
    pub fn chaining_enabled(&self) -> bool {
        self.chaining
    }

    fn store(&self) -> TidyResult<&SqliteStore> {
        self.store.as_ref().ok_or(TidyError::NotConnected)
    }

    async fn gather_tables(&mut self) -> TidyResult<()> {
        if self.tables.is_none() {
            let tables = self.store()?.tables().await?;
            self.tables = Some(tables);
        }
        Ok(())
    }

    /// Ensure a table is targeted, auto-selecting the first discovered one
    /// with a notice when none is. Returns the target's name.
    async fn ensure_queued(&mut self) -> TidyResult<String> {
        self.store()?;
        if let Some(table) = self.state.table.clone() {
            return Ok(table);
        }
        self.gather_tables().await?;
        let first = self
            .tables
            .as_deref()
            .and_then(|tables| tables.first())
            .cloned()
            .ok_or(TidyError::NoTables)?;
        tracing::info!(table = %first, "no table queued; targeting first available table");
        self.state.table = Some(first.clone());
        self.schema.invalidate();
        Ok(first)
    }

    async fn resolve_schema(&mut self) -> TidyResult<Vec<String>> {
        let table = self.ensure_queued().await?;
        let store = self.store.as_ref().ok_or(TidyError::NotConnected)?;
        let columns = self.schema.resolve(store, &table).await?;
        Ok(columns.to_vec())
    }

    fn aggregate(&mut self, agg: Aggregate, columns: &str) -> TidyResult<&mut Self> {
        self.store()?;
        let columns = parser::parse_list(columns);
        self.state.apply_aggregate(agg, &columns);
        Ok(self)
    }

    fn after_materialize(&mut self) {
        if self.chaining {
            // One pipeline, one result: the next chain re-selects a table.
            self.state.reset_all();
            self.schema.invalidate();
        }
    }
}

impl Default for TidyDb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operations_require_connection() {
        let mut db = TidyDb::new();
        assert!(matches!(db.filter("x > 1"), Err(TidyError::NotConnected)));
        assert!(matches!(db.arrange("x"), Err(TidyError::NotConnected)));
        assert!(matches!(db.distinct(), Err(TidyError::NotConnected)));
        assert!(matches!(db.mean("x"), Err(TidyError::NotConnected)));
        assert!(!db.is_connected());
    }

    #[tokio::test]
    async fn test_materialize_requires_connection() {
        let mut db = TidyDb::new();
        assert!(matches!(db.collect().await, Err(TidyError::NotConnected)));
        assert!(matches!(db.table("events").await, Err(TidyError::NotConnected)));
    }

    #[tokio::test]
    async fn test_unknown_table_leaves_state_unchanged() {
        let mut db = TidyDb::new();
        db.connect(":memory:").await.unwrap();
        db.execute("CREATE TABLE events (country TEXT)").await.unwrap();
        db.table("events").await.unwrap();

        let err = db.table("evnts").await.unwrap_err();
        assert!(matches!(err, TidyError::UnknownTable(_)));
        assert_eq!(db.target_table(), Some("events"));
    }

    #[tokio::test]
    async fn test_sql_reflects_accumulated_state() {
        let mut db = TidyDb::new();
        db.connect(":memory:").await.unwrap();
        db.execute("CREATE TABLE events (country TEXT, year INTEGER)")
            .await
            .unwrap();
        db.table("events").await.unwrap();
        db.filter("year > 2001").unwrap().arrange("desc(year)").unwrap();
        assert_eq!(
            db.sql(),
            "SELECT * FROM 'events' WHERE year > 2001 ORDER BY year desc"
        );
    }

    #[tokio::test]
    async fn test_auto_select_targets_first_table() {
        let mut db = TidyDb::new();
        db.connect(":memory:").await.unwrap();
        db.execute("CREATE TABLE events (country TEXT)").await.unwrap();
        db.execute("INSERT INTO events VALUES ('US')").await.unwrap();

        // No explicit table() call: the first discovered table is targeted.
        let frame = db.collect().await.unwrap();
        assert_eq!(frame.row_count(), 1);
        assert_eq!(db.target_table(), Some("events"));
    }

    #[tokio::test]
    async fn test_empty_database_cannot_auto_select() {
        let mut db = TidyDb::new();
        db.connect(":memory:").await.unwrap();
        assert!(matches!(db.collect().await, Err(TidyError::NoTables)));
    }
}
