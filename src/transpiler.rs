//! SQL renderer for accumulated query state.
//!
//! Assembles one executable statement from a [`QueryState`]. Clause order is
//! fixed: SELECT (with DISTINCT), FROM, GROUP BY, WHERE, ORDER BY, with LIMIT
//! appended only by the bounded variant. GROUP BY deliberately precedes
//! WHERE. Rendering itself never fails; malformed fragments are reported by
//! the engine at execution.

use crate::ast::{QueryState, Selection};

/// Trait for converting query state to SQL.
pub trait ToSql {
    /// Convert this node to a SQL string.
    fn to_sql(&self) -> String;
}

impl ToSql for QueryState {
    fn to_sql(&self) -> String {
        self.render(None)
    }
}

impl QueryState {
    /// Render the bounded preview variant with a trailing LIMIT.
    pub fn to_sql_limited(&self, limit: usize) -> String {
        self.render(Some(limit))
    }

    fn render(&self, limit: Option<usize>) -> String {
        let mut sql = String::from("SELECT ");

        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        match &self.selection {
            Selection::All => sql.push('*'),
            Selection::Columns(cols) => sql.push_str(&cols.join(", ")),
        }

        sql.push_str(" FROM '");
        sql.push_str(self.table.as_deref().unwrap_or(""));
        sql.push('\'');

        if !self.group.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group.join(", "));
        }

        if let Some(predicate) = &self.filter {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }

        if !self.order.is_empty() {
            let entries: Vec<String> = self
                .order
                .iter()
                .map(|key| format!("{} {}", key.column, key.order.keyword()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&entries.join(", "));
        }

        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }

        sql
    }
}
