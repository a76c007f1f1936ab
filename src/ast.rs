//! Query state for tidylite sessions.
//!
//! This module defines the data structures that represent an accumulated
//! query: the target table, the active column selection, and the filter,
//! group, order, and distinct clauses. Every fluent verb on a session is a
//! transformation of this record; rendering it to SQL lives in
//! [`crate::transpiler`].

use serde::{Deserialize, Serialize};

/// The active column selection of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Selection {
    /// No explicit restriction, rendered as `*`.
    #[default]
    All,
    /// Ordered column expressions (possibly aliased or aggregated).
    Columns(Vec<String>),
}

impl Selection {
    /// Whether this selection is the all-columns sentinel.
    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }
}

/// Sort direction for one ORDER BY entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// SQL keyword for this direction.
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// One ORDER BY entry: a column and its direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderKey {
    pub column: String,
    pub order: SortOrder,
}

impl OrderKey {
    /// Ascending entry.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Asc,
        }
    }

    /// Descending entry.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Grouped-aggregate kinds supported by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregate {
    Mean,
    Min,
    Max,
    Sum,
    /// Emits both a min- and a max-aliased expression per column.
    Range,
    /// Row count per group, aliased `n`.
    Count,
    /// Share of the full table's rows per group, aliased `prop`.
    Prop,
}

impl Aggregate {
    /// SQL function name and alias suffix for the simple aggregates.
    fn function(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Aggregate::Mean => Some(("avg", "mean")),
            Aggregate::Min => Some(("min", "min")),
            Aggregate::Max => Some(("max", "max")),
            Aggregate::Sum => Some(("sum", "sum")),
            _ => None,
        }
    }
}

/// The accumulated state of one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QueryState {
    /// Target table; `None` until chosen or auto-selected.
    pub table: Option<String>,
    /// Selected columns, or the all-columns sentinel.
    pub selection: Selection,
    /// Opaque boolean predicate text, passed through to the engine.
    pub filter: Option<String>,
    /// GROUP BY columns; empty means not grouped.
    pub group: Vec<String>,
    /// ORDER BY entries in precedence order.
    pub order: Vec<OrderKey>,
    /// Whether SELECT DISTINCT is requested.
    pub distinct: bool,
}

impl QueryState {
    /// Fresh state with no table targeted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a group-by clause is active.
    pub fn is_grouped(&self) -> bool {
        !self.group.is_empty()
    }

    /// Reset every clause field, keeping the target table.
    pub fn reset_clauses(&mut self) {
        self.selection = Selection::All;
        self.filter = None;
        self.group.clear();
        self.order.clear();
        self.distinct = false;
    }

    /// Reset every clause field and the target table.
    pub fn reset_all(&mut self) {
        self.reset_clauses();
        self.table = None;
    }

    /// Rewrite renamed entries of the active column list to `old AS new`.
    ///
    /// `base` is the currently selected list, or the full schema when the
    /// selection is the all-columns sentinel. Matching is plain string
    /// equality against the entries, so a rename of a prior alias does not
    /// resolve. Unmatched pairs are ignored.
    pub fn apply_renames(&mut self, pairs: &[(String, String)], schema: &[String]) {
        let base: Vec<String> = match &self.selection {
            Selection::All => schema.to_vec(),
            Selection::Columns(cols) => cols.clone(),
        };
        let rewritten = base
            .into_iter()
            .map(|entry| match pairs.iter().find(|(_, old)| *old == entry) {
                Some((new, old)) => format!("{old} AS {new}"),
                None => entry,
            })
            .collect();
        self.selection = Selection::Columns(rewritten);
    }

    /// Replace the selection with a grouped-aggregate column list.
    ///
    /// No-op unless a group-by clause is active. With explicit columns the
    /// list is the group columns followed by one aggregate per named column;
    /// with none, the aggregate applies to the group columns themselves and
    /// no prefix is emitted.
    pub fn apply_aggregate(&mut self, agg: Aggregate, columns: &[String]) {
        if !self.is_grouped() {
            return;
        }

        let mut entries: Vec<String> = Vec::new();
        match agg {
            Aggregate::Count => {
                entries.extend(self.group.iter().cloned());
                entries.push("count(*) AS n".to_string());
            }
            Aggregate::Prop => {
                let table = self.table.as_deref().unwrap_or("");
                entries.extend(self.group.iter().cloned());
                entries.push(format!(
                    "1.0 * count(*) / (SELECT count(*) FROM '{table}') AS prop"
                ));
            }
            Aggregate::Range => {
                let targets = if columns.is_empty() {
                    self.group.clone()
                } else {
                    entries.extend(self.group.iter().cloned());
                    columns.to_vec()
                };
                for col in &targets {
                    entries.push(format!("min({col}) AS {col}_min"));
                    entries.push(format!("max({col}) AS {col}_max"));
                }
            }
            _ => {
                let Some((func, suffix)) = agg.function() else {
                    return;
                };
                let targets = if columns.is_empty() {
                    self.group.clone()
                } else {
                    entries.extend(self.group.iter().cloned());
                    columns.to_vec()
                };
                for col in &targets {
                    entries.push(format!("{func}({col}) AS {col}_{suffix}"));
                }
            }
        }
        self.selection = Selection::Columns(entries);
    }
}
