//! # tidylite — tidy query building for embedded SQLite
//!
//! > Name a table, chain verbs, collect a frame.
//!
//! tidylite puts a dplyr-flavored fluent layer in front of a SQLite file:
//! select columns with ranges and wildcards, filter, arrange, group,
//! aggregate, and materialize the accumulated query as a tabular [`Frame`].
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use tidylite::prelude::*;
//!
//! let mut db = TidyDb::new();
//! db.connect("~/data/conflicts.sqlite").await?;
//!
//! db.table("events").await?
//!     .select("country, eventid:iday").await?
//!     .filter("year > 2001")?
//!     .arrange("desc(year), country")?;
//!
//! let frame = db.collect().await?;
//! ```
//!
//! ## Verbs
//!
//! | Verb       | Effect                                  |
//! |------------|-----------------------------------------|
//! | `table`    | Target a table                          |
//! | `select`   | Pick columns (`a`, `a:d`, `*`)          |
//! | `rename`   | Alias columns (`new = old`)             |
//! | `filter`   | Keep rows matching a predicate          |
//! | `arrange`  | Order rows (`desc(col)`, `col`)         |
//! | `distinct` | De-duplicate selected rows              |
//! | `group_by` | Group for aggregation                   |
//! | `mean` ... | Grouped aggregates, `count`, `prop`     |
//! | `collect`  | Materialize all rows                    |
//! | `head`     | Materialize a bounded preview           |
//!
//! [`Frame`]: crate::engine::Frame

pub mod ast;
pub mod engine;
pub mod error;
pub mod parser;
pub mod schema;
pub mod session;
pub mod transpiler;

pub mod prelude {
    pub use crate::ast::{Aggregate, OrderKey, QueryState, Selection, SortOrder};
    pub use crate::engine::{Frame, SqliteStore};
    pub use crate::error::{TidyError, TidyResult};
    pub use crate::parser::resolve_selection;
    pub use crate::session::TidyDb;
    pub use crate::transpiler::ToSql;
}

pub use session::TidyDb;
