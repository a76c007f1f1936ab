//! Error types for tidylite.

use thiserror::Error;

/// The main error type for tidylite operations.
#[derive(Debug, Error)]
pub enum TidyError {
    /// No database connection established.
    #[error("no database connection established")]
    NotConnected,

    /// Table selection named a table the store does not have.
    #[error("table '{0}' not in available tables")]
    UnknownTable(String),

    /// Auto-selection found nothing to target.
    #[error("connected database contains no tables")]
    NoTables,

    /// Column discovery failed for a table.
    #[error("could not read schema for table '{table}': {message}")]
    SchemaUnavailable { table: String, message: String },

    /// The store could not be opened.
    #[error("connection error: {0}")]
    Connection(String),

    /// The engine rejected a statement.
    #[error("execution error: {0}")]
    Execution(String),
}

impl TidyError {
    /// Create a schema-discovery error for the given table.
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaUnavailable {
            table: table.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for tidylite operations.
pub type TidyResult<T> = Result<T, TidyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TidyError::schema("events", "no such table");
        assert_eq!(
            err.to_string(),
            "could not read schema for table 'events': no such table"
        );
    }

    #[test]
    fn test_unknown_table_display() {
        let err = TidyError::UnknownTable("evnts".to_string());
        assert_eq!(err.to_string(), "table 'evnts' not in available tables");
    }
}
