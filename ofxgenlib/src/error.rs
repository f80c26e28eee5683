//! Единый тип ошибок публичного API.

use crate::schema::SchemaViolation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OfxGenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaViolation),

    #[error("Row {line}: {source}")]
    Row {
        line: usize,
        #[source]
        source: RowError,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
}

/// Ошибка разбора одной строки выписки.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("bad trade time {value:?}: {reason}")]
    TradeTime { value: String, reason: String },

    #[error("bad settlement date {value:?}: {reason}")]
    SettlementDate { value: String, reason: String },

    #[error("bad number in {column}: {value:?}")]
    Number { column: &'static str, value: String },

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("unknown security {0:?}")]
    UnknownSecurity(String),
}

pub type Result<T> = std::result::Result<T, OfxGenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_error_names_the_line() {
        let err = OfxGenError::Row {
            line: 7,
            source: RowError::UnknownSecurity("MSFT".into()),
        };
        assert_eq!(err.to_string(), "Row 7: unknown security \"MSFT\"");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: OfxGenError = io.into();
        assert!(err.to_string().starts_with("I/O error"));
    }
}
