//! Error types for admingrid.

use thiserror::Error;

/// The main error type for datagrid operations.
#[derive(Debug, Error)]
pub enum GridError {
    /// Failed to parse a filter expression.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Invalid admin or filter configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filter type name that no registered constructor handles.
    #[error("Unknown filter type: '{0}'")]
    UnknownFilterType(String),

    /// A filter type was created without one of its required options.
    #[error("Filter '{filter}' requires the '{option}' option")]
    MissingOption {
        filter: String,
        option: &'static str,
    },

    /// A filter points at a field the model does not declare.
    #[error("Field '{field}' is not mapped on model '{class}'")]
    UnmappedField { class: String, field: String },

    /// Two filters registered under the same name.
    #[error("Filter '{0}' is already registered")]
    DuplicateFilter(String),

    /// No model manager mapping for the requested class.
    #[error("Unknown model class: '{0}'")]
    UnknownModel(String),

    /// A filter value that cannot be interpreted.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Session store error.
    #[error("Session error: {0}")]
    Session(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl GridError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a missing option error.
    pub fn missing(filter: impl Into<String>, option: &'static str) -> Self {
        Self::MissingOption {
            filter: filter.into(),
            option,
        }
    }

    /// Create an unmapped field error.
    pub fn unmapped(class: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnmappedField {
            class: class.into(),
            field: field.into(),
        }
    }

    /// Whether this error comes from admin/filter setup rather than execution.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::UnknownFilterType(_)
                | Self::MissingOption { .. }
                | Self::UnmappedField { .. }
                | Self::DuplicateFilter(_)
                | Self::UnknownModel(_)
        )
    }
}

/// Result type alias for datagrid operations.
pub type GridResult<T> = Result<T, GridError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GridError::parse(5, "unexpected character");
        assert_eq!(
            err.to_string(),
            "Parse error at position 5: unexpected character"
        );
    }

    #[test]
    fn test_missing_option_is_configuration() {
        let err = GridError::missing("by_owner", "callback");
        assert_eq!(
            err.to_string(),
            "Filter 'by_owner' requires the 'callback' option"
        );
        assert!(err.is_configuration());
        assert!(!GridError::Execution("boom".into()).is_configuration());
    }
}
