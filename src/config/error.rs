//! Configuration error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Missing required field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

impl ConfigurationError {
    pub fn missing_required_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn file_read_error(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
