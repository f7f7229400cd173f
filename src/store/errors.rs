//! # Store Error Types
//!
//! Failures of the change and stats stores. `Conflict` is a caller error;
//! every other variant is an I/O failure the caller may retry.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Conflict in {table}: id '{id}' already exists")]
    Conflict { table: String, id: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Database query error: {operation}: {message}")]
    Database { operation: String, message: String },

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}

impl StoreError {
    pub fn conflict(table: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Conflict {
            table: table.into(),
            id: id.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn database(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Database {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Whether retrying the same operation later can succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database { .. } | Self::Unavailable { .. })
    }
}

/// Conversion from sqlx::Error to StoreError
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => StoreError::database("database", db_err.to_string()),
            sqlx::Error::PoolTimedOut => StoreError::unavailable("database pool timed out"),
            sqlx::Error::PoolClosed => StoreError::unavailable("database pool is closed"),
            sqlx::Error::Io(io_err) => StoreError::unavailable(io_err.to_string()),
            other => StoreError::database("query", other.to_string()),
        }
    }
}

/// Postgres reports primary-key collisions as SQLSTATE 23505
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(!StoreError::conflict("changes", "c1").is_transient());
        assert!(!StoreError::not_found("change", "c1").is_transient());
        assert!(StoreError::database("insert", "deadlock detected").is_transient());
        assert!(StoreError::unavailable("pool closed").is_transient());
    }

    #[test]
    fn test_sqlx_pool_errors_are_unavailable() {
        let err: StoreError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, StoreError::Unavailable { .. }));

        let err: StoreError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, StoreError::Unavailable { .. }));
    }

    #[test]
    fn test_row_not_found_is_not_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
