//! Infrastructure error model.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` by [`map_sqlx_error`]:
//!
//! | SQLx Error | SQLite condition | StoreError |
//! |------------|------------------|------------|
//! | Database (foreign key / unique / check / not null) | `SQLITE_CONSTRAINT_*` | `Constraint` |
//! | Database (busy) | `SQLITE_BUSY*` | `Busy` |
//! | Database (other) | any other | `Database` |
//! | PoolClosed / PoolTimedOut | N/A | `Unavailable` |
//! | Other | N/A | `Database` |
//!
//! `CommandError` is what store and checkout operations return to callers: a
//! tagged result that tells "nothing happened" failures apart by kind.

use sqlx::error::ErrorKind;
use thiserror::Error;

use shoplab_core::DomainError;

/// Which constraint a write tripped over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    ForeignKey,
    Unique,
    Check,
    NotNull,
}

/// Storage failure (SQLite via sqlx).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("constraint violated in {operation}: {message}")]
    Constraint {
        operation: &'static str,
        kind: ConstraintKind,
        message: String,
    },

    #[error("database busy in {operation}: {message}")]
    Busy {
        operation: &'static str,
        message: String,
    },

    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    #[error("database unavailable in {operation}: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },

    /// A stored row could not be turned back into a domain value.
    #[error("corrupt row in {operation}: {message}")]
    Decode {
        operation: &'static str,
        message: String,
    },

    #[error("failed to open database: {0}")]
    Open(String),
}

impl StoreError {
    pub fn decode(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            operation,
            message: message.into(),
        }
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(
            self,
            StoreError::Constraint {
                kind: ConstraintKind::ForeignKey,
                ..
            }
        )
    }
}

/// Map a sqlx error to a `StoreError`, tagging it with the failed operation.
pub fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();

            let constraint = match db_err.kind() {
                ErrorKind::ForeignKeyViolation => Some(ConstraintKind::ForeignKey),
                ErrorKind::UniqueViolation => Some(ConstraintKind::Unique),
                ErrorKind::CheckViolation => Some(ConstraintKind::Check),
                ErrorKind::NotNullViolation => Some(ConstraintKind::NotNull),
                _ => None,
            };
            if let Some(kind) = constraint {
                return StoreError::Constraint {
                    operation,
                    kind,
                    message,
                };
            }

            // Extended result codes keep the primary code in the low byte.
            let busy = db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .is_some_and(|code| code & 0xff == SQLITE_BUSY);
            if busy {
                StoreError::Busy { operation, message }
            } else {
                StoreError::Database { operation, message }
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => StoreError::Unavailable {
            operation,
            message: err.to_string(),
        },
        other => StoreError::Database {
            operation,
            message: other.to_string(),
        },
    }
}

const SQLITE_BUSY: i32 = 5;

/// Outcome of a failed command. Every variant means no write took effect.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Input failed domain validation.
    #[error("{0}")]
    Validation(String),

    /// An identifier could not be parsed.
    #[error("{0}")]
    InvalidId(String),

    /// A referenced resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The command cannot be applied to the current state.
    #[error("{0}")]
    Conflict(String),

    /// A domain invariant would have been broken.
    #[error("{0}")]
    InvariantViolation(String),

    /// Storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CommandError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

impl From<DomainError> for CommandError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => CommandError::Validation(msg),
            DomainError::InvariantViolation(msg) => CommandError::InvariantViolation(msg),
            DomainError::InvalidId(msg) => CommandError::InvalidId(msg),
            DomainError::NotFound(msg) => CommandError::NotFound(msg),
            DomainError::Conflict(msg) => CommandError::Conflict(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_keep_their_kind() {
        assert!(matches!(
            CommandError::from(DomainError::validation("qty must be >= 1")),
            CommandError::Validation(msg) if msg == "qty must be >= 1"
        ));
        assert!(matches!(
            CommandError::from(DomainError::conflict("cart is empty")),
            CommandError::Conflict(msg) if msg == "cart is empty"
        ));
        assert!(matches!(
            CommandError::from(DomainError::not_found("product not found")),
            CommandError::NotFound(_)
        ));
    }

    #[test]
    fn pool_closed_is_unavailable() {
        let err = map_sqlx_error("list_products", sqlx::Error::PoolClosed);
        assert!(matches!(err, StoreError::Unavailable { operation: "list_products", .. }));
        assert!(!err.is_foreign_key_violation());
    }

    #[test]
    fn row_not_found_is_generic_database_error() {
        let err = map_sqlx_error("get_order", sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database { operation: "get_order", .. }));
    }
}
