//! Error taxonomy for record access and mutation.

use crate::db::DbError;
use crate::model::RecordKey;
use crate::validation::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by stores, wrappers and record services.
#[derive(Debug)]
pub enum ModelError {
    /// No row matched and the caller asked to fail on missing.
    NotFound {
        kind: &'static str,
        key: Option<RecordKey>,
    },
    /// Input violated the wrapper's declared rules.
    Validation(ValidationError),
    /// Store transport or schema failure.
    Db(DbError),
    /// Persisted or supplied value cannot be mapped to its column.
    InvalidData(String),
    UnknownField {
        kind: &'static str,
        field: String,
    },
    UnknownStatus {
        kind: &'static str,
        status: String,
    },
    IllegalTransition {
        kind: &'static str,
        from: Option<String>,
        to: String,
    },
    /// Programmer error, e.g. rebinding a wrapper to another kind.
    ContractViolation(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound {
                kind,
                key: Some(key),
            } => write!(f, "{kind} not found: {key}"),
            Self::NotFound { kind, key: None } => write!(f, "{kind} not found"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid record data: {message}"),
            Self::UnknownField { kind, field } => {
                write!(f, "field `{field}` is not declared on {kind}")
            }
            Self::UnknownStatus { kind, status } => {
                write!(f, "status `{status}` is not declared on {kind}")
            }
            Self::IllegalTransition { kind, from, to } => write!(
                f,
                "{kind} cannot move from status `{}` to `{to}`",
                from.as_deref().unwrap_or("<none>")
            ),
            Self::ContractViolation(message) => write!(f, "contract violation: {message}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ModelError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for ModelError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for ModelError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
