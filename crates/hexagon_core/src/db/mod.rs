//! SQLite connection bootstrap and schema readiness checks.
//!
//! # Responsibility
//! - Open and configure SQLite connections for record stores.
//! - Verify that a model kind's table and columns exist before use.
//!
//! # Invariants
//! - Schema is owned by the host application; this module only inspects it.
//! - Returned connections carry the configured busy timeout.

use crate::model::ModelKind;
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    MissingTable(&'static str),
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::MissingTable(table) => write!(f, "required table `{table}` does not exist"),
            Self::MissingColumn { table, column } => {
                write!(f, "required column `{table}.{column}` does not exist")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::MissingTable(_) | Self::MissingColumn { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Checks that `kind`'s table exists with its key and every declared column.
pub fn ensure_kind_ready(conn: &Connection, kind: &ModelKind) -> DbResult<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let columns = stmt
        .query_map([kind.table], |row| row.get::<_, String>(0))?
        .collect::<Result<BTreeSet<_>, _>>()?;

    if columns.is_empty() {
        return Err(DbError::MissingTable(kind.table));
    }

    for column in kind.column_names() {
        if !columns.contains(column) {
            return Err(DbError::MissingColumn {
                table: kind.table,
                column,
            });
        }
    }

    Ok(())
}
