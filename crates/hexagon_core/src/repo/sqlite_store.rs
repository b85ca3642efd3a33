//! Record store contract and SQLite implementation.
//!
//! # Responsibility
//! - Map `Query`/`Record` values onto SQL for any declared `ModelKind`.
//! - Keep column typing rules in one place.
//!
//! # Invariants
//! - Only declared identifiers reach SQL text; values are always bound.
//! - Lock-for-update inside a transaction takes the database write lock
//!   before reading, so it is held until that transaction ends. It never
//!   rewrites rows.
//! - In autocommit mode there is no unit of work to hold a lock for; the
//!   modifier is ignored.

use crate::db::{ensure_kind_ready, DbError};
use crate::model::{ColumnType, Data, ModelKind, Record, RecordKey};
use crate::repo::query::Query;
use crate::repo::{ModelError, ModelResult};
use log::{debug, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Row};
use serde_json::{Number, Value};
use std::cell::Cell;

/// Persistent store interface the wrappers and services depend on.
pub trait RecordStore {
    /// First row matching `query` in key order, honoring its lock modifier.
    fn first(&self, query: &Query) -> ModelResult<Option<Record>>;

    /// Inserts a new record or writes the dirty attributes of an existing one.
    ///
    /// Returns `false` when the backing row no longer exists.
    fn save(&self, record: &mut Record) -> ModelResult<bool>;

    /// Deletes the backing row. Returns `false` when nothing was deleted.
    fn delete(&self, record: &mut Record) -> ModelResult<bool>;
}

/// SQLite-backed record store.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
    selects: Cell<usize>,
}

impl<'conn> SqliteRecordStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            selects: Cell::new(0),
        }
    }

    /// Constructs a store after checking every served kind's schema.
    pub fn try_new(conn: &'conn Connection, kinds: &[&ModelKind]) -> ModelResult<Self> {
        for kind in kinds {
            ensure_kind_ready(conn, kind)?;
        }
        Ok(Self::new(conn))
    }

    /// Number of `SELECT` statements issued so far.
    pub fn query_count(&self) -> usize {
        self.selects.get()
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Takes the database write lock for the enclosing transaction.
    ///
    /// The statement matches no rows, so no row is rewritten and no update
    /// trigger fires; SQLite still opens the write transaction first.
    fn acquire_write_lock(&self, kind: &ModelKind) -> ModelResult<()> {
        if self.conn.is_autocommit() {
            debug!(
                "event=lock_for_update module=repo status=skipped kind={} reason=autocommit lock_flag=unbacked",
                kind.name
            );
            return Ok(());
        }

        self.conn.execute(
            &format!(
                "UPDATE \"{table}\" SET \"{key}\" = \"{key}\" WHERE 0;",
                table = kind.table,
                key = kind.primary_key
            ),
            [],
        )?;
        debug!(
            "event=lock_for_update module=repo status=ok kind={}",
            kind.name
        );
        Ok(())
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn first(&self, query: &Query) -> ModelResult<Option<Record>> {
        let kind = query.kind();
        let (where_sql, binds) = render_filters(query)?;

        if query.is_lock_for_update() {
            self.acquire_write_lock(kind)?;
        }

        let columns = kind
            .column_names()
            .map(|column| format!("\"{column}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {columns} FROM \"{table}\"{where_sql} ORDER BY \"{key}\" ASC LIMIT 1;",
            table = kind.table,
            key = kind.primary_key
        );

        self.selects.set(self.selects.get() + 1);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds.iter()))?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_record_row(kind, row)?)),
            None => Ok(None),
        }
    }

    fn save(&self, record: &mut Record) -> ModelResult<bool> {
        let kind = record.kind();

        if !record.exists() {
            let mut columns = Vec::new();
            let mut binds = Vec::new();
            for (field, value) in record.attributes() {
                columns.push(format!("\"{field}\""));
                binds.push(to_sql_value(kind, field, value)?);
            }

            let sql = if columns.is_empty() {
                format!("INSERT INTO \"{}\" DEFAULT VALUES;", kind.table)
            } else {
                format!(
                    "INSERT INTO \"{}\" ({}) VALUES ({});",
                    kind.table,
                    columns.join(", "),
                    vec!["?"; binds.len()].join(", ")
                )
            };
            self.conn.execute(&sql, params_from_iter(binds.iter()))?;

            let key = record.key().unwrap_or_else(|| self.conn.last_insert_rowid());
            record.mark_persisted(key);
            debug!(
                "event=record_insert module=repo status=ok kind={} key={}",
                kind.name, key
            );
            return Ok(true);
        }

        let dirty: Vec<String> = record
            .dirty_fields()
            .into_iter()
            .map(str::to_string)
            .collect();
        let key = persisted_key(record)?;
        if dirty.is_empty() {
            return Ok(true);
        }

        let mut assignments = Vec::with_capacity(dirty.len());
        let mut binds = Vec::with_capacity(dirty.len() + 1);
        for field in &dirty {
            assignments.push(format!("\"{field}\" = ?"));
            binds.push(to_sql_value(
                kind,
                field,
                record.get(field).unwrap_or(&Value::Null),
            )?);
        }
        binds.push(SqlValue::Integer(key));

        let changed = self.conn.execute(
            &format!(
                "UPDATE \"{}\" SET {} WHERE \"{}\" = ?;",
                kind.table,
                assignments.join(", "),
                kind.primary_key
            ),
            params_from_iter(binds.iter()),
        )?;

        if changed == 0 {
            warn!(
                "event=record_update module=repo status=missing kind={} key={}",
                kind.name, key
            );
            return Ok(false);
        }

        let current_key = record.key().unwrap_or(key);
        record.mark_persisted(current_key);
        debug!(
            "event=record_update module=repo status=ok kind={} key={} fields={}",
            kind.name,
            current_key,
            dirty.join(",")
        );
        Ok(true)
    }

    fn delete(&self, record: &mut Record) -> ModelResult<bool> {
        if !record.exists() {
            return Ok(false);
        }

        let kind = record.kind();
        let key = persisted_key(record)?;
        let changed = self.conn.execute(
            &format!(
                "DELETE FROM \"{}\" WHERE \"{}\" = ?1;",
                kind.table, kind.primary_key
            ),
            [key],
        )?;
        record.mark_deleted();

        debug!(
            "event=record_delete module=repo status=ok kind={} key={} deleted={}",
            kind.name,
            key,
            changed > 0
        );
        Ok(changed > 0)
    }
}

fn persisted_key(record: &Record) -> ModelResult<RecordKey> {
    let kind = record.kind();
    record
        .original(kind.primary_key)
        .and_then(Value::as_i64)
        .ok_or_else(|| {
            ModelError::InvalidData(format!(
                "persisted {} has no `{}` value",
                kind.name, kind.primary_key
            ))
        })
}

fn render_filters(query: &Query) -> ModelResult<(String, Vec<SqlValue>)> {
    let kind = query.kind();
    let mut clauses = Vec::new();
    let mut binds = Vec::new();

    for filter in query.filters() {
        if !kind.is_assignable(&filter.column) {
            return Err(ModelError::UnknownField {
                kind: kind.name,
                field: filter.column.clone(),
            });
        }

        if filter.value.is_null() {
            clauses.push(format!("\"{}\" IS NULL", filter.column));
        } else {
            clauses.push(format!("\"{}\" = ?", filter.column));
            binds.push(to_sql_value(kind, &filter.column, &filter.value)?);
        }
    }

    if clauses.is_empty() {
        return Ok((String::new(), binds));
    }
    Ok((format!(" WHERE {}", clauses.join(" AND ")), binds))
}

fn column_type(kind: &ModelKind, column: &str) -> ModelResult<ColumnType> {
    if column == kind.primary_key {
        return Ok(ColumnType::Integer);
    }
    kind.column(column)
        .map(|declared| declared.ty)
        .ok_or_else(|| ModelError::UnknownField {
            kind: kind.name,
            field: column.to_string(),
        })
}

fn to_sql_value(kind: &ModelKind, column: &str, value: &Value) -> ModelResult<SqlValue> {
    let ty = column_type(kind, column)?;

    let converted = match (ty, value) {
        (_, Value::Null) => Some(SqlValue::Null),
        (ColumnType::Integer, Value::Bool(flag)) => Some(SqlValue::Integer(i64::from(*flag))),
        (ColumnType::Integer, other) => other.as_i64().map(SqlValue::Integer),
        (ColumnType::Real, other) => other.as_f64().map(SqlValue::Real),
        (ColumnType::Text, Value::String(text)) => Some(SqlValue::Text(text.clone())),
        (ColumnType::Text, _) => None,
        (ColumnType::Boolean, Value::Bool(flag)) => Some(SqlValue::Integer(i64::from(*flag))),
        (ColumnType::Boolean, other) => match other.as_i64() {
            Some(flag @ (0 | 1)) => Some(SqlValue::Integer(flag)),
            _ => None,
        },
        (ColumnType::Json, other) => Some(SqlValue::Text(other.to_string())),
    };

    converted.ok_or_else(|| {
        ModelError::InvalidData(format!(
            "value `{value}` does not fit {}.{column} ({ty:?})",
            kind.name
        ))
    })
}

fn from_sql_value(kind: &ModelKind, column: &str, raw: SqlValue) -> ModelResult<Value> {
    let ty = column_type(kind, column)?;
    let invalid = |found: &str| {
        ModelError::InvalidData(format!(
            "invalid {found} value in {}.{column} ({ty:?})",
            kind.table
        ))
    };

    match (ty, raw) {
        (_, SqlValue::Null) => Ok(Value::Null),
        (ColumnType::Integer, SqlValue::Integer(number)) => Ok(Value::from(number)),
        (ColumnType::Real, SqlValue::Real(number)) => {
            Ok(Number::from_f64(number).map_or(Value::Null, Value::Number))
        }
        (ColumnType::Real, SqlValue::Integer(number)) => Ok(Value::from(number as f64)),
        (ColumnType::Text, SqlValue::Text(text)) => Ok(Value::String(text)),
        (ColumnType::Boolean, SqlValue::Integer(0)) => Ok(Value::Bool(false)),
        (ColumnType::Boolean, SqlValue::Integer(1)) => Ok(Value::Bool(true)),
        (ColumnType::Json, SqlValue::Text(text)) => {
            serde_json::from_str(&text).map_err(|_| invalid("json"))
        }
        (_, SqlValue::Integer(_)) => Err(invalid("integer")),
        (_, SqlValue::Real(_)) => Err(invalid("real")),
        (_, SqlValue::Text(_)) => Err(invalid("text")),
        (_, SqlValue::Blob(_)) => Err(invalid("blob")),
    }
}

fn parse_record_row(kind: &'static ModelKind, row: &Row<'_>) -> ModelResult<Record> {
    let mut attributes = Data::new();
    for (index, column) in kind.column_names().enumerate() {
        let raw: SqlValue = row.get(index).map_err(DbError::from)?;
        attributes.insert(column.to_string(), from_sql_value(kind, column, raw)?);
    }
    Ok(Record::from_storage(kind, attributes))
}
