use hexagon_core::{
    open_db, open_db_in_memory, Column, ColumnType, CoreConfig, CrudService, Data, ModelError,
    ModelKind, ModelResult, ModelService, ModelWrapper, Record, RecordStore, Rules,
    SqliteRecordStore, SupportsLocking, Target, WrapperDefinition,
};
use rusqlite::Connection;

static CATEGORY: ModelKind = ModelKind::new(
    "category",
    "categories",
    &[
        Column::new("name", ColumnType::Text),
        Column::new("position", ColumnType::Integer),
    ],
);

static PRODUCT: ModelKind = ModelKind::new(
    "product",
    "products",
    &[Column::new("title", ColumnType::Text)],
);

struct CategoryWrapper;

impl WrapperDefinition for CategoryWrapper {
    fn kind(&self) -> &'static ModelKind {
        &CATEGORY
    }

    fn validation_rules(&self, _record: Option<&Record>) -> Rules {
        Rules::new()
    }

    fn set_data(&self, record: &mut Record, data: &Data) -> ModelResult<()> {
        record.fill(data)
    }
}

fn seed(conn: &Connection) {
    conn.execute_batch(
        "CREATE TABLE categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            position INTEGER
        );
        INSERT INTO categories (name, position) VALUES ('books', 1), ('toys', 2);",
    )
    .unwrap();
}

fn categories<'s>(
    store: &'s dyn RecordStore,
) -> CrudService<'s, impl Fn(Record) -> ModelResult<ModelWrapper<'s, CategoryWrapper>> + 's> {
    CrudService::new(&CATEGORY, store, move |record| {
        ModelWrapper::new(store, CategoryWrapper, record)
    })
}

#[test]
fn locked_record_is_returned_without_query() {
    let conn = open_db_in_memory(&CoreConfig::default()).unwrap();
    seed(&conn);
    let store = SqliteRecordStore::new(&conn);
    let service = categories(&store);

    let mut record = service.get(1_i64, true, false).unwrap().unwrap();
    record.set_locked(true);
    let before = store.query_count();

    let same = service.get(record.clone(), true, true).unwrap().unwrap();
    assert_eq!(store.query_count(), before);
    assert!(same.is_locked());
    assert_eq!(same, record);
}

#[test]
fn unlocked_request_passes_record_through() {
    let conn = open_db_in_memory(&CoreConfig::default()).unwrap();
    seed(&conn);
    let store = SqliteRecordStore::new(&conn);
    let service = categories(&store);

    let record = service.get(2_i64, true, false).unwrap().unwrap();
    let before = store.query_count();
    let same = service.get(record.clone(), false, false).unwrap().unwrap();

    assert_eq!(store.query_count(), before);
    assert_eq!(same, record);
}

#[test]
fn unlocked_record_is_refetched_when_lock_requested() {
    let conn = open_db_in_memory(&CoreConfig::default()).unwrap();
    seed(&conn);
    let store = SqliteRecordStore::new(&conn);
    let service = categories(&store);

    let record = service.get(1_i64, true, false).unwrap().unwrap();
    assert!(!record.is_locked());
    let before = store.query_count();

    let locked = service.get_locked(record, true).unwrap().unwrap();
    assert_eq!(store.query_count(), before + 1);
    assert!(locked.is_locked());
}

#[test]
fn missing_key_fails_or_returns_none() {
    let conn = open_db_in_memory(&CoreConfig::default()).unwrap();
    seed(&conn);
    let store = SqliteRecordStore::new(&conn);
    let service = categories(&store);

    let err = service.get(99_i64, true, false).unwrap_err();
    assert!(matches!(
        err,
        ModelError::NotFound {
            kind: "category",
            key: Some(99)
        }
    ));
    assert!(service.get(99_i64, false, false).unwrap().is_none());
}

#[test]
fn missing_identifier_never_queries() {
    let conn = open_db_in_memory(&CoreConfig::default()).unwrap();
    seed(&conn);
    let store = SqliteRecordStore::new(&conn);
    let service = categories(&store);

    assert!(service.get(Target::Missing, false, false).unwrap().is_none());
    assert!(service.get(None::<i64>, false, true).unwrap().is_none());
    let err = service.get(Target::Missing, true, false).unwrap_err();
    assert!(matches!(err, ModelError::NotFound { key: None, .. }));
    assert_eq!(store.query_count(), 0);
}

#[test]
fn lock_flag_is_overwritten_on_every_fetch() {
    let conn = open_db_in_memory(&CoreConfig::default()).unwrap();
    seed(&conn);
    let store = SqliteRecordStore::new(&conn);
    let service = categories(&store);

    let locked = service.get(1_i64, true, true).unwrap().unwrap();
    assert!(locked.is_locked());

    let unlocked = service.get(1_i64, true, false).unwrap().unwrap();
    assert!(!unlocked.is_locked());
}

#[test]
fn record_of_another_kind_is_rejected() {
    let conn = open_db_in_memory(&CoreConfig::default()).unwrap();
    seed(&conn);
    let store = SqliteRecordStore::new(&conn);
    let service = categories(&store);

    let err = service
        .get(Record::new(&PRODUCT), true, false)
        .unwrap_err();
    assert!(matches!(err, ModelError::ContractViolation(_)));
}

#[test]
fn query_lookups_follow_the_same_rules() {
    let conn = open_db_in_memory(&CoreConfig::default()).unwrap();
    seed(&conn);
    let store = SqliteRecordStore::new(&conn);
    let service = categories(&store);

    let toys = service
        .get_from_query(service.get_query().where_eq("name", "toys"), true, false)
        .unwrap()
        .unwrap();
    assert_eq!(toys.key(), Some(2));
    assert!(!toys.is_locked());

    let locked = service
        .get_locked_from_query(service.get_query().where_eq("position", 1), true)
        .unwrap()
        .unwrap();
    assert_eq!(locked.key(), Some(1));
    assert!(locked.is_locked());

    let err = service
        .get_from_query(service.get_query().where_eq("name", "games"), true, false)
        .unwrap_err();
    assert!(matches!(err, ModelError::NotFound { key: None, .. }));
    assert!(service
        .get_from_query(service.get_query().where_eq("name", "games"), false, false)
        .unwrap()
        .is_none());
}

#[test]
fn scoped_service_narrows_key_lookups() {
    let conn = open_db_in_memory(&CoreConfig::default()).unwrap();
    seed(&conn);
    let store = SqliteRecordStore::new(&conn);
    let service = categories(&store).with_scope(|query| query.where_eq("position", 2));

    assert!(service.get(1_i64, false, false).unwrap().is_none());
    assert_eq!(
        service.get(2_i64, true, false).unwrap().unwrap().key(),
        Some(2)
    );
}

#[test]
fn locked_get_blocks_writers_until_transaction_ends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hexagon.db");
    let config = CoreConfig {
        busy_timeout_ms: 0,
        ..CoreConfig::default()
    };
    let conn = open_db(&path, &config).unwrap();
    seed(&conn);
    let writer = open_db(&path, &config).unwrap();

    let tx = conn.unchecked_transaction().unwrap();
    let store = SqliteRecordStore::new(&tx);
    let service = categories(&store);

    let locked = service.get_locked(1_i64, true).unwrap().unwrap();
    assert!(locked.is_locked());

    let blocked = writer.execute("UPDATE categories SET name = 'games' WHERE id = 1;", []);
    assert!(blocked.is_err());

    drop(service);
    drop(store);
    tx.rollback().unwrap();

    let changed = writer
        .execute("UPDATE categories SET name = 'games' WHERE id = 1;", [])
        .unwrap();
    assert_eq!(changed, 1);
}

#[test]
fn lock_request_in_autocommit_does_not_hold_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hexagon.db");
    let config = CoreConfig {
        busy_timeout_ms: 0,
        ..CoreConfig::default()
    };
    let conn = open_db(&path, &config).unwrap();
    seed(&conn);
    let writer = open_db(&path, &config).unwrap();

    let store = SqliteRecordStore::new(&conn);
    let service = categories(&store);
    let locked = service.get_locked(2_i64, true).unwrap().unwrap();
    assert!(locked.is_locked());

    let changed = writer
        .execute("UPDATE categories SET position = 5 WHERE id = 2;", [])
        .unwrap();
    assert_eq!(changed, 1);

    // The flag reflects the request; a flagged record is trusted as is.
    let before = store.query_count();
    let trusted = service.get_locked(locked, true).unwrap().unwrap();
    assert_eq!(store.query_count(), before);
    assert!(trusted.is_locked());
    assert_eq!(trusted.get("position"), Some(&serde_json::json!(2)));
}

#[test]
fn locked_read_does_not_rewrite_rows() {
    let conn = open_db_in_memory(&CoreConfig::default()).unwrap();
    seed(&conn);
    conn.execute_batch(
        "ALTER TABLE categories ADD COLUMN version INTEGER NOT NULL DEFAULT 0;
        CREATE TRIGGER categories_touch AFTER UPDATE ON categories
        BEGIN
            UPDATE categories SET version = version + 1 WHERE id = NEW.id;
        END;",
    )
    .unwrap();

    let tx = conn.unchecked_transaction().unwrap();
    let store = SqliteRecordStore::new(&tx);
    let service = categories(&store);

    let locked = service.get_locked(1_i64, true).unwrap().unwrap();
    assert!(locked.is_locked());
    assert!(!tx.is_autocommit());

    let version: i64 = tx
        .query_row("SELECT version FROM categories WHERE id = 1;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(version, 0);
}
