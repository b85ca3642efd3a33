//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire config, logging, storage, wrappers and the service resolver end
//!   to end against an in-memory database.
//! - Print the resulting records as JSON lines.

use hexagon_core::{
    init_logging_from_config, open_db_in_memory, Column, ColumnType, CoreConfig, CrudOperations,
    CrudService, Data, LogEvents, ModelKind, ModelResult, ModelWrapper, Record, RecordStore,
    Rule, Rules, ServiceContainer, ServiceResolver, SqliteRecordStore, StatusBroadcast,
    StatusDefinition, StatusEvents, StatusWrapper, Updateable, WrapperDefinition,
};
use log::info;
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

static TICKET: ModelKind = ModelKind::new(
    "ticket",
    "tickets",
    &[
        Column::new("title", ColumnType::Text),
        Column::new("status", ColumnType::Text),
    ],
);

struct TicketWrapper;

impl WrapperDefinition for TicketWrapper {
    fn kind(&self) -> &'static ModelKind {
        &TICKET
    }

    fn validation_rules(&self, _record: Option<&Record>) -> Rules {
        Rules::new().field("title", [Rule::Required, Rule::String, Rule::MaxLength(80)])
    }

    fn patchable_fields(&self) -> &[&'static str] {
        &["title"]
    }

    fn set_data(&self, record: &mut Record, data: &Data) -> ModelResult<()> {
        hexagon_core::wrapper::set_optional_field(record, data, "title", None)?;
        if !record.exists() {
            record.set("status", "open")?;
        }
        Ok(())
    }
}

impl StatusDefinition for TicketWrapper {
    fn statuses(&self) -> &[&'static str] {
        &["open", "closed"]
    }

    fn registered_status_broadcasts(&self) -> BTreeMap<&'static str, StatusBroadcast> {
        BTreeMap::from([("closed", StatusBroadcast::new("tickets", "ticket.closed"))])
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    init_logging_from_config(&config)?;

    let conn = open_db_in_memory(&config)?;
    conn.execute_batch(
        "CREATE TABLE tickets (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL, status TEXT);",
    )?;
    let store = SqliteRecordStore::try_new(&conn, &[&TICKET])?;
    let store: &dyn RecordStore = &store;

    let mut container: ServiceContainer<'_, dyn CrudOperations + '_> = ServiceContainer::new();
    container.bind("tickets.crud", move || {
        let service: Arc<dyn CrudOperations + '_> =
            Arc::new(CrudService::new(&TICKET, store, move |record| {
                ModelWrapper::new(store, TicketWrapper, record)
            }));
        service
    });
    let mut resolver = ServiceResolver::new(container);
    resolver.register(&TICKET, "tickets.crud");

    let tickets = resolver.resolve(&TICKET)?;
    let created = tickets.create(&json_data(json!({"title": "Printer jam"})))?;
    let patched = tickets.patch(
        created.clone().into(),
        &json_data(json!({"title": "Printer jam on floor 2", "status": "ignored"})),
    )?;
    println!("{}", serde_json::to_string(&patched)?);

    let events = LogEvents;
    let mut ticket =
        StatusWrapper::new(store, TicketWrapper, patched, StatusEvents::from_sink(&events))?;
    ticket.update_status("closed")?;
    info!(
        "event=cli_demo module=cli status=ok kind={} key={:?}",
        TICKET.name,
        ticket.model().key()
    );
    println!("{ticket}");
    println!("hexagon_core version={}", hexagon_core::core_version());
    Ok(())
}

fn json_data(value: serde_json::Value) -> Data {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Data::new(),
    }
}
