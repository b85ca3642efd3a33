use hexagon_core::{
    Column, ColumnType, ModelKind, ModelSubject, MultipleServices, Record, ResolveError,
    ResolvesMultipleServices, ServiceContainer, ServiceResolver,
};
use std::sync::Arc;

static SHIPMENT: ModelKind = ModelKind::new(
    "shipment",
    "shipments",
    &[Column::new("carrier", ColumnType::Text)],
);

static INVOICE: ModelKind = ModelKind::new(
    "invoice",
    "invoices",
    &[Column::new("total", ColumnType::Real)],
);

trait Named {
    fn name(&self) -> &'static str;
}

struct Service(&'static str);

impl Named for Service {
    fn name(&self) -> &'static str {
        self.0
    }
}

fn named(name: &'static str) -> Arc<dyn Named> {
    Arc::new(Service(name))
}

fn shipment(carrier: &str) -> Record {
    let mut record = Record::new(&SHIPMENT);
    record.set("carrier", carrier).unwrap();
    record
}

/// Picks by carrier; no default.
struct ByCarrier;

impl ResolvesMultipleServices<dyn Named> for ByCarrier {
    fn resolve_service(&self, record: &Record) -> Option<Arc<dyn Named>> {
        match record.get("carrier").and_then(|value| value.as_str()) {
            Some("dhl") => Some(named("dhl-shipments")),
            _ => None,
        }
    }
}

/// Picks by carrier and falls back to a generic service.
struct ByCarrierWithDefault;

impl ResolvesMultipleServices<dyn Named> for ByCarrierWithDefault {
    fn resolve_service(&self, record: &Record) -> Option<Arc<dyn Named>> {
        ByCarrier.resolve_service(record)
    }

    fn default_service(&self, _subject: &ModelSubject) -> Result<Arc<dyn Named>, ResolveError> {
        Ok(named("generic-shipments"))
    }
}

#[test]
fn registered_kind_resolves_to_bound_service() {
    let mut container: ServiceContainer<'_, dyn Named> = ServiceContainer::new();
    container.bind("shipments", || named("shipments"));
    let mut resolver = ServiceResolver::new(container);
    resolver.register(&SHIPMENT, "shipments");

    assert_eq!(resolver.resolve(&SHIPMENT).unwrap().name(), "shipments");
    assert_eq!(
        resolver.resolve(shipment("ups")).unwrap().name(),
        "shipments"
    );
}

#[test]
fn unregistered_kind_fails_binding_resolution() {
    let mut container: ServiceContainer<'_, dyn Named> = ServiceContainer::new();
    container.bind("shipments", || named("shipments"));
    let mut resolver = ServiceResolver::new(container);
    resolver.register(&SHIPMENT, "shipments");

    let err = resolver.resolve(&INVOICE).err().unwrap();
    assert!(matches!(err, ResolveError::BindingResolution(_)));
}

#[test]
fn unbound_identifier_fails_binding_resolution() {
    let container: ServiceContainer<'_, dyn Named> = ServiceContainer::new();
    let mut resolver = ServiceResolver::new(container);
    resolver.register(&INVOICE, "invoices");

    let err = resolver.resolve(&INVOICE).err().unwrap();
    assert_eq!(
        err,
        ResolveError::BindingResolution("identifier is not bound: invoices".to_string())
    );
}

#[test]
fn last_registration_wins() {
    let mut container: ServiceContainer<'_, dyn Named> = ServiceContainer::new();
    container
        .bind("invoices.v1", || named("v1"))
        .bind("invoices.v2", || named("v2"));
    let mut resolver = ServiceResolver::new(container);
    resolver
        .register(&INVOICE, "invoices.v1")
        .register(&INVOICE, "invoices.v2");

    assert_eq!(resolver.service_id("invoice"), Some("invoices.v2"));
    assert_eq!(resolver.resolve(&INVOICE).unwrap().name(), "v2");
}

#[test]
fn multiple_services_pick_by_record_attributes() {
    let mut container: ServiceContainer<'_, dyn Named> = ServiceContainer::new();
    container.bind_multi("shipments", || MultipleServices::new(ByCarrierWithDefault));
    let mut resolver = ServiceResolver::new(container);
    resolver.register(&SHIPMENT, "shipments");

    assert_eq!(
        resolver.resolve(shipment("dhl")).unwrap().name(),
        "dhl-shipments"
    );
    assert_eq!(
        resolver.resolve(shipment("ups")).unwrap().name(),
        "generic-shipments"
    );
    assert_eq!(
        resolver.resolve(&SHIPMENT).unwrap().name(),
        "generic-shipments"
    );
}

#[test]
fn multiple_services_without_default_fail_on_no_match() {
    let mut container: ServiceContainer<'_, dyn Named> = ServiceContainer::new();
    container.bind_multi("shipments", || MultipleServices::new(ByCarrier));
    let mut resolver = ServiceResolver::new(container);
    resolver.register(&SHIPMENT, "shipments");

    let err = resolver.resolve(shipment("ups")).err().unwrap();
    assert!(matches!(err, ResolveError::BindingResolution(_)));

    let err = resolver.resolve(&SHIPMENT).err().unwrap();
    assert!(matches!(err, ResolveError::BindingResolution(_)));
}

#[test]
fn multiple_services_need_a_model() {
    let mut multiple: MultipleServices<'_, dyn Named> =
        MultipleServices::new(|record: &Record| ByCarrier.resolve_service(record));
    assert_eq!(multiple.resolve().err(), Some(ResolveError::UnsetModel));

    multiple.set_model(&shipment("dhl"));
    assert_eq!(multiple.model().map(ModelSubject::kind_name), Some("shipment"));
    assert_eq!(multiple.resolve().unwrap().name(), "dhl-shipments");
}
