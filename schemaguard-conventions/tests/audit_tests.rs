use pretty_assertions::assert_eq;
use schemaguard_conventions::{
    ConventionConfig, ConventionError, ConventionResult, ConventionSet, Diagnostic,
    DiagnosticEvent, Diagnostics, DiagnosticsConfig, ModelBuilder, Severity, TracingDiagnostics,
    report_redundant_indexes,
};
use schemaguard_model::SchemaModel;
use schemaguard_types::{ConfigurationSource, EntityTypeId, KeyId, PropertyId};
use tracing_subscriber::EnvFilter;

const CONVENTION: ConfigurationSource = ConfigurationSource::Convention;
const EXPLICIT: ConfigurationSource = ConfigurationSource::Explicit;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Collects everything, enabled or not.
#[derive(Default)]
struct Collector {
    disabled: Vec<DiagnosticEvent>,
    seen: Vec<Diagnostic>,
}

impl Diagnostics for Collector {
    fn is_enabled(&self, event: DiagnosticEvent) -> bool {
        !self.disabled.contains(&event)
    }

    fn emit(&mut self, diagnostic: Diagnostic) -> ConventionResult<()> {
        self.seen.push(diagnostic);
        Ok(())
    }
}

struct Fixture {
    model: SchemaModel,
    order: EntityTypeId,
    customer_id: PropertyId,
    region: PropertyId,
    customer_key: KeyId,
}

fn fixture() -> Fixture {
    let mut model = SchemaModel::new();
    let customer = model.add_entity_type("Customer").unwrap();
    let id = model.add_property(customer, "Id").unwrap();
    let customer_key = model.add_key(customer, &[id], EXPLICIT).unwrap();
    let order = model.add_entity_type("Order").unwrap();
    let customer_id = model.add_property(order, "CustomerId").unwrap();
    let region = model.add_property(order, "Region").unwrap();
    Fixture {
        model,
        order,
        customer_id,
        region,
        customer_key,
    }
}

// ── Detection ────────────────────────────────────────────────────

#[test]
fn wider_index_is_reported() {
    let Fixture {
        mut model,
        order,
        customer_id,
        region,
        customer_key,
    } = fixture();
    model
        .add_foreign_key(order, &[customer_id], customer_key, false, CONVENTION)
        .unwrap();
    model.add_index(order, &[customer_id, region], EXPLICIT).unwrap();

    let mut collector = Collector::default();
    assert_eq!(report_redundant_indexes(&model, &mut collector).unwrap(), 1);

    let diagnostic = &collector.seen[0];
    assert_eq!(diagnostic.event, DiagnosticEvent::RedundantIndex);
    assert_eq!(diagnostic.entity_type, "Order");
    assert_eq!(diagnostic.details["covered_by"], "index");
    assert_eq!(diagnostic.details["foreign_key"], "{CustomerId}");
    assert_eq!(diagnostic.details["covering_properties"], "{CustomerId, Region}");
}

#[test]
fn wider_key_is_reported() {
    let Fixture {
        mut model,
        order,
        customer_id,
        region,
        customer_key,
    } = fixture();
    model.add_key(order, &[customer_id, region], EXPLICIT).unwrap();
    model
        .add_foreign_key(order, &[customer_id], customer_key, false, CONVENTION)
        .unwrap();

    let mut collector = Collector::default();
    assert_eq!(report_redundant_indexes(&model, &mut collector).unwrap(), 1);
    assert_eq!(collector.seen[0].details["covered_by"], "key");
}

#[test]
fn exact_index_is_not_redundant() {
    let Fixture {
        mut model,
        order,
        customer_id,
        customer_key,
        ..
    } = fixture();
    model
        .add_foreign_key(order, &[customer_id], customer_key, false, CONVENTION)
        .unwrap();
    model.add_index(order, &[customer_id], CONVENTION).unwrap();

    let mut collector = Collector::default();
    assert_eq!(report_redundant_indexes(&model, &mut collector).unwrap(), 0);
}

#[test]
fn unique_foreign_key_is_not_covered_by_wider_key() {
    let Fixture {
        mut model,
        order,
        customer_id,
        region,
        customer_key,
    } = fixture();
    model.add_key(order, &[customer_id, region], EXPLICIT).unwrap();
    model
        .add_foreign_key(order, &[customer_id], customer_key, true, CONVENTION)
        .unwrap();

    let mut collector = Collector::default();
    assert_eq!(report_redundant_indexes(&model, &mut collector).unwrap(), 0);
}

#[test]
fn inherited_key_is_reported_against_derived_type() {
    let Fixture {
        mut model,
        order,
        customer_id,
        region,
        customer_key,
    } = fixture();
    let special = model.add_entity_type("SpecialOrder").unwrap();
    model.set_base_type(special, Some(order)).unwrap();
    model.add_key(order, &[customer_id, region], EXPLICIT).unwrap();
    model
        .add_foreign_key(special, &[customer_id], customer_key, false, CONVENTION)
        .unwrap();

    let mut collector = Collector::default();
    assert_eq!(report_redundant_indexes(&model, &mut collector).unwrap(), 1);
    assert_eq!(collector.seen[0].entity_type, "SpecialOrder");
}

#[test]
fn disabled_channel_skips_the_audit() {
    let Fixture {
        mut model,
        order,
        customer_id,
        region,
        customer_key,
    } = fixture();
    model
        .add_foreign_key(order, &[customer_id], customer_key, false, CONVENTION)
        .unwrap();
    model.add_index(order, &[customer_id, region], EXPLICIT).unwrap();

    let mut collector = Collector {
        disabled: vec![DiagnosticEvent::RedundantIndex],
        ..Default::default()
    };
    assert_eq!(report_redundant_indexes(&model, &mut collector).unwrap(), 0);
    assert!(collector.seen.is_empty());
}

// ── Severity through the builder ─────────────────────────────────

fn redundant_builder(config: ConventionConfig) -> ModelBuilder {
    let mut builder = ModelBuilder::with_config(config);
    let customer = builder.add_entity_type("Customer").unwrap();
    let id = builder.add_property(customer, "Id").unwrap();
    let key = builder.add_key(customer, &[id], EXPLICIT).unwrap();
    let order = builder.add_entity_type("Order").unwrap();
    let customer_id = builder.add_property(order, "CustomerId").unwrap();
    let region = builder.add_property(order, "Region").unwrap();
    builder.add_index(order, &[customer_id, region], EXPLICIT).unwrap();
    builder
        .add_foreign_key(order, &[customer_id], key, false, CONVENTION)
        .unwrap();
    builder
}

#[test]
fn default_severity_logs_and_keeps_going() {
    init_tracing();
    let mut builder = redundant_builder(ConventionConfig::default());
    builder.finalize().unwrap();

    let emitted = builder.diagnostics().emitted();
    assert_eq!(emitted.len(), 1);
    assert!(emitted[0].message.contains("{CustomerId, Region}"));
}

#[test]
fn ignored_severity_emits_nothing() {
    let config = ConventionConfig {
        diagnostics: DiagnosticsConfig::default()
            .with_severity(DiagnosticEvent::RedundantIndex, Severity::Ignore),
        ..Default::default()
    };
    let mut builder = redundant_builder(config);
    builder.finalize().unwrap();
    assert!(builder.diagnostics().emitted().is_empty());
}

#[test]
fn throw_severity_fails_finalization() {
    init_tracing();
    let config = ConventionConfig {
        diagnostics: DiagnosticsConfig::default()
            .with_severity(DiagnosticEvent::RedundantIndex, Severity::Throw),
        ..Default::default()
    };
    let mut builder = redundant_builder(config);

    match builder.finalize() {
        Err(ConventionError::DiagnosticRaised { event, message }) => {
            assert_eq!(event, DiagnosticEvent::RedundantIndex);
            assert!(message.contains("'Order'"));
        }
        other => panic!("expected a raised diagnostic, got {other:?}"),
    }
}

#[test]
fn custom_sink_receives_findings() {
    let mut builder = ModelBuilder::with_parts(
        ConventionSet::default(),
        Collector::default(),
        ConventionConfig::default(),
    );
    let customer = builder.add_entity_type("Customer").unwrap();
    let id = builder.add_property(customer, "Id").unwrap();
    let code = builder.add_property(customer, "Code").unwrap();
    builder.add_key(customer, &[id], EXPLICIT).unwrap();
    let composite = builder.add_key(customer, &[code, id], EXPLICIT).unwrap();

    // Customer {Code, Id} covers a self-referencing foreign key over {Code}.
    let single = builder.add_key(customer, &[code], EXPLICIT).unwrap();
    builder
        .add_foreign_key(customer, &[code], single, false, CONVENTION)
        .unwrap();
    builder.finalize().unwrap();

    let seen = &builder.diagnostics().seen;
    assert_eq!(seen.len(), 1);
    assert!(builder.model().key(composite).is_some());
}

#[test]
fn tracing_sink_reports_channel_state() {
    let sink = TracingDiagnostics::new(
        DiagnosticsConfig::default().with_severity(DiagnosticEvent::RedundantIndex, Severity::Ignore),
    );
    assert!(!sink.is_enabled(DiagnosticEvent::RedundantIndex));
    assert!(TracingDiagnostics::default().is_enabled(DiagnosticEvent::RedundantIndex));
}
