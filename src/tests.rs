use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;

struct Dependency;

impl Dependency {
    fn new() -> Self {
        Dependency
    }
}

struct Consumer {
    dep: Arc<Dependency>,
    count: i64,
}

impl Consumer {
    fn new(dep: Arc<Dependency>, count: i64) -> Self {
        Self { dep, count }
    }
}

struct Labelled {
    label: String,
}

impl Labelled {
    fn new(label: String) -> Self {
        Self { label }
    }
}

// The schemas below declare these two as mutually dependent. Alpha really
// holds its Beta; Beta's constructor only demands an Alpha.
struct Alpha {
    beta: Arc<Beta>,
}

impl Alpha {
    fn new(beta: Arc<Beta>) -> Self {
        Self { beta }
    }
}

struct Beta;

impl Beta {
    fn new(_alpha: Arc<Alpha>) -> Self {
        Beta
    }
}

struct Outer;

impl Outer {
    fn new(_dep: Arc<Labelled>, _count: i64) -> Self {
        Outer
    }
}

fn demo_schemas() -> SchemaIntrospector {
    let mut schemas = SchemaIntrospector::new();
    schema!(schemas, "tests.Dependency", Dependency::new);
    schema!(schemas, "tests.Consumer", Consumer::new,
        dep: shared Dependency => "tests.Dependency",
        count: i64 = 5,
    );
    schema!(schemas, "tests.Labelled", Labelled::new, label: String);
    schema!(schemas, "tests.Alpha", Alpha::new, beta: shared Beta => "tests.Beta");
    schema!(schemas, "tests.Beta", Beta::new, alpha: shared Alpha => "tests.Alpha");
    schemas
}

fn demo_registry() -> Registry {
    Registry::with_introspector(Arc::new(demo_schemas()))
}

#[test]
fn missing_identifier_is_not_found() {
    let mut registry = Registry::new();
    assert!(!registry.has("ghost"));
    assert!(matches!(
        registry.get("ghost"),
        Err(RegistryError::NotFound(id)) if id == "ghost"
    ));
}

#[test]
fn set_then_get_returns_the_stored_value() -> Result<(), RegistryError> {
    let mut registry = Registry::new();
    registry.set("x", Arc::new(41i64), false)?;
    assert!(registry.has("x"));
    assert_eq!(downcast::<i64>(registry.get("x")?).map(|v| *v), Some(41));
    Ok(())
}

#[test]
fn duplicate_set_fails_and_keeps_the_original() -> Result<(), RegistryError> {
    let mut registry = Registry::new();
    registry.set("x", Arc::new(1i64), false)?;
    assert!(matches!(
        registry.set("x", Arc::new(2i64), false),
        Err(RegistryError::AlreadyExists(id)) if id == "x"
    ));
    assert_eq!(downcast::<i64>(registry.get("x")?).map(|v| *v), Some(1));
    Ok(())
}

#[test]
fn overwrite_replaces_the_stored_value() -> Result<(), RegistryError> {
    let mut registry = Registry::new();
    registry.set("x", Arc::new(1i64), false)?;
    registry.set("x", Arc::new(2i64), true)?;
    assert_eq!(downcast::<i64>(registry.get("x")?).map(|v| *v), Some(2));
    Ok(())
}

#[test]
fn unit_is_an_ordinary_value() -> Result<(), RegistryError> {
    let mut registry = Registry::new();
    registry.set("nothing", Arc::new(()), false)?;
    assert!(downcast::<()>(registry.get("nothing")?).is_some());
    Ok(())
}

#[test]
fn factory_runs_exactly_once() -> Result<(), RegistryError> {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();

    let mut registry = Registry::new();
    registry.set_factory(
        "service",
        move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Dependency::new()) as Instance)
        },
        false,
    )?;

    let first = downcast::<Dependency>(registry.get("service")?).unwrap();
    for _ in 0..10 {
        let again = downcast::<Dependency>(registry.get("service")?).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn factory_receives_the_registry() -> Result<(), RegistryError> {
    let mut registry = Registry::new();
    registry.set("prefix", Arc::new(String::from("svc-")), false)?;
    registry.set_factory(
        "service",
        |registry| {
            let prefix = downcast::<String>(registry.get("prefix")?).unwrap();
            Ok(Arc::new(Labelled::new(format!("{prefix}a"))) as Instance)
        },
        false,
    )?;

    let labelled = downcast::<Labelled>(registry.get("service")?).unwrap();
    assert_eq!(labelled.label, "svc-a");
    Ok(())
}

#[test]
fn failing_factory_stays_pending_and_can_retry() -> Result<(), RegistryError> {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();

    let mut registry = Registry::new();
    registry.set_factory(
        "service",
        move |registry| {
            seen.fetch_add(1, Ordering::SeqCst);
            // Depends on an entry that appears only later.
            let _ = registry.get("late")?;
            Ok(Arc::new(Dependency::new()) as Instance)
        },
        false,
    )?;

    assert!(matches!(
        registry.get("service"),
        Err(RegistryError::NotFound(id)) if id == "late"
    ));

    registry.set("late", Arc::new(()), false)?;
    registry.get("service")?;
    registry.get("service")?;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn alias_resolves_to_the_target_entry() -> Result<(), RegistryError> {
    let mut registry = Registry::new();
    registry.set("x", Arc::new(Dependency::new()), false)?;
    registry.set_alias("a", "x", false)?;

    let via_alias = downcast::<Dependency>(registry.get("a")?).unwrap();
    let direct = downcast::<Dependency>(registry.get("x")?).unwrap();
    assert!(Arc::ptr_eq(&via_alias, &direct));

    registry.remove_alias("a");
    assert!(matches!(registry.get("a"), Err(RegistryError::NotFound(_))));
    assert!(registry.has("x"));
    Ok(())
}

#[test]
fn alias_chains_are_followed() -> Result<(), RegistryError> {
    let mut registry = Registry::new();
    registry.set("x", Arc::new(7i64), false)?;
    registry.set_alias("b", "x", false)?;
    registry.set_alias("a", "b", false)?;
    assert_eq!(downcast::<i64>(registry.get("a")?).map(|v| *v), Some(7));
    Ok(())
}

#[test]
fn alias_cycles_are_detected() -> Result<(), RegistryError> {
    let mut registry = Registry::new();
    registry.set_alias("a", "b", false)?;
    registry.set_alias("b", "a", false)?;
    assert!(matches!(registry.get("a"), Err(RegistryError::Cycle(_))));
    Ok(())
}

#[test]
fn dead_end_alias_falls_back_to_the_direct_entry() -> Result<(), RegistryError> {
    let mut registry = Registry::new();
    registry.set("x", Arc::new(3i64), false)?;
    // Same identifier in both namespaces, alias pointing nowhere useful.
    registry.set_alias("x", "missing", false)?;
    assert_eq!(downcast::<i64>(registry.get("x")?).map(|v| *v), Some(3));
    Ok(())
}

#[test]
fn duplicate_alias_fails_without_overwrite() -> Result<(), RegistryError> {
    let mut registry = Registry::new();
    registry.set_alias("a", "x", false)?;
    assert!(matches!(
        registry.set_alias("a", "y", false),
        Err(RegistryError::AlreadyExists(id)) if id == "a"
    ));
    registry.set_alias("a", "y", true)?;
    registry.set("y", Arc::new(9i64), false)?;
    assert_eq!(downcast::<i64>(registry.get("a")?).map(|v| *v), Some(9));
    Ok(())
}

#[test]
fn remove_is_a_no_op_on_absent_identifiers() -> Result<(), RegistryError> {
    let mut registry = Registry::new();
    registry.set("x", Arc::new(1i64), false)?;
    registry.remove("x");
    assert!(matches!(registry.get("x"), Err(RegistryError::NotFound(_))));
    registry.remove("x");
    registry.remove_alias("never-set");
    Ok(())
}

#[test]
fn listings_reflect_registrations() -> Result<(), RegistryError> {
    let mut registry = Registry::new();
    registry.set("x", Arc::new(1i64), false)?;
    registry.set("y", Arc::new(2i64), false)?;
    registry.set_alias("a", "x", false)?;

    let mut entries = registry.entries();
    entries.sort_unstable();
    assert_eq!(entries, vec!["x", "y"]);
    assert!(registry.has_alias("a"));
    assert_eq!(registry.aliases(), vec!["a"]);

    registry.remove("y");
    assert_eq!(registry.entries(), vec!["x"]);
    Ok(())
}

#[test]
fn no_argument_constructors_yield_fresh_instances() -> Result<(), RegistryError> {
    let mut registry = demo_registry();
    let first = downcast::<Dependency>(registry.resolve("tests.Dependency")?).unwrap();
    let second = downcast::<Dependency>(registry.resolve("tests.Dependency")?).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    Ok(())
}

#[test]
fn resolution_recurses_and_fills_defaults() -> Result<(), RegistryError> {
    let mut registry = demo_registry();
    let consumer = downcast::<Consumer>(registry.resolve("tests.Consumer")?).unwrap();
    assert_eq!(consumer.count, 5);
    Ok(())
}

#[test]
fn overrides_beat_defaults() -> Result<(), RegistryError> {
    let mut registry = demo_registry();
    let overrides = Overrides::new().with("count", 7i64);
    let consumer =
        downcast::<Consumer>(registry.resolve_with("tests.Consumer", &overrides)?).unwrap();
    assert_eq!(consumer.count, 7);
    Ok(())
}

#[test]
fn required_plain_parameters_fail_without_override() {
    let mut registry = demo_registry();
    let err = registry.resolve("tests.Labelled").unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Unresolved { target, parameter, .. }
            if target == "tests.Labelled" && parameter == "label"
    ));
}

#[test]
fn required_plain_parameters_accept_overrides() -> Result<(), RegistryError> {
    let mut registry = demo_registry();
    let overrides = Overrides::new().with("label", String::from("named"));
    let labelled =
        downcast::<Labelled>(registry.resolve_with("tests.Labelled", &overrides)?).unwrap();
    assert_eq!(labelled.label, "named");
    Ok(())
}

#[test]
fn registered_entries_are_injected_by_identity() -> Result<(), RegistryError> {
    let mut registry = demo_registry();
    let stored = Arc::new(Dependency::new());
    registry.set("tests.Dependency", stored.clone(), false)?;

    let consumer = downcast::<Consumer>(registry.resolve("tests.Consumer")?).unwrap();
    assert!(Arc::ptr_eq(&consumer.dep, &stored));
    Ok(())
}

#[test]
fn resolve_always_constructs_fresh_instances() -> Result<(), RegistryError> {
    let mut registry = demo_registry();
    let stored = Arc::new(Consumer::new(Arc::new(Dependency::new()), 1));
    registry.set("tests.Consumer", stored.clone(), false)?;

    // The stored entry is not returned for the target type itself...
    let resolved = downcast::<Consumer>(registry.resolve("tests.Consumer")?).unwrap();
    assert!(!Arc::ptr_eq(&resolved, &stored));
    // ...but a dependency lookup for the same identifier still prefers it.
    let direct = downcast::<Consumer>(registry.get("tests.Consumer")?).unwrap();
    assert!(Arc::ptr_eq(&direct, &stored));
    Ok(())
}

#[test]
fn constructor_cycles_fail_fast() {
    let mut registry = demo_registry();
    let err = registry.resolve("tests.Alpha").unwrap_err();
    assert!(matches!(
        &err,
        RegistryError::Cycle(chain)
            if chain.first().map(String::as_str) == Some("tests.Alpha")
                && chain.last().map(String::as_str) == Some("tests.Alpha")
    ));
}

#[test]
fn registering_one_side_breaks_the_cycle() -> Result<(), RegistryError> {
    let mut registry = demo_registry();
    let beta = Arc::new(Beta);
    registry.set("tests.Beta", beta.clone(), false)?;

    let alpha = downcast::<Alpha>(registry.resolve("tests.Alpha")?).unwrap();
    assert!(Arc::ptr_eq(&alpha.beta, &beta));
    Ok(())
}

#[test]
fn unknown_types_are_not_constructible() {
    let mut registry = Registry::new();
    let err = registry.resolve("tests.Dependency").unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Construction { target, source: IntrospectError::NotConstructible(_) }
            if target == "tests.Dependency"
    ));
}

#[test]
fn nested_failures_name_the_parameter_and_enclosing_type() {
    let mut schemas = SchemaIntrospector::new();
    schema!(schemas, "tests.Outer", Outer::new,
        dep: shared Labelled => "tests.Labelled",
        count: i64 = 1,
    );
    schema!(schemas, "tests.Labelled", Labelled::new, label: String);
    let mut registry = Registry::with_introspector(Arc::new(schemas));

    let err = registry.resolve("tests.Outer").unwrap_err();
    let RegistryError::Nested { target, parameter, source } = err else {
        panic!("expected a nested resolution failure");
    };
    assert_eq!(target, "tests.Outer");
    assert_eq!(parameter, "dep");
    assert!(matches!(
        *source,
        RegistryError::Unresolved { ref parameter, .. } if parameter == "label"
    ));
}
