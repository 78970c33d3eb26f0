//! Integration tests for registry isolation and dimensions.
//!
//! Separate registries never see each other's entries, and within one registry
//! dimensions are separate namespaces for the same name.

use dimension_registry::{define_registry, RegisterOptions, Registry};
use std::sync::Arc;

define_registry!(first);
define_registry!(second);

#[test]
fn test_declared_registries_are_isolated() {
    first::register("isolation.shared", "first".to_string(), RegisterOptions::new()).unwrap();
    second::register("isolation.shared", "second".to_string(), RegisterOptions::new()).unwrap();

    let a: Arc<String> = first::get_as("isolation.shared", None).unwrap();
    let b: Arc<String> = second::get_as("isolation.shared", None).unwrap();
    assert_eq!(a.as_str(), "first");
    assert_eq!(b.as_str(), "second");

    assert!(first::remove("isolation.shared", None));
    assert!(second::contains("isolation.shared"));
}

#[test]
fn test_declared_registries_use_separate_locks() {
    assert!(!Arc::ptr_eq(
        &first::registry().shared_lock(),
        &second::registry().shared_lock()
    ));
}

#[test]
fn test_same_name_in_different_dimensions() {
    let registry = Registry::new();
    registry.register("n", "in d1", RegisterOptions::new().dimension("d1")).unwrap();
    registry.register("n", "in d2", RegisterOptions::new().dimension("d2")).unwrap();

    assert_eq!(*registry.get_as::<&str>("n", Some("d1")).unwrap(), "in d1");
    assert_eq!(*registry.get_as::<&str>("n", Some("d2")).unwrap(), "in d2");
    assert_eq!(registry.len(), 2);

    assert!(registry.remove("n", Some("d1")));
    assert_eq!(*registry.get_as::<&str>("n", None).unwrap(), "in d2");
}

#[test]
fn test_clearing_one_dimension_keeps_others() {
    let registry = Registry::new();
    registry.register("a", 1u8, RegisterOptions::new().dimension("cache")).unwrap();
    registry.register("b", 2u8, RegisterOptions::new().dimension("cache")).unwrap();
    registry.register("c", 3u8, RegisterOptions::new().dimension("config")).unwrap();

    registry.clear(Some("cache"));

    assert!(registry.list_dimension("cache").is_empty());
    assert_eq!(registry.list_dimension("config"), vec!["c"]);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_end_to_end_alias_lifecycle() {
    let registry = Registry::new();
    let service = Arc::new("service object".to_string());

    registry
        .register_value(
            "svc",
            dimension_registry::StoredValue::from_arc(service.clone()),
            RegisterOptions::new().dimension("types").alias("primary"),
        )
        .unwrap();

    let found: Arc<String> = registry.get_as("primary", None).unwrap();
    assert!(Arc::ptr_eq(&found, &service));

    assert!(registry.remove("svc", Some("types")));
    assert!(registry.get("primary", None).is_none());
}
