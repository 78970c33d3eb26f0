//! Integration tests for dependency-injection and resource patterns.
//!
//! NOTE: Tests touching `services` use #[serial] because they share that
//! process-wide registry.

use dimension_registry::{
    define_registry, AsyncDisposable, Disposable, DisposeFuture, RegisterOptions, Registry,
    StoredValue, TypeKey, TYPES_DIMENSION,
};
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

define_registry!(services);

trait Logger: Send + Sync {
    fn name(&self) -> &str;
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn name(&self) -> &str {
        "ConsoleLogger"
    }
}

struct FileLogger {
    path: String,
}

impl Logger for FileLogger {
    fn name(&self) -> &str {
        &self.path
    }
}

#[test]
#[serial]
fn test_trait_contract_by_type() {
    services::clear(None);

    services::register_type(Arc::new(ConsoleLogger) as Arc<dyn Logger>, None).unwrap();
    let logger: Arc<Arc<dyn Logger>> = services::get_by_type().unwrap();
    assert_eq!(logger.name(), "ConsoleLogger");

    // Swapping the implementation always overwrites.
    services::register_type(
        Arc::new(FileLogger {
            path: "/var/log/app.log".into(),
        }) as Arc<dyn Logger>,
        None,
    )
    .unwrap();
    let logger: Arc<Arc<dyn Logger>> = services::get_by_type().unwrap();
    assert_eq!(logger.name(), "/var/log/app.log");
}

#[test]
#[serial]
fn test_named_type_binding_is_visible_by_name() {
    services::clear(None);

    services::register_type(Arc::new(ConsoleLogger) as Arc<dyn Logger>, Some("logger")).unwrap();

    let by_name: Arc<Arc<dyn Logger>> = services::get_as("logger", Some(TYPES_DIMENSION)).unwrap();
    let by_type: Arc<Arc<dyn Logger>> = services::get_by_type().unwrap();
    assert!(Arc::ptr_eq(&by_name, &by_type));

    let entry = services::registry()
        .get_entry("logger", Some(TYPES_DIMENSION))
        .unwrap();
    assert_eq!(
        entry.meta("type").and_then(|v| v.as_str()),
        Some(TypeKey::of::<Arc<dyn Logger>>().name())
    );
}

#[test]
#[serial]
fn test_factory_pattern() {
    services::clear(None);

    #[derive(Debug, PartialEq)]
    struct User {
        name: String,
        id: u32,
    }

    type UserFactory = Box<dyn Fn(String) -> User + Send + Sync>;

    let counter = Arc::new(Mutex::new(0u32));
    let counter_clone = counter.clone();
    let factory: UserFactory = Box::new(move |name| {
        let mut id = counter_clone.lock().unwrap();
        *id += 1;
        User { name, id: *id }
    });

    services::register("user", factory, RegisterOptions::new().dimension("factories")).unwrap();

    let factory: Arc<UserFactory> = services::get_as("user", Some("factories")).unwrap();
    assert_eq!(factory("Alice".into()).id, 1);
    assert_eq!(factory("Bob".into()).id, 2);
}

struct Connection {
    closed: Arc<AtomicUsize>,
}

impl Disposable for Connection {
    fn dispose(&self) -> anyhow::Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct BrokenConnection;

impl Disposable for BrokenConnection {
    fn dispose(&self) -> anyhow::Result<()> {
        anyhow::bail!("connection reset by peer")
    }
}

#[test]
fn test_clear_disposes_each_resource_once() {
    let registry = Registry::new();
    let closed = Arc::new(AtomicUsize::new(0));

    // A failing hook ahead of the others must not stop the clear.
    registry
        .register_disposable("broken", BrokenConnection, RegisterOptions::new().dimension("pool"))
        .unwrap();
    for name in ["primary", "replica"] {
        registry
            .register_disposable(
                name,
                Connection {
                    closed: closed.clone(),
                },
                RegisterOptions::new().dimension("pool"),
            )
            .unwrap();
    }
    registry
        .register_value(
            "other",
            StoredValue::disposable(Connection {
                closed: closed.clone(),
            }),
            RegisterOptions::new().dimension("elsewhere"),
        )
        .unwrap();
    assert_eq!(registry.list_dimension("pool"), vec!["broken", "primary", "replica"]);

    registry.clear(Some("pool"));
    assert_eq!(closed.load(Ordering::SeqCst), 2);
    assert!(registry.list_dimension("pool").is_empty());

    registry.clear(None);
    assert_eq!(closed.load(Ordering::SeqCst), 3);
    assert!(registry.is_empty());
}

#[test]
fn test_named_type_binding_is_disposed() {
    let registry = Registry::new();
    let closed = Arc::new(AtomicUsize::new(0));
    registry
        .register_type_disposable(
            Connection {
                closed: closed.clone(),
            },
            Some("db"),
        )
        .unwrap();

    registry.clear(Some(TYPES_DIMENSION));
    assert_eq!(closed.load(Ordering::SeqCst), 1);

    registry.clear(None);
    assert_eq!(closed.load(Ordering::SeqCst), 1);
    assert!(registry.get_by_type::<Connection>().is_none());
}

#[test]
fn test_removed_resources_stay_usable() {
    let registry = Registry::new();
    let closed = Arc::new(AtomicUsize::new(0));
    registry
        .register_value(
            "conn",
            StoredValue::disposable(Connection {
                closed: closed.clone(),
            }),
            RegisterOptions::new(),
        )
        .unwrap();

    let held: Arc<Connection> = registry.get_as("conn", None).unwrap();
    assert!(registry.remove("conn", None));

    assert_eq!(closed.load(Ordering::SeqCst), 0);
    assert_eq!(Arc::strong_count(&held), 1);
}

struct Flusher {
    flushed: Arc<AtomicUsize>,
}

impl AsyncDisposable for Flusher {
    fn dispose_async(&self) -> DisposeFuture<'_> {
        Box::pin(async move {
            self.flushed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[test]
fn test_async_resources_are_left_to_the_caller() {
    let registry = Registry::new();
    let flushed = Arc::new(AtomicUsize::new(0));
    registry
        .register_value(
            "buffer",
            StoredValue::async_disposable(Flusher {
                flushed: flushed.clone(),
            }),
            RegisterOptions::new().dimension("io"),
        )
        .unwrap();

    let pending = registry.async_disposables(Some("io"));
    assert_eq!(pending.len(), 1);
    assert!(registry.async_disposables(Some("other")).is_empty());

    registry.clear(Some("io"));
    assert_eq!(flushed.load(Ordering::SeqCst), 0);
    // Handles collected before the clear still work.
    assert_eq!(Arc::strong_count(&pending[0]), 1);
}

#[test]
fn test_disposal_hook_may_reenter_registry() {
    struct Deregister {
        registry: Arc<Registry>,
        seen: Arc<AtomicUsize>,
    }

    impl Disposable for Deregister {
        fn dispose(&self) -> anyhow::Result<()> {
            self.seen.store(self.registry.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    let registry = Arc::new(Registry::new());
    let seen = Arc::new(AtomicUsize::new(usize::MAX));
    registry
        .register_value(
            "hook",
            StoredValue::disposable(Deregister {
                registry: registry.clone(),
                seen: seen.clone(),
            }),
            RegisterOptions::new(),
        )
        .unwrap();

    registry.clear(None);
    // Disposal runs before the store is emptied.
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(registry.is_empty());
}
