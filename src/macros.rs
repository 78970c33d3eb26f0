//! Macros for declaring process-wide registries and commands.

/// Declares an isolated, process-wide [`Registry`](crate::Registry) in its own module.
///
/// The generated module contains:
/// - a lazily created registry guarded by the shared lock `registry.<name>`
/// - a `registry()` accessor
/// - free functions delegating to the most common registry operations
///
/// # Examples
///
/// ```rust
/// use dimension_registry::{define_registry, RegisterOptions};
/// use std::sync::Arc;
///
/// define_registry!(services);
///
/// services::register("db", "postgres://localhost".to_string(), RegisterOptions::new()).unwrap();
/// let url: Arc<String> = services::get_as("db", None).unwrap();
/// assert_eq!(url.as_str(), "postgres://localhost");
/// ```
///
/// # Multiple Registries
///
/// ```rust
/// use dimension_registry::{define_registry, RegisterOptions};
///
/// define_registry!(database);
/// define_registry!(cache);
///
/// database::register("conn", 1u8, RegisterOptions::new()).unwrap();
/// assert!(database::contains("conn"));
/// assert!(!cache::contains("conn"));
/// ```
#[macro_export]
macro_rules! define_registry {
    ($name:ident) => {
        pub mod $name {
            #![allow(dead_code)]

            use std::sync::{Arc, LazyLock};

            static REGISTRY: LazyLock<$crate::Registry> = LazyLock::new(|| {
                $crate::Registry::with_config($crate::RegistryConfig {
                    label: stringify!($name).to_owned(),
                    lock_name: Some(concat!("registry.", stringify!($name)).to_owned()),
                    ..Default::default()
                })
            });

            /// The registry behind this module.
            pub fn registry() -> &'static $crate::Registry {
                &REGISTRY
            }

            pub fn register<T: Send + Sync + 'static>(
                name: &str,
                value: T,
                options: $crate::RegisterOptions,
            ) -> Result<$crate::RegistryEntry, $crate::RegistryError> {
                REGISTRY.register(name, value, options)
            }

            pub fn register_disposable<T: $crate::Disposable + 'static>(
                name: &str,
                value: T,
                options: $crate::RegisterOptions,
            ) -> Result<$crate::RegistryEntry, $crate::RegistryError> {
                REGISTRY.register_disposable(name, value, options)
            }

            pub fn get_as<T: Send + Sync + 'static>(
                name: &str,
                dimension: Option<&str>,
            ) -> Option<Arc<T>> {
                REGISTRY.get_as(name, dimension)
            }

            pub fn contains<'a>(key: impl Into<$crate::EntryKey<'a>>) -> bool {
                REGISTRY.contains(key)
            }

            pub fn remove(name: &str, dimension: Option<&str>) -> bool {
                REGISTRY.remove(name, dimension)
            }

            pub fn clear(dimension: Option<&str>) {
                REGISTRY.clear(dimension)
            }

            pub fn register_type<T: Send + Sync + 'static>(
                instance: T,
                name: Option<&str>,
            ) -> Result<(), $crate::RegistryError> {
                REGISTRY.register_type(instance, name)
            }

            pub fn get_by_type<T: Send + Sync + 'static>() -> Option<Arc<T>> {
                REGISTRY.get_by_type()
            }

            pub fn set_trace_callback(
                callback: impl Fn(&$crate::RegistryEvent) + Send + Sync + 'static,
            ) {
                REGISTRY.set_trace_callback(callback)
            }

            pub fn clear_trace_callback() {
                REGISTRY.clear_trace_callback()
            }
        }
    };
}

/// Defines a command handler and a `<name>_command()` constructor returning
/// its [`CommandFn`](crate::CommandFn).
///
/// The function name becomes the command name and its doc comment the
/// default description. The handler must take `&[String]` and return
/// `anyhow::Result<()>`.
///
/// # Examples
///
/// ```rust
/// use dimension_registry::{command, CommandRegistrar, Registry};
///
/// command! {
///     /// Prints the current status.
///     fn status(_args: &[String]) -> anyhow::Result<()> {
///         Ok(())
///     }
/// }
///
/// let registry = Registry::new();
/// let info = CommandRegistrar::new(&registry).register(status_command()).unwrap();
/// assert_eq!(info.full_name, "status");
/// assert_eq!(info.description.as_deref(), Some("Prints the current status."));
/// ```
#[macro_export]
macro_rules! command {
    (
        $(#[doc = $doc:literal])*
        $vis:vis fn $name:ident($args:ident : $args_ty:ty) -> $ret:ty $body:block
    ) => {
        $(#[doc = $doc])*
        $vis fn $name($args: $args_ty) -> $ret $body

        $crate::__paste! {
            #[doc = concat!("Command handle for [`", stringify!($name), "`].")]
            $vis fn [<$name _command>]() -> $crate::CommandFn {
                $crate::CommandFn::new(stringify!($name), $name)
                    $(.with_doc_line($doc))*
            }
        }
    };
}
