//! # Dimension Registry
//!
//! A thread-safe, multi-dimensional object registry for command hubs and
//! lightweight dependency injection.
//!
//! Values are stored under `(dimension, name)`, can be reached through aliases,
//! and can additionally be bound to their type for type-based lookup.
//!
//! ## Quick Start
//!
//! ```rust
//! use dimension_registry::{RegisterOptions, Registry};
//! use std::sync::Arc;
//!
//! let registry = Registry::new();
//! registry
//!     .register("greeting", "Hello, World!".to_string(), RegisterOptions::new().alias("hi"))
//!     .unwrap();
//!
//! let message: Arc<String> = registry.get_as("hi", None).unwrap();
//! assert_eq!(message.as_str(), "Hello, World!");
//! ```
//!
//! ## Features
//!
//! - **Thread-safe**: every operation holds one reentrant lock, shareable by name
//! - **Dimensions and aliases**: names are unique per dimension; aliases resolve across them
//! - **Type index**: [`Registry::register_type`] / [`Registry::get_by_type`]
//! - **Disposal**: [`Disposable`] values are released when their dimension is cleared
//! - **Commands**: dotted command names with automatic parent groups
//! - **Tracing**: `tracing` records plus an optional per-registry event callback
//!
//! ## Main Types
//!
//! - [`Registry`] - the store
//! - [`RegistryEntry`] - immutable `(dimension, name) → value` record
//! - [`CommandRegistrar`] - command registration on top of a registry
//! - [`define_registry!`] - declare an isolated process-wide registry

mod macros;

mod command;
mod disposal;
mod lock_manager;
mod registry;
mod registry_entry;
mod registry_error;
mod registry_event;

pub use command::{
    cli_adapter, command_registry, install_cli_adapter, register_command, register_command_with,
    registrar, split_command_path, CliAdapter, CommandError, CommandFn, CommandHandler,
    CommandInfo, CommandOptions, CommandRegistrar, CommandStamp, CommandTarget, ExternalCommand,
    GroupAdapter, COMMAND_DIMENSION, COMMAND_LOCK_NAME,
};
pub use disposal::{AsyncDisposable, Disposable, DisposeFuture};
pub use lock_manager::{LockManager, SharedLock};
pub use registry::{
    EntryKey, RegisterOptions, Registry, RegistryConfig, TraceCallback, TypeKey,
    DEFAULT_DIMENSION, TYPES_DIMENSION,
};
pub use registry_entry::{Metadata, RegistryEntry, StoredValue, Value};
pub use registry_error::RegistryError;
pub use registry_event::RegistryEvent;

#[doc(hidden)]
pub use paste::paste as __paste;
