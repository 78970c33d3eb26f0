//! The multi-dimensional registry.
//!
//! Entries live under `(dimension, name)`. Three indices share one lock:
//!
//! - the primary store, `dimension → name → RegistryEntry`, in insertion order;
//! - the alias table, `alias → (dimension, name)`, which owns nothing;
//! - the type index, `TypeId → instance`, used for dependency lookup by type.
//!
//! # Examples
//!
//! ```
//! use dimension_registry::{RegisterOptions, Registry};
//!
//! let registry = Registry::new();
//! registry
//!     .register("svc", 42u32, RegisterOptions::new().dimension("types").alias("primary"))
//!     .unwrap();
//!
//! assert_eq!(*registry.get_as::<u32>("primary", None).unwrap(), 42);
//! assert!(registry.remove("svc", Some("types")));
//! assert!(registry.get("primary", None).is_none());
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::disposal::{dispose_entries, AsyncDisposable, Disposable};
use crate::lock_manager::{LockManager, SharedLock};
use crate::registry_entry::{Metadata, RegistryEntry, StoredValue, Value};
use crate::{RegistryError, RegistryEvent};

/// Dimension used when a registration names none.
pub const DEFAULT_DIMENSION: &str = "default";

/// Dimension that named type registrations are mirrored into.
pub const TYPES_DIMENSION: &str = "types";

/// Type alias for the user-supplied tracing callback.
///
/// The callback receives a reference to a [`RegistryEvent`] after every
/// register, remove and clear. It must be thread-safe because registries are
/// shared across threads.
pub type TraceCallback = dyn Fn(&RegistryEvent) + Send + Sync + 'static;

/// Construction parameters for a [`Registry`].
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Name attached to log records emitted by this registry.
    pub label: String,
    /// Well-known name of a [`LockManager`] lock to share. `None` gives the
    /// registry a private lock.
    pub lock_name: Option<String>,
    /// Dimension used when [`RegisterOptions`] names none.
    pub default_dimension: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            label: "registry".to_owned(),
            lock_name: None,
            default_dimension: DEFAULT_DIMENSION.to_owned(),
        }
    }
}

/// Options for [`Registry::register`].
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    dimension: Option<String>,
    metadata: Metadata,
    aliases: Vec<String>,
    replace: bool,
}

impl RegisterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimension(mut self, dimension: impl Into<String>) -> Self {
        self.dimension = Some(dimension.into());
        self
    }

    /// Replaces the whole metadata map.
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Adds a single metadata field.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Overwrite an existing entry instead of failing with
    /// [`RegistryError::AlreadyExists`].
    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }
}

/// Key of the type index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Membership query for [`Registry::contains`].
///
/// A bare name matches in any dimension; a `(dimension, name)` pair matches exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKey<'a> {
    Name(&'a str),
    Scoped { dimension: &'a str, name: &'a str },
}

impl<'a> From<&'a str> for EntryKey<'a> {
    fn from(name: &'a str) -> Self {
        EntryKey::Name(name)
    }
}

impl<'a> From<&'a String> for EntryKey<'a> {
    fn from(name: &'a String) -> Self {
        EntryKey::Name(name)
    }
}

impl<'a> From<(&'a str, &'a str)> for EntryKey<'a> {
    fn from((dimension, name): (&'a str, &'a str)) -> Self {
        EntryKey::Scoped { dimension, name }
    }
}

struct TypeSlot {
    key: TypeKey,
    instance: Value,
}

#[derive(Default)]
struct State {
    store: IndexMap<String, IndexMap<String, RegistryEntry>>,
    aliases: HashMap<String, (String, String)>,
    types: IndexMap<TypeId, TypeSlot>,
}

impl State {
    fn lookup(&self, dimension: &str, name: &str) -> Option<&RegistryEntry> {
        self.store.get(dimension)?.get(name)
    }

    fn resolve(&self, name: &str, dimension: Option<&str>) -> Option<&RegistryEntry> {
        if let Some(entry) = dimension.and_then(|dimension| self.lookup(dimension, name)) {
            return Some(entry);
        }

        // Consulted even when a dimension was requested.
        if let Some(entry) = self
            .aliases
            .get(name)
            .and_then(|(dimension, target)| self.lookup(dimension, target))
        {
            return Some(entry);
        }

        if dimension.is_none() {
            return self.store.values().find_map(|names| names.get(name));
        }

        None
    }

    fn purge_aliases(&mut self, dimension: &str, name: &str) {
        self.aliases
            .retain(|_, (alias_dimension, target)| alias_dimension != dimension || target != name);
    }

    /// Drops `doomed` entries that are still the stored ones, then every alias
    /// left without a target.
    fn drop_entries(&mut self, doomed: &[RegistryEntry]) {
        for entry in doomed {
            let Some(names) = self.store.get_mut(entry.dimension()) else {
                continue;
            };
            let unchanged = names
                .get(entry.name())
                .is_some_and(|current| Arc::ptr_eq(current.value(), entry.value()));
            if unchanged {
                names.shift_remove(entry.name());
            }
        }

        let store = &self.store;
        self.aliases.retain(|_, (dimension, name)| {
            store
                .get(dimension.as_str())
                .is_some_and(|names| names.contains_key(name.as_str()))
        });
    }
}

/// Thread-safe multi-dimensional object registry.
///
/// Every operation holds the registry's reentrant lock for its whole duration,
/// so disposal hooks and trace callbacks may call back into the same registry
/// from the same thread.
pub struct Registry {
    config: RegistryConfig,
    lock: SharedLock,
    state: Mutex<State>,
    trace: RwLock<Option<Arc<TraceCallback>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        let lock = match &config.lock_name {
            Some(name) => LockManager::global().lock(name),
            None => Arc::new(ReentrantMutex::new(())),
        };

        Self {
            config,
            lock,
            state: Mutex::new(State::default()),
            trace: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// The lock guarding this registry, for subsystems that coordinate on it.
    pub fn shared_lock(&self) -> SharedLock {
        self.lock.clone()
    }

    // -------------------------------------------------------------------------------------------------
    // Tracing
    // -------------------------------------------------------------------------------------------------

    /// Set a tracing callback for register, remove and clear operations.
    ///
    /// The callback runs while the registry lock is held but outside any
    /// borrow of the storage, so it may query the registry. A panicking
    /// callback is caught and ignored.
    pub fn set_trace_callback(&self, callback: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        *self.trace.write() = Some(Arc::new(callback));
    }

    /// Clear the tracing callback.
    ///
    /// Does not affect registered values.
    pub fn clear_trace_callback(&self) {
        *self.trace.write() = None;
    }

    fn emit_event(&self, event: &RegistryEvent) {
        let callback = self.trace.read().clone();
        if let Some(callback) = callback {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                tracing::debug!(
                    registry = %self.config.label,
                    operation = event.operation(),
                    "trace callback panicked"
                );
            }
        }
    }

    // -------------------------------------------------------------------------------------------------
    // Registry
    // -------------------------------------------------------------------------------------------------

    /// Register `value` under `name`.
    ///
    /// Shorthand for [`register_value`](Self::register_value) with a plain
    /// value. The registry never disposes it, even when `T` implements
    /// [`Disposable`]; use [`register_disposable`](Self::register_disposable)
    /// for that.
    pub fn register<T: Send + Sync + 'static>(
        &self,
        name: &str,
        value: T,
        options: RegisterOptions,
    ) -> Result<RegistryEntry, RegistryError> {
        self.register_value(name, StoredValue::new(value), options)
    }

    /// Register `value` under `name`, disposing it when its dimension is cleared.
    pub fn register_disposable<T: Disposable + 'static>(
        &self,
        name: &str,
        value: T,
        options: RegisterOptions,
    ) -> Result<RegistryEntry, RegistryError> {
        self.register_value(name, StoredValue::disposable(value), options)
    }

    /// Register a prepared value under `name`.
    ///
    /// Aliases in `options` are pointed at the new entry unconditionally; the
    /// last registration naming an alias wins.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AlreadyExists`] when `(dimension, name)` is occupied and
    /// `options` does not request replacement. Nothing is modified in that case.
    pub fn register_value(
        &self,
        name: &str,
        value: StoredValue,
        options: RegisterOptions,
    ) -> Result<RegistryEntry, RegistryError> {
        let RegisterOptions {
            dimension,
            metadata,
            aliases,
            replace,
        } = options;
        let dimension = dimension.unwrap_or_else(|| self.config.default_dimension.clone());
        let has_metadata = !metadata.is_empty();

        let _guard = self.lock.lock();
        let (entry, replaced) = {
            let mut state = self.state.lock();

            let replaced = state.lookup(&dimension, name).is_some();
            if replaced && !replace {
                return Err(RegistryError::already_exists(name, &dimension));
            }

            let entry = RegistryEntry::new(name, dimension.as_str(), value, metadata);
            state
                .store
                .entry(dimension.clone())
                .or_default()
                .insert(name.to_owned(), entry.clone());

            for alias in &aliases {
                state
                    .aliases
                    .insert(alias.clone(), (dimension.clone(), name.to_owned()));
            }

            (entry, replaced)
        };

        tracing::debug!(
            registry = %self.config.label,
            operation = "register",
            item_name = name,
            dimension = %dimension,
            alias_count = aliases.len(),
            has_metadata,
            replaced,
            "registered item"
        );
        self.emit_event(&RegistryEvent::Register {
            item_name: name.to_owned(),
            dimension,
            alias_count: aliases.len(),
            has_metadata,
            replaced,
        });

        Ok(entry)
    }

    /// Look up a value.
    ///
    /// Resolution order:
    ///
    /// 1. when `dimension` is given, the entry stored under `(dimension, name)`;
    /// 2. the entry the alias `name` points at;
    /// 3. when `dimension` is `None`, the first dimension holding `name`.
    ///
    /// Step 2 runs even for a scoped lookup, so an alias may resolve to an
    /// entry in a different dimension than the one requested.
    pub fn get(&self, name: &str, dimension: Option<&str>) -> Option<Value> {
        self.get_entry(name, dimension)
            .map(|entry| entry.value().clone())
    }

    /// Same resolution as [`get`](Self::get), returning the whole entry.
    pub fn get_entry(&self, name: &str, dimension: Option<&str>) -> Option<RegistryEntry> {
        let _guard = self.lock.lock();
        let state = self.state.lock();
        state.resolve(name, dimension).cloned()
    }

    /// Same resolution as [`get`](Self::get), downcast to `T`.
    pub fn get_as<T: Send + Sync + 'static>(
        &self,
        name: &str,
        dimension: Option<&str>,
    ) -> Option<Arc<T>> {
        self.get_entry(name, dimension)?.downcast()
    }

    /// Names stored in `dimension`, in registration order.
    pub fn list_dimension(&self, dimension: &str) -> Vec<String> {
        let _guard = self.lock.lock();
        let state = self.state.lock();
        state
            .store
            .get(dimension)
            .map(|names| names.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Names of every dimension mapped to the names it stores.
    pub fn list_all(&self) -> IndexMap<String, Vec<String>> {
        let _guard = self.lock.lock();
        let state = self.state.lock();
        state
            .store
            .iter()
            .map(|(dimension, names)| (dimension.clone(), names.keys().cloned().collect()))
            .collect()
    }

    pub fn dimensions(&self) -> Vec<String> {
        let _guard = self.lock.lock();
        self.state.lock().store.keys().cloned().collect()
    }

    /// Remove a single entry and the aliases pointing at it.
    ///
    /// Without a dimension only the first dimension holding `name` is
    /// affected; call again to remove the next one. The value is not disposed.
    pub fn remove(&self, name: &str, dimension: Option<&str>) -> bool {
        let _guard = self.lock.lock();
        let removed_from = {
            let mut state = self.state.lock();
            let target = match dimension {
                Some(dimension) => state
                    .lookup(dimension, name)
                    .map(|_| dimension.to_owned()),
                None => state
                    .store
                    .iter()
                    .find(|(_, names)| names.contains_key(name))
                    .map(|(dimension, _)| dimension.clone()),
            };

            if let Some(dimension) = &target {
                if let Some(names) = state.store.get_mut(dimension) {
                    names.shift_remove(name);
                }
                state.purge_aliases(dimension, name);
            }
            target
        };

        let Some(dimension) = removed_from else {
            return false;
        };

        tracing::debug!(
            registry = %self.config.label,
            operation = "remove",
            item_name = name,
            dimension = %dimension,
            "removed item"
        );
        self.emit_event(&RegistryEvent::Remove {
            item_name: name.to_owned(),
            dimension,
        });
        true
    }

    /// Dispose and drop every entry of `dimension`, or of the whole registry.
    ///
    /// Values registered as [`Disposable`](crate::Disposable) are disposed
    /// before the store is emptied; failing hooks are logged and skipped.
    /// [`AsyncDisposable`] values are left alone, see
    /// [`async_disposables`](Self::async_disposables).
    ///
    /// A full clear also empties the alias table and the type index. A scoped
    /// clear keeps the (now empty) dimension and drops aliases into it.
    ///
    /// Only the entries present when the clear started are dropped. Anything a
    /// disposal hook registers, including a replacement under a cleared name,
    /// survives the clear.
    pub fn clear(&self, dimension: Option<&str>) {
        let _guard = self.lock.lock();

        let (doomed, doomed_types): (Vec<RegistryEntry>, Vec<(TypeId, Value)>) = {
            let state = self.state.lock();
            match dimension {
                Some(dimension) => (
                    state
                        .store
                        .get(dimension)
                        .map(|names| names.values().cloned().collect())
                        .unwrap_or_default(),
                    Vec::new(),
                ),
                None => (
                    state
                        .store
                        .values()
                        .flat_map(|names| names.values().cloned())
                        .collect(),
                    state
                        .types
                        .iter()
                        .map(|(id, slot)| (*id, slot.instance.clone()))
                        .collect(),
                ),
            }
        };

        let disposed = dispose_entries(&doomed);

        {
            let mut state = self.state.lock();
            state.drop_entries(&doomed);

            if dimension.is_none() {
                state.store.retain(|_, names| !names.is_empty());
                for (id, instance) in &doomed_types {
                    let unchanged = state
                        .types
                        .get(id)
                        .is_some_and(|slot| Arc::ptr_eq(&slot.instance, instance));
                    if unchanged {
                        state.types.shift_remove(id);
                    }
                }
            }
        }

        tracing::debug!(
            registry = %self.config.label,
            operation = "clear",
            dimension = dimension.unwrap_or("*"),
            removed = doomed.len(),
            disposed,
            "cleared registry"
        );
        self.emit_event(&RegistryEvent::Clear {
            dimension: dimension.map(str::to_owned),
            removed: doomed.len(),
        });
    }

    /// Asynchronous disposal handles of `dimension`, or of every dimension.
    ///
    /// Await these before calling [`clear`](Self::clear); the synchronous clear
    /// does not run them.
    pub fn async_disposables(&self, dimension: Option<&str>) -> Vec<Arc<dyn AsyncDisposable>> {
        let _guard = self.lock.lock();
        let state = self.state.lock();
        state
            .store
            .iter()
            .filter(|(name, _)| dimension.map_or(true, |wanted| wanted == name.as_str()))
            .flat_map(|(_, names)| names.values())
            .filter_map(|entry| entry.stored().async_disposer())
            .collect()
    }

    // -------------------------------------------------------------------------------------------------
    // Type index
    // -------------------------------------------------------------------------------------------------

    /// Bind `instance` to its type, overwriting any previous binding.
    ///
    /// With a `name`, the instance is also stored in the `"types"` dimension
    /// (replacing any entry there) with a `"type"` metadata field.
    pub fn register_type<T: Send + Sync + 'static>(
        &self,
        instance: T,
        name: Option<&str>,
    ) -> Result<(), RegistryError> {
        self.register_type_arc(Arc::new(instance), name)
    }

    pub fn register_type_arc<T: Send + Sync + 'static>(
        &self,
        instance: Arc<T>,
        name: Option<&str>,
    ) -> Result<(), RegistryError> {
        self.bind_type(TypeKey::of::<T>(), StoredValue::from_arc(instance), name)
    }

    /// Like [`register_type`](Self::register_type), keeping the disposal hook.
    ///
    /// The hook runs when the named `"types"` entry is cleared. Unnamed
    /// bindings live only in the type index and are never disposed.
    pub fn register_type_disposable<T: Disposable + 'static>(
        &self,
        instance: T,
        name: Option<&str>,
    ) -> Result<(), RegistryError> {
        self.bind_type(TypeKey::of::<T>(), StoredValue::disposable(instance), name)
    }

    fn bind_type(
        &self,
        key: TypeKey,
        stored: StoredValue,
        name: Option<&str>,
    ) -> Result<(), RegistryError> {
        let _guard = self.lock.lock();
        self.state.lock().types.insert(
            key.id,
            TypeSlot {
                key,
                instance: stored.value().clone(),
            },
        );

        if let Some(name) = name {
            self.register_value(
                name,
                stored,
                RegisterOptions::new()
                    .dimension(TYPES_DIMENSION)
                    .meta("type", key.name())
                    .replace(true),
            )?;
        }

        Ok(())
    }

    /// The instance last bound to `T`.
    pub fn get_by_type<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let _guard = self.lock.lock();
        let state = self.state.lock();
        state
            .types
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.instance.clone().downcast::<T>().ok())
    }

    pub fn list_types(&self) -> Vec<TypeKey> {
        let _guard = self.lock.lock();
        self.state.lock().types.values().map(|slot| slot.key).collect()
    }

    // -------------------------------------------------------------------------------------------------
    // Containment and iteration
    // -------------------------------------------------------------------------------------------------

    pub fn contains<'a>(&self, key: impl Into<EntryKey<'a>>) -> bool {
        let _guard = self.lock.lock();
        let state = self.state.lock();
        match key.into() {
            EntryKey::Name(name) => state.store.values().any(|names| names.contains_key(name)),
            EntryKey::Scoped { dimension, name } => state.lookup(dimension, name).is_some(),
        }
    }

    /// Snapshot of every entry.
    ///
    /// The lock is released before the first item is yielded.
    pub fn iter(&self) -> std::vec::IntoIter<RegistryEntry> {
        let snapshot: Vec<RegistryEntry> = {
            let _guard = self.lock.lock();
            let state = self.state.lock();
            state
                .store
                .values()
                .flat_map(|names| names.values().cloned())
                .collect()
        };
        snapshot.into_iter()
    }

    /// Total number of entries across all dimensions.
    pub fn len(&self) -> usize {
        let _guard = self.lock.lock();
        self.state.lock().store.values().map(|names| names.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("label", &self.config.label)
            .field("dimensions", &self.list_all())
            .field("types", &self.list_types())
            .finish()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = RegistryEntry;
    type IntoIter = std::vec::IntoIter<RegistryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
