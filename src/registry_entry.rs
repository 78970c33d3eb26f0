//! Immutable records held by the registry.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::disposal::{AsyncDisposable, Disposable, Disposal};

/// Type-erased registered object.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Arbitrary side data attached to an entry (description, aliases, flags...).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A value prepared for registration, together with its disposal capability.
///
/// Cloning is cheap: the underlying object is shared through an `Arc`.
#[derive(Clone)]
pub struct StoredValue {
    value: Value,
    type_name: &'static str,
    disposal: Disposal,
}

impl StoredValue {
    /// Wraps a plain value. It is never disposed by the registry.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps a value that is already shared.
    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
            disposal: Disposal::None,
        }
    }

    /// Wraps a value whose [`Disposable::dispose`] runs when its dimension is cleared.
    pub fn disposable<T: Disposable + 'static>(value: T) -> Self {
        Self::disposable_arc(Arc::new(value))
    }

    pub fn disposable_arc<T: Disposable + 'static>(value: Arc<T>) -> Self {
        Self {
            value: value.clone(),
            type_name: std::any::type_name::<T>(),
            disposal: Disposal::Sync(value),
        }
    }

    /// Wraps a value that can only be released asynchronously.
    ///
    /// Synchronous clears skip it; see [`AsyncDisposable`].
    pub fn async_disposable<T: AsyncDisposable + 'static>(value: T) -> Self {
        let value = Arc::new(value);
        Self {
            value: value.clone(),
            type_name: std::any::type_name::<T>(),
            disposal: Disposal::Async(value),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Fully qualified name of the wrapped type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast::<T>().ok()
    }

    pub fn is_disposable(&self) -> bool {
        matches!(self.disposal, Disposal::Sync(_))
    }

    pub(crate) fn disposal(&self) -> &Disposal {
        &self.disposal
    }

    pub(crate) fn async_disposer(&self) -> Option<Arc<dyn AsyncDisposable>> {
        match &self.disposal {
            Disposal::Async(resource) => Some(resource.clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredValue")
            .field("type_name", &self.type_name)
            .field("disposal", &self.disposal.label())
            .finish()
    }
}

/// An immutable `(dimension, name) → value` record.
///
/// Entries are only created by [`Registry::register`](crate::Registry::register).
/// A "change" is a new registration with `replace` set, never an in-place edit.
#[derive(Clone, Debug)]
pub struct RegistryEntry {
    name: String,
    dimension: String,
    value: StoredValue,
    metadata: Metadata,
}

impl RegistryEntry {
    pub(crate) fn new(
        name: impl Into<String>,
        dimension: impl Into<String>,
        value: StoredValue,
        metadata: Metadata,
    ) -> Self {
        Self {
            name: name.into(),
            dimension: dimension.into(),
            value,
            metadata,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    /// Canonical identity `(dimension, name)`.
    pub fn key(&self) -> (&str, &str) {
        (&self.dimension, &self.name)
    }

    pub fn value(&self) -> &Value {
        self.value.value()
    }

    pub fn stored(&self) -> &StoredValue {
        &self.value
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Shorthand for `metadata().get(key)`.
    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.downcast()
    }
}
