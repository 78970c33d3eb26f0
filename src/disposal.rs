//! Resource disposal for registered values.
//!
//! A value opts into disposal by being registered through
//! [`Registry::register_disposable`](crate::Registry::register_disposable),
//! [`Registry::register_type_disposable`](crate::Registry::register_type_disposable)
//! or a [`StoredValue::disposable`](crate::StoredValue::disposable) /
//! [`StoredValue::async_disposable`](crate::StoredValue::async_disposable) value.
//! The capability is captured at registration time; values registered any
//! other way are never disposed.
//!
//! Disposal only happens on bulk clears ([`Registry::clear`](crate::Registry::clear)).
//! Single-entry removal hands the value back to whoever still holds an `Arc`.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;

use crate::RegistryEntry;

/// Synchronous release of resources held by a registered value.
///
/// Called at most once per clear that drops the owning entry. Errors and
/// panics are logged and swallowed so the rest of the clear proceeds.
pub trait Disposable: Send + Sync {
    fn dispose(&self) -> anyhow::Result<()>;
}

/// Future returned by [`AsyncDisposable::dispose_async`].
pub type DisposeFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Asynchronous release of resources held by a registered value.
///
/// The registry never drives these futures. `clear` skips such values; callers
/// collect them with [`Registry::async_disposables`](crate::Registry::async_disposables)
/// and await them on their own runtime before clearing.
pub trait AsyncDisposable: Send + Sync {
    fn dispose_async(&self) -> DisposeFuture<'_>;
}

/// Disposal capability captured for a stored value.
#[derive(Clone, Default)]
pub(crate) enum Disposal {
    #[default]
    None,
    Sync(Arc<dyn Disposable>),
    Async(Arc<dyn AsyncDisposable>),
}

impl Disposal {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Disposal::None => "none",
            Disposal::Sync(_) => "sync",
            Disposal::Async(_) => "async",
        }
    }
}

/// Disposes every synchronous resource among `entries`, best effort.
///
/// Returns how many hooks completed successfully.
pub(crate) fn dispose_entries<'a>(entries: impl IntoIterator<Item = &'a RegistryEntry>) -> usize {
    let mut disposed = 0;

    for entry in entries {
        match entry.stored().disposal() {
            Disposal::None => {}
            Disposal::Sync(resource) => {
                match panic::catch_unwind(AssertUnwindSafe(|| resource.dispose())) {
                    Ok(Ok(())) => disposed += 1,
                    Ok(Err(err)) => tracing::warn!(
                        item_name = entry.name(),
                        dimension = entry.dimension(),
                        error = %err,
                        "failed to dispose registry entry"
                    ),
                    Err(_) => tracing::warn!(
                        item_name = entry.name(),
                        dimension = entry.dimension(),
                        "disposal hook panicked"
                    ),
                }
            }
            Disposal::Async(_) => tracing::debug!(
                item_name = entry.name(),
                dimension = entry.dimension(),
                "skipping asynchronous disposal on synchronous clear"
            ),
        }
    }

    disposed
}
