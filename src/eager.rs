//! Eager bootstrap of a declared set of keys.
//!
//! Runs the same `get_or_create` path as lazy access, but at startup, before
//! any concurrent access path exists. Entries registered eagerly are retrieved
//! afterwards through the identical accessors as lazy ones, so callers see one
//! uniform access pattern regardless of origin.

use std::fmt;

use crate::{
    error::{BoxError, RegistryError},
    key::Key,
    registry::Registry,
    typed::TypeKeyed,
};

type BootstrapOp = Box<dyn FnOnce(&Registry) -> Result<(), RegistryError>>;

/// Builder declaring the keys to populate at bootstrap.
///
/// # Example
///
/// ```
/// use oncemap::{EagerInit, Registry, Settings};
///
/// # fn main() -> Result<(), oncemap::RegistryError> {
/// let registry = Registry::new();
/// EagerInit::new()
///     .provide("settings", || {
///         Ok(Settings::with_defaults([
///             ("apiUrl", "https://api.example.com".into()),
///             ("timeout", 5000.into()),
///         ]))
///     })
///     .run(&registry)?;
///
/// let settings = registry.get::<Settings, _>("settings")?.unwrap();
/// assert!(settings.has("apiUrl"));
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct EagerInit {
    ops: Vec<BootstrapOp>,
}

impl EagerInit {
    /// Creates an empty bootstrap set.
    pub fn new() -> Self {
        EagerInit { ops: Vec::new() }
    }

    /// Declares `key` with its factory, to be constructed during [`run`](EagerInit::run).
    pub fn provide<T, F, K>(mut self, key: K, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, BoxError> + 'static,
        K: Into<Key>,
    {
        let key = key.into();
        self.ops.push(Box::new(move |registry| {
            registry.get_or_create(key, factory).map(drop)
        }));
        self
    }

    /// Declares `key` with an already constructed value.
    ///
    /// Covers the pre-built module instance style: the value is built ahead of
    /// time, registered at bootstrap, and retrieved like any lazy entry.
    pub fn provide_value<T, K>(self, key: K, value: T) -> Self
    where
        T: Send + Sync + 'static,
        K: Into<Key>,
    {
        self.provide(key, move || Ok(value))
    }

    /// Binds `T` and constructs its instance during [`run`](EagerInit::run).
    pub fn provide_type<T: TypeKeyed>(mut self) -> Self {
        self.ops.push(Box::new(|registry| {
            registry.bind::<T>();
            registry.get_for_type::<T>().map(drop)
        }));
        self
    }

    /// Runs `get_or_create` for every declared key, in declaration order.
    ///
    /// Stops at the first construction failure; keys populated before the
    /// failure stay constructed.
    pub fn run(self, registry: &Registry) -> Result<(), RegistryError> {
        for op in self.ops {
            op(registry)?;
        }
        Ok(())
    }
}

impl fmt::Debug for EagerInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EagerInit")
            .field("declared", &self.ops.len())
            .finish()
    }
}
