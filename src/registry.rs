//! The registry mapping keys to singleton slots.

use std::{
    any,
    collections::{hash_map::Entry, HashMap},
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::{
    error::{BoxError, RegistryError},
    key::Key,
    slot::{BoundFactory, Instance, Slot},
    typed::TypeKeyed,
};

/// Process-wide registry, created on first access.
static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// Returns the process-wide registry.
///
/// Its lifetime is the process lifetime; instances stored in it live until
/// process exit. [`Registry::clear`] is the only teardown hook and is meant
/// for tests. Code that wants an isolated registry can construct its own with
/// [`Registry::new`] instead.
pub fn registry() -> &'static Registry {
    &GLOBAL
}

/// A keyed singleton registry.
///
/// For a given key, the bound factory executes at most once over the
/// registry's lifetime; every caller receives an [`Arc`] alias to the one
/// constructed instance. Concurrent first-time callers for the same key are
/// serialized against the in-flight construction only; distinct keys never
/// block each other, and reads of an already constructed instance take no
/// registry-wide lock beyond a short map lookup.
pub struct Registry {
    slots: Mutex<HashMap<Key, Arc<Slot>>>,
}

impl Registry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Registry {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the instance for `key`, constructing it with `factory` if this
    /// is the first request.
    ///
    /// Only the call that actually triggers construction honors `factory` and
    /// anything captured in it. Later calls for the same key return the stored
    /// instance and their factory is dropped unused, even when it captures
    /// different parameters; this is a documented contract, observable in the
    /// logs, not an error.
    ///
    /// # Example
    ///
    /// ```
    /// use oncemap::Registry;
    ///
    /// struct Logger {
    ///     file: String,
    /// }
    ///
    /// # fn main() -> Result<(), oncemap::RegistryError> {
    /// let registry = Registry::new();
    /// let first = registry.get_or_create("logger", || {
    ///     Ok(Logger { file: "app.log".into() })
    /// })?;
    /// // Same key: the "admin.log" parameter has no effect.
    /// let second = registry.get_or_create("logger", || {
    ///     Ok(Logger { file: "admin.log".into() })
    /// })?;
    /// assert!(std::sync::Arc::ptr_eq(&first, &second));
    /// assert_eq!(second.file, "app.log");
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_or_create<T, F, K>(&self, key: K, factory: F) -> Result<Arc<T>, RegistryError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, BoxError>,
        K: Into<Key>,
    {
        let key = key.into();
        let slot = self.slot(key.clone());
        let (instance, constructed) =
            slot.get_or_init(|| factory().map(|value| Arc::new(value) as Instance))?;
        if !constructed {
            debug!(%key, "already constructed; construction arguments ignored");
        }
        downcast(instance, key)
    }

    /// Returns the instance for `key` if it has been constructed, without
    /// triggering or waiting for construction.
    ///
    /// Returns [`RegistryError::WrongType`] when the stored instance is of a
    /// different type than requested.
    pub fn get<T, K>(&self, key: K) -> Result<Option<Arc<T>>, RegistryError>
    where
        T: Send + Sync + 'static,
        K: Into<Key>,
    {
        let key = key.into();
        let slot = self.lock_slots().get(&key).cloned();
        slot.and_then(|slot| slot.ready_instance())
            .map(|instance| downcast(instance, key))
            .transpose()
    }

    /// Binds `T`'s constructor under its type tag.
    ///
    /// Each concrete variant registers itself once, at its own initialization
    /// time. A second bind for an already bound type is ignored with a
    /// warning: the first binding wins, and redefining a factory after
    /// construction is not supported.
    pub fn bind<T: TypeKeyed>(&self) {
        let key = Key::of::<T>();
        match self.lock_slots().entry(key.clone()) {
            Entry::Occupied(_) => {
                warn!(%key, "type already bound; keeping the first binding");
            }
            Entry::Vacant(entry) => {
                let factory: BoundFactory =
                    Box::new(|| T::construct().map(|value| Arc::new(value) as Instance));
                entry.insert(Arc::new(Slot::with_factory(key, factory)));
            }
        }
    }

    /// Returns the singleton for the concrete type `T`, constructing it on
    /// first access through the factory `T` bound for itself.
    ///
    /// Fails with [`RegistryError::UnboundType`] when `T` never bound a
    /// factory, in particular when called for a shared abstract base instead
    /// of one of its concrete variants.
    ///
    /// # Example
    ///
    /// ```
    /// use oncemap::{Registry, TypeKeyed};
    ///
    /// struct ConsoleLogger;
    ///
    /// impl TypeKeyed for ConsoleLogger {
    ///     fn construct() -> Result<Self, oncemap::BoxError> {
    ///         Ok(ConsoleLogger)
    ///     }
    /// }
    ///
    /// # fn main() -> Result<(), oncemap::RegistryError> {
    /// let registry = Registry::new();
    /// registry.bind::<ConsoleLogger>();
    /// let a = registry.get_for_type::<ConsoleLogger>()?;
    /// let b = registry.get_for_type::<ConsoleLogger>()?;
    /// assert!(std::sync::Arc::ptr_eq(&a, &b));
    /// # Ok(())
    /// # }
    /// ```
    pub fn get_for_type<T>(&self) -> Result<Arc<T>, RegistryError>
    where
        T: Send + Sync + 'static,
    {
        let key = Key::of::<T>();
        let slot = self.lock_slots().get(&key).cloned();
        let Some(slot) = slot else {
            return Err(RegistryError::UnboundType {
                type_name: any::type_name::<T>(),
            });
        };
        let Some(factory) = slot.bound_factory() else {
            return Err(RegistryError::UnboundType {
                type_name: any::type_name::<T>(),
            });
        };
        let (instance, _) = slot.get_or_init(|| factory())?;
        downcast(instance, key)
    }

    /// Returns `true` if a slot exists for `key`, constructed or not.
    pub fn contains<K: Into<Key>>(&self, key: K) -> bool {
        self.lock_slots().contains_key(&key.into())
    }

    /// The number of slots, constructed or not.
    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    /// Returns `true` if the registry holds no slots.
    pub fn is_empty(&self) -> bool {
        self.lock_slots().is_empty()
    }

    /// Removes every slot, dropping stored instances that have no other
    /// holders.
    ///
    /// This is the explicit test-teardown hook; nothing in normal operation
    /// removes a ready slot. A caller racing a clear may still complete its
    /// construction against the detached slot.
    pub fn clear(&self) {
        self.lock_slots().clear();
    }

    fn slot(&self, key: Key) -> Arc<Slot> {
        let mut slots = self.lock_slots();
        Arc::clone(
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Slot::new(key))),
        )
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<Key, Arc<Slot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
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
            .field("slots", &self.len())
            .finish()
    }
}

fn downcast<T>(instance: Instance, key: Key) -> Result<Arc<T>, RegistryError>
where
    T: Send + Sync + 'static,
{
    instance
        .downcast()
        .map_err(|_| RegistryError::WrongType { key })
}
