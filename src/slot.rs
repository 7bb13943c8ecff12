//! Per-key lifecycle record and its construction gate.
//!
//! A slot moves `Empty -> Creating -> Ready` at most once per successful
//! construction and never leaves `Ready`. A failing factory moves it back to
//! `Empty` so a later caller may retry. The phase lock is per slot, so callers
//! for distinct keys never serialize each other, and it is released while the
//! factory runs; same-key racers park on the condvar instead.

use std::{
    any::Any,
    fmt,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
};

use crate::{
    error::{BoxError, RegistryError},
    key::Key,
};

/// A type-erased, shared singleton instance.
pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

/// A factory bound to a slot at registration time, for type-keyed slots.
pub(crate) type BoundFactory = Box<dyn Fn() -> Result<Instance, BoxError> + Send + Sync>;

enum Phase {
    /// No construction has run, or the last attempt failed.
    Empty,
    /// A caller is currently running the factory.
    Creating,
    /// Constructed; the instance is never replaced.
    Ready(Instance),
}

/// Per-key lifecycle record: construction phase, the instance once ready, and
/// an optionally bound factory.
pub(crate) struct Slot {
    key: Key,
    phase: Mutex<Phase>,
    cond: Condvar,
    factory: Option<BoundFactory>,
}

impl Slot {
    pub(crate) fn new(key: Key) -> Self {
        Slot {
            key,
            phase: Mutex::new(Phase::Empty),
            cond: Condvar::new(),
            factory: None,
        }
    }

    pub(crate) fn with_factory(key: Key, factory: BoundFactory) -> Self {
        Slot {
            key,
            phase: Mutex::new(Phase::Empty),
            cond: Condvar::new(),
            factory: Some(factory),
        }
    }

    pub(crate) fn bound_factory(&self) -> Option<&BoundFactory> {
        self.factory.as_ref()
    }

    /// Returns the stored instance if this slot is ready, without waiting and
    /// without triggering construction.
    pub(crate) fn ready_instance(&self) -> Option<Instance> {
        match &*self.lock_phase() {
            Phase::Ready(instance) => Some(Arc::clone(instance)),
            Phase::Empty | Phase::Creating => None,
        }
    }

    /// Returns the stored instance, running `factory` if this call wins the
    /// construction race.
    ///
    /// The returned flag is `true` when this call performed the construction.
    /// Blocks only while another caller is constructing this same slot.
    pub(crate) fn get_or_init<F>(&self, factory: F) -> Result<(Instance, bool), RegistryError>
    where
        F: FnOnce() -> Result<Instance, BoxError>,
    {
        let mut phase = self.lock_phase();
        loop {
            match &*phase {
                Phase::Ready(instance) => return Ok((Arc::clone(instance), false)),
                Phase::Creating => {
                    phase = self
                        .cond
                        .wait(phase)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Phase::Empty => break,
            }
        }
        *phase = Phase::Creating;
        drop(phase);

        // Run the factory without holding the phase lock. The guard restores
        // `Empty` and wakes waiters if the factory unwinds.
        let mut guard = RevertOnUnwind { slot: self, armed: true };
        let constructed = factory();
        guard.armed = false;
        drop(guard);

        let mut phase = self.lock_phase();
        match constructed {
            Ok(instance) => {
                *phase = Phase::Ready(Arc::clone(&instance));
                drop(phase);
                self.cond.notify_all();
                Ok((instance, true))
            }
            Err(source) => {
                *phase = Phase::Empty;
                drop(phase);
                self.cond.notify_all();
                Err(RegistryError::Construction {
                    key: self.key.clone(),
                    source,
                })
            }
        }
    }

    fn lock_phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct RevertOnUnwind<'a> {
    slot: &'a Slot,
    armed: bool,
}

impl Drop for RevertOnUnwind<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.slot.lock_phase() = Phase::Empty;
            self.slot.cond.notify_all();
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match &*self.lock_phase() {
            Phase::Empty => "Empty",
            Phase::Creating => "Creating",
            Phase::Ready(_) => "Ready",
        };
        f.debug_struct("Slot")
            .field("key", &self.key)
            .field("phase", &phase)
            .field("bound", &self.factory.is_some())
            .finish()
    }
}
