//! Type-keyed singleton bindings.

use crate::error::BoxError;

/// A concrete type that binds its own zero-argument constructor to its type
/// tag, giving exactly one shared instance per concrete type.
///
/// This is the per-variant flavour of the registry: several concrete variants
/// sharing one abstract interface each get their own singleton by binding
/// themselves with [`Registry::bind`](crate::Registry::bind). The shared base
/// stays unbound, so requesting it through
/// [`Registry::get_for_type`](crate::Registry::get_for_type) fails fast
/// instead of constructing something degraded.
///
/// The constructor must be fast, synchronous and in-process; the registry may
/// hold same-key callers waiting while it runs.
pub trait TypeKeyed: Send + Sync + Sized + 'static {
    /// Constructs the single instance for this type.
    ///
    /// Invoked at most once per registry, unless a previous invocation failed
    /// and a later caller retries.
    fn construct() -> Result<Self, BoxError>;
}
