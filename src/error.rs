//! Error types for registry operations.
//!
//! Construction failures propagate synchronously to the caller that triggered
//! construction, and only to that caller. Soft conditions such as discarded
//! construction arguments or an undeclared setting key are logged rather than
//! raised; they never appear here.

use std::{error, fmt};

use crate::key::Key;

/// A dyn boxed error.
pub type BoxError = Box<dyn error::Error + Send + Sync + 'static>;

/// Error that can occur when resolving a singleton through the registry.
#[derive(Debug)]
pub enum RegistryError {
    /// The bound factory returned an error.
    ///
    /// The slot was reverted to empty, so a later call for the same key may
    /// retry construction.
    Construction {
        /// Key whose factory failed.
        key: Key,
        /// Error returned by the factory.
        source: BoxError,
    },
    /// A type-keyed request for a type that never bound a factory.
    ///
    /// This is the shared-abstract-base case: only concrete variants bind
    /// constructors, so asking for the base itself fails rather than handing
    /// back a degraded instance.
    UnboundType {
        /// Name of the requested type.
        type_name: &'static str,
    },
    /// The slot holds an instance of a different type than requested.
    WrongType {
        /// Key of the offending slot.
        key: Key,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Construction { key, source } => {
                write!(f, "construction failed for key '{key}': {source}")
            }
            RegistryError::UnboundType { type_name } => {
                write!(f, "no factory bound for type '{type_name}'")
            }
            RegistryError::WrongType { key } => {
                write!(f, "instance for key '{key}' has a different type")
            }
        }
    }
}

impl error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            RegistryError::Construction { source, .. } => Some(source.as_ref()),
            RegistryError::UnboundType { .. } | RegistryError::WrongType { .. } => None,
        }
    }
}
