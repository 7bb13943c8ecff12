//! Identity keys selecting a singleton slot.

use std::{
    any::{self, TypeId},
    borrow::Cow,
    fmt,
};

/// Identity selecting a singleton slot: a string name or a type tag.
///
/// Keys compare by value. Two name keys with equal strings select the same
/// slot, and [`Key::of::<T>()`](Key::of) selects one slot per concrete type
/// `T`. A key carries no behaviour of its own; it only picks the slot.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A string name supplied by the caller.
    Name(Cow<'static, str>),
    /// A type tag, used by type-keyed singletons.
    Type {
        /// Unique identifier of the type.
        id: TypeId,
        /// Human readable type name, kept for diagnostics.
        name: &'static str,
    },
}

impl Key {
    /// Creates a name key.
    pub fn name(name: impl Into<Cow<'static, str>>) -> Self {
        Key::Name(name.into())
    }

    /// Creates the type tag key for `T`.
    pub fn of<T: 'static>() -> Self {
        Key::Type {
            id: TypeId::of::<T>(),
            name: any::type_name::<T>(),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Key::Type { name, .. } => f.debug_tuple("Type").field(name).finish(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => write!(f, "{name}"),
            Key::Type { name, .. } => write!(f, "<{name}>"),
        }
    }
}

impl From<&'static str> for Key {
    fn from(name: &'static str) -> Self {
        Key::Name(Cow::Borrowed(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(Cow::Owned(name))
    }
}

impl From<Cow<'static, str>> for Key {
    fn from(name: Cow<'static, str>) -> Self {
        Key::Name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_keys_compare_by_value() {
        assert_eq!(Key::from("app.log"), Key::name(String::from("app.log")));
        assert_ne!(Key::from("app.log"), Key::from("admin.log"));
    }

    #[test]
    fn type_keys_are_per_type() {
        struct A;
        struct B;
        assert_eq!(Key::of::<A>(), Key::of::<A>());
        assert_ne!(Key::of::<A>(), Key::of::<B>());
        assert_ne!(Key::of::<A>(), Key::from("A"));
    }
}
