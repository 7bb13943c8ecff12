//! Settings singleton populated with declared defaults.
//!
//! The canonical eager-initialized resource: a mapping from setting name to a
//! value of a small closed set of kinds, constructed at bootstrap with its
//! defaults and mutated later through [`Settings::set`]. The instance guards
//! its own map with a [`RwLock`], so a shared `Arc<Settings>` supports
//! concurrent readers and writers without help from the registry.

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A setting value: string, number or boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// String value.
    Str(Cow<'static, str>),
    /// Numeric value.
    Num(f64),
    /// Boolean value.
    Bool(bool),
}

impl SettingValue {
    /// The string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Str(value) => Some(value),
            _ => None,
        }
    }

    /// The numeric value, if this is a number.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            SettingValue::Num(value) => Some(*value),
            _ => None,
        }
    }

    /// The boolean value, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Str(value) => write!(f, "{value}"),
            SettingValue::Num(value) => write!(f, "{value}"),
            SettingValue::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&'static str> for SettingValue {
    fn from(value: &'static str) -> Self {
        SettingValue::Str(Cow::Borrowed(value))
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::Str(Cow::Owned(value))
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Num(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Num(value as f64)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        SettingValue::Num(value.into())
    }
}

impl From<u32> for SettingValue {
    fn from(value: u32) -> Self {
        SettingValue::Num(value.into())
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

/// A settings map with a declared default set.
///
/// Keys present in the defaults are the declared settings; [`Settings::set`]
/// accepts any key, but introducing one outside the declared set is logged as
/// a warning so overrides of known settings stay distinguishable from
/// undeclared additions.
pub struct Settings {
    values: RwLock<BTreeMap<String, SettingValue>>,
    declared: BTreeSet<String>,
}

impl Settings {
    /// Creates a settings instance from its declared defaults.
    ///
    /// # Example
    ///
    /// ```
    /// use oncemap::Settings;
    ///
    /// let settings = Settings::with_defaults([
    ///     ("apiUrl", "https://api.example.com".into()),
    ///     ("timeout", 5000.into()),
    ///     ("debug", false.into()),
    /// ]);
    /// assert_eq!(settings.get("timeout").and_then(|v| v.as_num()), Some(5000.0));
    /// ```
    pub fn with_defaults<I, K>(defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, SettingValue)>,
        K: Into<String>,
    {
        let values: BTreeMap<String, SettingValue> = defaults
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();
        let declared = values.keys().cloned().collect();
        Settings {
            values: RwLock::new(values),
            declared,
        }
    }

    /// Inserts or updates a setting, chainable.
    ///
    /// Setting a key outside the declared default set is accepted but warned
    /// about; it is never an error.
    pub fn set(&self, key: impl Into<String>, value: impl Into<SettingValue>) -> &Self {
        let key = key.into();
        if !self.declared.contains(&key) {
            warn!(%key, "introducing undeclared setting key after initialization");
        }
        self.write().insert(key, value.into());
        self
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.read().get(key).cloned()
    }

    /// Returns `true` if `key` has a value.
    pub fn has(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// A snapshot of all settings.
    pub fn get_all(&self) -> BTreeMap<String, SettingValue> {
        self.read().clone()
    }

    /// Returns `true` if `key` was part of the declared defaults.
    pub fn is_declared(&self, key: &str) -> bool {
        self.declared.contains(key)
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, SettingValue>> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, SettingValue>> {
        self.values.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("values", &*self.read())
            .field("declared", &self.declared)
            .finish()
    }
}
