#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]
#![deny(unused_must_use)]

pub mod eager;
pub mod error;
pub mod key;
pub mod registry;
pub mod settings;
mod slot;
pub mod typed;

pub use eager::EagerInit;
pub use error::{BoxError, RegistryError};
pub use key::Key;
pub use registry::{registry, Registry};
pub use settings::{SettingValue, Settings};
pub use typed::TypeKeyed;
