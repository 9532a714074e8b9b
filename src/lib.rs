//! Centralized, hierarchical state container.
//!
//! A [`Store`] owns one state tree built from nested [`ModuleDef`]s.
//! State changes go through synchronous mutations (`commit`); workflows
//! run as possibly-async actions (`dispatch`); derived values are cached
//! getters. Namespaced modules qualify their handler names with `key/`.

pub mod config;
pub mod demo;
pub mod devtools;
pub mod error;
pub mod helpers;
pub mod logging;
pub mod module;
pub mod plugins;
pub mod reactive;
pub mod store;

pub use config::StoreOptions;
pub use error::StoreError;
pub use module::{ActionDef, ModuleDef, ModulePath};
pub use store::{Store, StoreBuilder};
