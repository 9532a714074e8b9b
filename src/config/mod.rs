//! Store configuration: options that can be loaded from a TOML file.

mod loader;
mod types;

pub use loader::ConfigError;
pub use types::StoreOptions;
