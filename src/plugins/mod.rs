//! Plugins shipped with the crate.

mod logger;

pub use logger::LoggerPlugin;
