//! The module tree: raw module definitions, installed modules and the
//! rooted tree that resolves paths and namespaces.
//!
//! ```text
//! ModuleDef (user bundle) ──register──→ Module ──children──→ Module …
//!                                          ↑
//!                              ModuleTree { root }
//! ```

mod definition;
mod module;
mod tree;

pub use definition::{
    ActionDef, ActionFn, ActionFuture, GetterFn, ModuleDef, MutationFn, StateSource,
};
pub use module::Module;
pub use tree::{ModulePath, ModuleTree};
