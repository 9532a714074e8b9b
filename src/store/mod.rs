//! The dispatch engine and everything handed to module handlers.
//!
//! ```text
//! commit(type) ──→ mutations[type] ──→ state.update ──→ subscribers
//! dispatch(type) ──→ before hooks ──→ actions[type] ──→ after / error hooks
//! getters[type] ──→ cache(generation, version) ──→ getter fn
//! ```
//!
//! Registries are written only by the install pass and are swapped whole.

mod builder;
mod context;
mod engine;
mod install;
mod invocation;
mod registry;
mod subscription;

pub use builder::{Plugin, StoreBuilder};
pub use context::{ActionContext, GetterContext, Getters, LocalContext};
pub use engine::{RegisterOptions, Store, WatchHandle, WatchOptions};
pub use invocation::{ActionRecord, Call, CallOptions, Invocation, MutationRecord};
pub use subscription::{
    ActionSubscriber, ActionSubscriberBuilder, MutationSubscriber, SubscribeOptions, Subscription,
};
