//! Observation capability the store depends on for change detection.
//!
//! The store never assumes a particular reactivity system. It is handed a
//! [`Reactivity`] factory at construction and only talks to the resulting
//! [`ObservableState`] handle:
//!
//! ```text
//! Reactivity::wrap(value) ──→ ObservableState
//!                                 │  set / update / replace  (writes, bump version)
//!                                 │  on_change               (sync listeners)
//!                                 └─ version                 (cache invalidation)
//! ```

mod observable;

pub use observable::{
    nested, nested_mut, ChangeListener, DefaultReactivity, ListenerId, ObservableState,
    Reactivity, VersionedState,
};
