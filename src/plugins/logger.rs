use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::store::{MutationRecord, Plugin, Store};

type MutationFilter = dyn Fn(&MutationRecord, &Value, &Value) -> bool + Send + Sync;

/// Logs every commit (with the state before and after) and every dispatch
/// through `tracing` at info level.
pub struct LoggerPlugin {
    collapsed: bool,
    log_mutations: bool,
    log_actions: bool,
    filter: Option<Arc<MutationFilter>>,
}

impl Default for LoggerPlugin {
    fn default() -> Self {
        Self {
            collapsed: false,
            log_mutations: true,
            log_actions: true,
            filter: None,
        }
    }
}

impl LoggerPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log only type and payload, without the state pair.
    pub fn collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }

    pub fn log_mutations(mut self, enabled: bool) -> Self {
        self.log_mutations = enabled;
        self
    }

    pub fn log_actions(mut self, enabled: bool) -> Self {
        self.log_actions = enabled;
        self
    }

    /// Skip mutations for which `filter(mutation, prev, next)` is false.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&MutationRecord, &Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }
}

impl Plugin for LoggerPlugin {
    fn install(&self, store: &Store) {
        if self.log_mutations {
            let previous = Mutex::new(store.state());
            let collapsed = self.collapsed;
            let filter = self.filter.clone();
            // Dropping a Subscription does not unsubscribe.
            store.subscribe(move |mutation, next| {
                let prev = std::mem::replace(&mut *previous.lock(), next.clone());
                if let Some(filter) = &filter {
                    if !filter(mutation, &prev, next) {
                        return;
                    }
                }
                if collapsed {
                    tracing::info!(kind = %mutation.kind, payload = %mutation.payload, "mutation");
                } else {
                    tracing::info!(
                        kind = %mutation.kind,
                        payload = %mutation.payload,
                        prev_state = %prev,
                        next_state = %next,
                        "mutation"
                    );
                }
            });
        }

        if self.log_actions {
            store.subscribe_action(|action, _state| {
                tracing::info!(kind = %action.kind, payload = %action.payload, "action");
                Ok(())
            });
        }
    }
}
