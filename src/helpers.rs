//! Namespace-bound accessors for code outside the module tree.

use std::collections::BTreeMap;

use futures::future::{self, FutureExt};
use serde_json::Value;

use crate::error::StoreError;
use crate::module::ActionFuture;
use crate::store::{Getters, LocalContext, Store};

/// State, getters, mutations and actions of one namespace, addressed by
/// their local names.
///
/// An unknown namespace is reported on each access and yields `Null`
/// values (or a no-op commit/dispatch).
pub struct NamespacedHelpers {
    store: Store,
    namespace: String,
}

impl Store {
    /// Helpers bound to `namespace`. A missing trailing `/` is added.
    pub fn namespaced_helpers(&self, namespace: &str) -> NamespacedHelpers {
        let mut namespace = namespace.to_string();
        if !namespace.is_empty() && !namespace.ends_with('/') {
            namespace.push('/');
        }
        NamespacedHelpers {
            store: self.clone(),
            namespace,
        }
    }
}

impl NamespacedHelpers {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn context(&self) -> Option<LocalContext> {
        let context = self.store.module_context(&self.namespace);
        if context.is_none() {
            self.store.inner.report(StoreError::ModuleNotFound {
                path: self.namespace.clone(),
            });
        }
        context
    }

    /// Read the given keys of the module's local state.
    pub fn map_state(&self, keys: &[&str]) -> BTreeMap<String, Value> {
        let state = self
            .context()
            .map(|context| context.state())
            .unwrap_or(Value::Null);
        keys.iter()
            .map(|key| {
                let value = state.get(*key).cloned().unwrap_or(Value::Null);
                (key.to_string(), value)
            })
            .collect()
    }

    /// Compute a value from the module's local state and getters.
    pub fn map_state_with<F>(&self, f: F) -> Value
    where
        F: FnOnce(&Value, &Getters) -> Value,
    {
        match self.context() {
            Some(context) => f(&context.state(), &context.getters()),
            None => Value::Null,
        }
    }

    /// Evaluate the given getters by local name.
    pub fn map_getters(&self, names: &[&str]) -> BTreeMap<String, Value> {
        let getters = self.context().map(|context| context.getters());
        names
            .iter()
            .map(|name| {
                let value = getters
                    .as_ref()
                    .and_then(|getters| getters.get(name))
                    .unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect()
    }

    pub fn commit(&self, kind: &str, payload: Value) {
        if let Some(context) = self.context() {
            context.commit((kind, payload));
        }
    }

    pub fn dispatch(&self, kind: &str, payload: Value) -> ActionFuture {
        match self.context() {
            Some(context) => context.dispatch((kind, payload)),
            None => future::ready(Ok(Value::Null)).boxed(),
        }
    }
}
