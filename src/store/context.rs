//! Namespace-scoped views handed to a module's own handlers.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use futures::future::{self, FutureExt};
use serde_json::Value;

use crate::error::StoreError;
use crate::module::ActionFuture;
use crate::store::engine::{Store, StoreInner};
use crate::store::invocation::{CallOptions, Invocation};

/// Bound `commit`/`dispatch`/`getters`/`state` for one installed module.
///
/// Holds only a weak reference to the store; once the store is dropped
/// every call becomes a no-op.
#[derive(Clone)]
pub struct LocalContext {
    store: Weak<StoreInner>,
    namespace: String,
    path: Vec<String>,
}

impl LocalContext {
    pub(crate) fn new(store: Weak<StoreInner>, namespace: String, path: Vec<String>) -> Self {
        Self {
            store,
            namespace,
            path,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Current state of this module, walked from the live root state on
    /// every call. `Null` if the module's state slot is gone.
    pub fn state(&self) -> Value {
        self.store
            .upgrade()
            .and_then(|store| store.state.read(&self.path))
            .unwrap_or(Value::Null)
    }

    pub fn commit(&self, invocation: impl Into<Invocation>) {
        self.commit_with(invocation, CallOptions::default())
    }

    /// Commit relative to this module's namespace unless `options.root`.
    pub fn commit_with(&self, invocation: impl Into<Invocation>, options: CallOptions) {
        let Some(store) = self.store.upgrade() else {
            return;
        };
        let Some(mut call) = store.normalize(invocation.into()) else {
            return;
        };
        if !self.namespace.is_empty() && !options.root {
            let kind = format!("{}{}", self.namespace, call.kind);
            if !store.registries().mutations.contains_key(&kind) {
                tracing::error!(local = %call.kind, global = %kind, "unknown local mutation type");
                store.report(StoreError::UnknownMutation { kind });
                return;
            }
            call.kind = kind;
        }
        store.commit_call(call);
    }

    pub fn dispatch(&self, invocation: impl Into<Invocation>) -> ActionFuture {
        self.dispatch_with(invocation, CallOptions::default())
    }

    /// Dispatch relative to this module's namespace unless `options.root`.
    pub fn dispatch_with(&self, invocation: impl Into<Invocation>, options: CallOptions) -> ActionFuture {
        let Some(store) = self.store.upgrade() else {
            return future::ready(Ok(Value::Null)).boxed();
        };
        let Some(mut call) = store.normalize(invocation.into()) else {
            return future::ready(Ok(Value::Null)).boxed();
        };
        if !self.namespace.is_empty() && !options.root {
            let kind = format!("{}{}", self.namespace, call.kind);
            if !store.registries().actions.contains_key(&kind) {
                tracing::error!(local = %call.kind, global = %kind, "unknown local action type");
                store.report(StoreError::UnknownAction { kind });
                return future::ready(Ok(Value::Null)).boxed();
            }
            call.kind = kind;
        }
        store.dispatch_call(call)
    }

    /// Getters visible to this module: all of them when it has no
    /// namespace, otherwise the cached local view.
    pub fn getters(&self) -> Getters {
        match self.store.upgrade() {
            Some(store) if !self.namespace.is_empty() => store.local_getters(&self.namespace),
            _ => Getters::root(self.store.clone()),
        }
    }
}

struct LocalScope {
    namespace: String,
    /// Local (namespace-stripped) name to fully-qualified name.
    names: BTreeMap<String, String>,
}

/// Read access to getters, either the full root set or one namespace's
/// getters under their local names.
#[derive(Clone)]
pub struct Getters {
    store: Weak<StoreInner>,
    scope: Option<Arc<LocalScope>>,
}

impl Getters {
    pub(crate) fn root(store: Weak<StoreInner>) -> Self {
        Self { store, scope: None }
    }

    /// Proxy exposing the getters whose fully-qualified name starts with
    /// `namespace`, keyed by the remainder.
    pub(crate) fn local<'a>(
        store: Weak<StoreInner>,
        namespace: &str,
        qualified: impl Iterator<Item = &'a String>,
    ) -> Self {
        let names = qualified
            .filter_map(|kind| {
                kind.strip_prefix(namespace)
                    .map(|local| (local.to_string(), kind.clone()))
            })
            .collect();
        Self {
            store,
            scope: Some(Arc::new(LocalScope {
                namespace: namespace.to_string(),
                names,
            })),
        }
    }

    /// Evaluate (or read the cached value of) a getter.
    pub fn get(&self, name: &str) -> Option<Value> {
        let store = self.store.upgrade()?;
        match &self.scope {
            None => store.evaluate_getter(name),
            Some(scope) => match scope.names.get(name) {
                Some(kind) => store.evaluate_getter(kind),
                None => {
                    store.report(StoreError::UnknownGetter {
                        kind: format!("{}{}", scope.namespace, name),
                    });
                    None
                }
            },
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        match &self.scope {
            Some(scope) => scope.names.contains_key(name),
            None => self
                .store
                .upgrade()
                .map(|store| store.registries().getters.contains_key(name))
                .unwrap_or(false),
        }
    }

    /// Visible getter names, sorted.
    pub fn keys(&self) -> Vec<String> {
        match &self.scope {
            Some(scope) => scope.names.keys().cloned().collect(),
            None => self
                .store
                .upgrade()
                .map(|store| store.registries().getters.keys().cloned().collect())
                .unwrap_or_default(),
        }
    }
}

/// Arguments handed to a getter function.
pub struct GetterContext<'a> {
    pub state: &'a Value,
    pub getters: &'a Getters,
    pub root_state: &'a Value,
    pub root_getters: &'a Getters,
}

/// Context handed to an action handler. Keeps the store alive for as long
/// as the action runs.
#[derive(Clone)]
pub struct ActionContext {
    local: LocalContext,
    store: Store,
}

impl ActionContext {
    pub(crate) fn new(local: LocalContext, store: Store) -> Self {
        Self { local, store }
    }

    pub fn state(&self) -> Value {
        self.local.state()
    }

    pub fn getters(&self) -> Getters {
        self.local.getters()
    }

    pub fn root_state(&self) -> Value {
        self.store.state()
    }

    pub fn root_getters(&self) -> Getters {
        self.store.getters()
    }

    pub fn commit(&self, invocation: impl Into<Invocation>) {
        self.local.commit(invocation)
    }

    pub fn commit_with(&self, invocation: impl Into<Invocation>, options: CallOptions) {
        self.local.commit_with(invocation, options)
    }

    pub fn dispatch(&self, invocation: impl Into<Invocation>) -> ActionFuture {
        self.local.dispatch(invocation)
    }

    pub fn dispatch_with(&self, invocation: impl Into<Invocation>, options: CallOptions) -> ActionFuture {
        self.local.dispatch_with(invocation, options)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}
