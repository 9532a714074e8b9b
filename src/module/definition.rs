//! User-facing module definitions.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;

use crate::error::StoreError;
use crate::store::{ActionContext, GetterContext};

/// Synchronous state transition: `(local_state, payload)`.
pub type MutationFn = Arc<dyn Fn(&mut Value, &Value) + Send + Sync>;

/// Derived read-only view over local and root state.
pub type GetterFn = Arc<dyn Fn(&GetterContext<'_>) -> Value + Send + Sync>;

/// Eventual outcome of an action handler or of a whole dispatch.
pub type ActionFuture = BoxFuture<'static, anyhow::Result<Value>>;

/// Possibly-asynchronous workflow: `(context, payload) -> future`.
pub type ActionFn = Arc<dyn Fn(ActionContext, Value) -> ActionFuture + Send + Sync>;

/// Where a module's initial state comes from.
#[derive(Clone)]
pub enum StateSource {
    Value(Value),
    /// Evaluated once per registration, so one definition can back several
    /// stores without sharing state.
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl StateSource {
    pub fn produce(&self) -> Value {
        match self {
            StateSource::Value(value) => value.clone(),
            StateSource::Factory(factory) => factory(),
        }
    }
}

/// An action handler plus its registration flags.
#[derive(Clone)]
pub struct ActionDef {
    handler: ActionFn,
    root: bool,
}

impl ActionDef {
    /// Wrap an async handler.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(ActionContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |ctx, payload| handler(ctx, payload).boxed()),
            root: false,
        }
    }

    /// Wrap a handler whose result is available immediately; it is treated
    /// as an already-fulfilled future.
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(ActionContext, Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(move |ctx, payload| future::ready(handler(ctx, payload)).boxed()),
            root: false,
        }
    }

    /// Register under the bare local name even inside a namespaced module.
    pub fn root(mut self, root: bool) -> Self {
        self.root = root;
        self
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn handler(&self) -> &ActionFn {
        &self.handler
    }
}

/// Raw definition bundle for one module and, recursively, its children.
///
/// Handler maps stay `None` until something is added, so a hot update can
/// tell "not provided" apart from "provided and empty".
#[derive(Clone, Default)]
pub struct ModuleDef {
    pub(crate) state: Option<StateSource>,
    pub(crate) namespaced: bool,
    pub(crate) mutations: Option<BTreeMap<String, MutationFn>>,
    pub(crate) actions: Option<BTreeMap<String, ActionDef>>,
    pub(crate) getters: Option<BTreeMap<String, GetterFn>>,
    pub(crate) modules: Option<BTreeMap<String, ModuleDef>>,
}

impl ModuleDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: Value) -> Self {
        self.state = Some(StateSource::Value(state));
        self
    }

    pub fn state_fn<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.state = Some(StateSource::Factory(Arc::new(factory)));
        self
    }

    pub fn namespaced(mut self, namespaced: bool) -> Self {
        self.namespaced = namespaced;
        self
    }

    pub fn mutation<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut Value, &Value) + Send + Sync + 'static,
    {
        self.mutations
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), Arc::new(handler));
        self
    }

    pub fn action(mut self, name: impl Into<String>, action: ActionDef) -> Self {
        self.actions
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), action);
        self
    }

    pub fn getter<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&GetterContext<'_>) -> Value + Send + Sync + 'static,
    {
        self.getters
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), Arc::new(getter));
        self
    }

    pub fn module(mut self, key: impl Into<String>, module: ModuleDef) -> Self {
        self.modules
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), module);
        self
    }

    /// Shape check for this module's own entries (children are checked as
    /// they are registered).
    pub fn validate(&self, path: &[String]) -> Result<(), StoreError> {
        let invalid = |reason: String| StoreError::InvalidModuleDefinition {
            path: path.join("."),
            reason,
        };

        let handler_names = self
            .mutations
            .iter()
            .flat_map(|m| m.keys().map(|k| ("mutations", k)))
            .chain(self.actions.iter().flat_map(|m| m.keys().map(|k| ("actions", k))))
            .chain(self.getters.iter().flat_map(|m| m.keys().map(|k| ("getters", k))));
        for (group, name) in handler_names {
            if name.trim().is_empty() {
                return Err(invalid(format!("{} should have a non-empty name", group)));
            }
        }

        if let Some(modules) = &self.modules {
            if modules.keys().any(|key| key.trim().is_empty()) {
                return Err(invalid("modules should have non-empty keys".to_string()));
            }
        }

        if let Some(StateSource::Value(value)) = &self.state {
            if !value.is_object() {
                return Err(invalid(format!("state should be an object but is {}", value)));
            }
        }

        Ok(())
    }
}
