use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::module::definition::{ActionDef, GetterFn, ModuleDef, MutationFn};
use crate::store::LocalContext;

/// One installed node of the state tree.
pub struct Module {
    raw: ModuleDef,
    state: Value,
    children: BTreeMap<String, Module>,
    runtime: bool,
    context: Option<LocalContext>,
}

impl Module {
    /// Build a node from its definition. The state producer, if any, is
    /// evaluated here exactly once. Child definitions are left to the
    /// caller (see `ModuleTree::register`).
    pub fn new(mut raw: ModuleDef, runtime: bool) -> Self {
        raw.modules = None;
        let state = raw
            .state
            .as_ref()
            .map(|source| source.produce())
            .filter(|value| !value.is_null())
            .unwrap_or_else(|| Value::Object(Map::new()));
        Self {
            raw,
            state,
            children: BTreeMap::new(),
            runtime,
            context: None,
        }
    }

    pub fn namespaced(&self) -> bool {
        self.raw.namespaced
    }

    pub fn runtime(&self) -> bool {
        self.runtime
    }

    /// The module's own initial state, as produced at construction.
    pub fn state(&self) -> &Value {
        &self.state
    }

    pub fn add_child(&mut self, key: String, module: Module) {
        self.children.insert(key, module);
    }

    pub fn remove_child(&mut self, key: &str) -> Option<Module> {
        self.children.remove(key)
    }

    pub fn get_child(&self, key: &str) -> Option<&Module> {
        self.children.get(key)
    }

    pub fn get_child_mut(&mut self, key: &str) -> Option<&mut Module> {
        self.children.get_mut(key)
    }

    pub fn has_child(&self, key: &str) -> bool {
        self.children.contains_key(key)
    }

    pub fn child_keys(&self) -> Vec<String> {
        self.children.keys().cloned().collect()
    }

    /// Merge hot-reloaded handlers. State is never touched; handler groups
    /// absent from `raw` keep their current definitions.
    pub fn update(&mut self, raw: &ModuleDef) {
        self.raw.namespaced = raw.namespaced;
        if let Some(actions) = &raw.actions {
            self.raw.actions = Some(actions.clone());
        }
        if let Some(mutations) = &raw.mutations {
            self.raw.mutations = Some(mutations.clone());
        }
        if let Some(getters) = &raw.getters {
            self.raw.getters = Some(getters.clone());
        }
    }

    pub fn mutations(&self) -> impl Iterator<Item = (&String, &MutationFn)> {
        self.raw.mutations.iter().flatten()
    }

    pub fn actions(&self) -> impl Iterator<Item = (&String, &ActionDef)> {
        self.raw.actions.iter().flatten()
    }

    pub fn getters(&self) -> impl Iterator<Item = (&String, &GetterFn)> {
        self.raw.getters.iter().flatten()
    }

    /// Local context built by the most recent install pass.
    pub fn context(&self) -> Option<&LocalContext> {
        self.context.as_ref()
    }

    pub(crate) fn set_context(&mut self, context: LocalContext) {
        self.context = Some(context);
    }
}
