//! Flat, namespace-qualified handler registries and the getter cache.

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use serde_json::Value;

use crate::module::{ActionFn, GetterFn, MutationFn};
use crate::store::context::LocalContext;

#[derive(Clone)]
pub(crate) struct WrappedMutation {
    pub(crate) handler: MutationFn,
    /// Path of the owning module; the handler receives the state found there.
    pub(crate) path: Vec<String>,
}

#[derive(Clone)]
pub(crate) struct WrappedAction {
    pub(crate) handler: ActionFn,
    pub(crate) context: LocalContext,
}

#[derive(Clone)]
pub(crate) struct WrappedGetter {
    pub(crate) getter: GetterFn,
    pub(crate) context: LocalContext,
}

/// Everything the install procedure writes. Rebuilt from scratch whenever
/// modules are removed or hot-swapped, then swapped in whole.
#[derive(Default, Clone)]
pub(crate) struct Registries {
    pub(crate) mutations: HashMap<String, Vec<WrappedMutation>>,
    pub(crate) actions: HashMap<String, Vec<WrappedAction>>,
    pub(crate) getters: BTreeMap<String, WrappedGetter>,
    /// Namespace string to the path of the module occupying it.
    pub(crate) namespaces: HashMap<String, Vec<String>>,
    pub(crate) generation: u64,
}

struct CachedValue {
    generation: u64,
    version: u64,
    value: Value,
}

/// Memoized getter results, keyed by fully-qualified name.
///
/// An entry is valid only for the registry generation and state version it
/// was computed at.
#[derive(Default)]
pub(crate) struct GetterCache {
    entries: Mutex<HashMap<String, CachedValue>>,
}

impl GetterCache {
    pub(crate) fn get(&self, kind: &str, generation: u64, version: u64) -> Option<Value> {
        let entries = self.entries.lock();
        entries
            .get(kind)
            .filter(|cached| cached.generation == generation && cached.version == version)
            .map(|cached| cached.value.clone())
    }

    pub(crate) fn insert(&self, kind: &str, generation: u64, version: u64, value: Value) {
        self.entries.lock().insert(
            kind.to_string(),
            CachedValue {
                generation,
                version,
                value,
            },
        );
    }

    pub(crate) fn clear(&self) {
        self.entries.lock().clear();
    }
}
