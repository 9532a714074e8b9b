use std::sync::Arc;

use crate::config::StoreOptions;
use crate::devtools::Inspector;
use crate::error::StoreError;
use crate::module::{ModuleDef, ModuleTree};
use crate::reactive::{ChangeListener, DefaultReactivity, Reactivity};
use crate::store::engine::{Store, StoreInner};

/// Initialization callback run once with the constructed store.
pub trait Plugin: Send + Sync {
    fn install(&self, store: &Store);
}

impl<F> Plugin for F
where
    F: Fn(&Store) + Send + Sync,
{
    fn install(&self, store: &Store) {
        self(store)
    }
}

pub struct StoreBuilder {
    root: ModuleDef,
    options: StoreOptions,
    plugins: Vec<Box<dyn Plugin>>,
    inspector: Option<Arc<dyn Inspector>>,
    reactivity: Arc<dyn Reactivity>,
}

impl StoreBuilder {
    pub fn new(root: ModuleDef) -> Self {
        Self {
            root,
            options: StoreOptions::default(),
            plugins: Vec::new(),
            inspector: None,
            reactivity: Arc::new(DefaultReactivity),
        }
    }

    pub fn options(mut self, options: StoreOptions) -> Self {
        self.options = options;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    /// Plugins run in the order they are added.
    pub fn plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Notified of init, commits and action errors while
    /// `StoreOptions::devtools` is on.
    pub fn inspector(mut self, inspector: Arc<dyn Inspector>) -> Self {
        self.inspector = Some(inspector);
        self
    }

    pub fn reactivity(mut self, reactivity: Arc<dyn Reactivity>) -> Self {
        self.reactivity = reactivity;
        self
    }

    pub fn build(self) -> Result<Store, StoreError> {
        let tree = ModuleTree::new(self.root, self.options.assertions)?;
        let state = self.reactivity.wrap(tree.root().state().clone());
        let strict = self.options.strict;
        let inner = StoreInner::new(self.options, state, tree, self.inspector);

        inner.install_root(false);

        if strict {
            let store = inner.weak();
            let listener: ChangeListener = Arc::new(move |version| {
                if let Some(store) = store.upgrade() {
                    if !store.is_committing() {
                        store.report(StoreError::InvariantViolation { version });
                    }
                }
            });
            inner.state.on_change(listener);
        }

        let store = Store { inner };
        for plugin in &self.plugins {
            plugin.install(&store);
        }
        store.inner.on_init();

        tracing::debug!(
            strict,
            plugins = self.plugins.len(),
            getters = store.inner.registries().getters.len(),
            "store ready"
        );
        Ok(store)
    }
}
