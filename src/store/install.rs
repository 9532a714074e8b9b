//! Top-down wiring of a module subtree into the flat registries.

use serde_json::Value;

use crate::error::StoreError;
use crate::module::ModuleTree;
use crate::store::context::LocalContext;
use crate::store::engine::StoreInner;
use crate::store::registry::{Registries, WrappedAction, WrappedGetter, WrappedMutation};

/// A child state slot to attach once the tree lock is released.
pub(crate) struct StateAttachment {
    pub(crate) parent: Vec<String>,
    pub(crate) key: String,
    pub(crate) state: Value,
    pub(crate) preserve: bool,
}

/// Pass-wide settings for one install walk.
pub(crate) struct InstallPass<'a> {
    pub(crate) store: &'a StoreInner,
    pub(crate) registries: &'a mut Registries,
    /// Hot passes rebuild handlers only; state slots are left alone.
    pub(crate) hot: bool,
    pub(crate) preserve_state: bool,
    /// Only modules at or below this path get their state attached.
    pub(crate) fresh: Vec<String>,
    pub(crate) attachments: Vec<StateAttachment>,
}

impl<'a> InstallPass<'a> {
    pub(crate) fn new(store: &'a StoreInner, registries: &'a mut Registries, hot: bool) -> Self {
        Self {
            store,
            registries,
            hot,
            preserve_state: false,
            fresh: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub(crate) fn preserve_state(mut self, preserve_state: bool) -> Self {
        self.preserve_state = preserve_state;
        self
    }

    pub(crate) fn fresh_under(mut self, path: &[String]) -> Self {
        self.fresh = path.to_vec();
        self
    }

    /// Install the module at `path` and everything below it.
    pub(crate) fn install(&mut self, tree: &mut ModuleTree, path: &[String]) {
        let namespace = tree.namespace(path);
        let Some(module) = tree.get(path) else {
            tracing::warn!(path = %path.join("/"), "install skipped, module not in tree");
            return;
        };

        if module.namespaced() {
            if let Some(existing) = self.registries.namespaces.get(&namespace) {
                if existing.as_slice() != path {
                    self.store.report(StoreError::DuplicateNamespace {
                        namespace: namespace.clone(),
                        path: path.join("/"),
                    });
                }
            }
            self.registries
                .namespaces
                .insert(namespace.clone(), path.to_vec());
        }

        if let Some((key, parent)) = path.split_last() {
            if !self.hot && path.starts_with(&self.fresh) {
                self.attachments.push(StateAttachment {
                    parent: parent.to_vec(),
                    key: key.clone(),
                    state: module.state().clone(),
                    preserve: self.preserve_state,
                });
            }
        }

        let context = LocalContext::new(self.store.weak(), namespace.clone(), path.to_vec());

        for (name, handler) in module.mutations() {
            self.registries
                .mutations
                .entry(format!("{}{}", namespace, name))
                .or_default()
                .push(WrappedMutation {
                    handler: handler.clone(),
                    path: path.to_vec(),
                });
        }

        for (name, action) in module.actions() {
            let kind = if action.is_root() {
                name.clone()
            } else {
                format!("{}{}", namespace, name)
            };
            self.registries
                .actions
                .entry(kind)
                .or_default()
                .push(WrappedAction {
                    handler: action.handler().clone(),
                    context: context.clone(),
                });
        }

        for (name, getter) in module.getters() {
            let kind = format!("{}{}", namespace, name);
            if self.registries.getters.contains_key(&kind) {
                self.store.report(StoreError::DuplicateGetterKey { kind });
                continue;
            }
            self.registries.getters.insert(
                kind,
                WrappedGetter {
                    getter: getter.clone(),
                    context: context.clone(),
                },
            );
        }

        let children = module.child_keys();
        if let Some(module) = tree.get_mut(path) {
            module.set_context(context);
        }

        for key in children {
            let mut child_path = path.to_vec();
            child_path.push(key);
            self.install(tree, &child_path);
        }
    }
}
