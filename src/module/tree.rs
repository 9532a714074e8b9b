use crate::error::StoreError;
use crate::module::definition::ModuleDef;
use crate::module::module::Module;

/// Ordered sequence of child keys from the root to a module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ModulePath(Vec<String>);

impl ModulePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn keys(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ModulePath {
    fn from(key: &str) -> Self {
        Self(vec![key.to_string()])
    }
}

impl From<String> for ModulePath {
    fn from(key: String) -> Self {
        Self(vec![key])
    }
}

impl From<&[&str]> for ModulePath {
    fn from(keys: &[&str]) -> Self {
        Self(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ModulePath {
    fn from(keys: [&str; N]) -> Self {
        Self(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl From<Vec<String>> for ModulePath {
    fn from(keys: Vec<String>) -> Self {
        Self(keys)
    }
}

impl From<&[String]> for ModulePath {
    fn from(keys: &[String]) -> Self {
        Self(keys.to_vec())
    }
}

/// Owns the rooted tree of modules.
pub struct ModuleTree {
    root: Module,
    assertions: bool,
}

impl ModuleTree {
    /// Build the tree from the root definition. Statically declared
    /// modules are never `runtime`.
    pub fn new(raw_root: ModuleDef, assertions: bool) -> Result<Self, StoreError> {
        let root = build(&[], raw_root, false, assertions)?;
        Ok(Self { root, assertions })
    }

    pub fn root(&self) -> &Module {
        &self.root
    }

    pub fn get(&self, path: &[String]) -> Option<&Module> {
        path.iter()
            .try_fold(&self.root, |module, key| module.get_child(key))
    }

    pub fn get_mut(&mut self, path: &[String]) -> Option<&mut Module> {
        path.iter()
            .try_fold(&mut self.root, |module, key| module.get_child_mut(key))
    }

    /// Concatenate `key/` for every namespaced module along `path`.
    /// The walk stops at the first missing key.
    pub fn namespace(&self, path: &[String]) -> String {
        let mut module = &self.root;
        let mut namespace = String::new();
        for key in path {
            let Some(child) = module.get_child(key) else {
                break;
            };
            if child.namespaced() {
                namespace.push_str(key);
                namespace.push('/');
            }
            module = child;
        }
        namespace
    }

    /// Attach `raw` (and its nested modules) at a non-empty `path`.
    ///
    /// The whole subtree is built and validated before anything is
    /// attached, so a failure leaves the tree unchanged.
    pub fn register(
        &mut self,
        path: &[String],
        raw: ModuleDef,
        runtime: bool,
    ) -> Result<(), StoreError> {
        let Some((key, parent_path)) = path.split_last() else {
            return Err(StoreError::RootRegistration);
        };
        let assertions = self.assertions;
        let parent = self
            .get_mut(parent_path)
            .ok_or_else(|| StoreError::ModuleNotFound {
                path: parent_path.join("/"),
            })?;
        let module = build(path, raw, runtime, assertions)?;
        parent.add_child(key.clone(), module);
        Ok(())
    }

    /// Detach a runtime module. Returns whether anything was removed;
    /// statically declared modules stay registered.
    pub fn unregister(&mut self, path: &[String]) -> bool {
        let Some((key, parent_path)) = path.split_last() else {
            return false;
        };
        let Some(parent) = self.get_mut(parent_path) else {
            tracing::warn!(path = %path.join("/"), "trying to unregister module under a missing parent");
            return false;
        };
        let Some(child) = parent.get_child(key) else {
            tracing::warn!(module = %key, "trying to unregister module which is not registered");
            return false;
        };
        if !child.runtime() {
            tracing::debug!(module = %key, "ignoring unregister of statically declared module");
            return false;
        }
        parent.remove_child(key).is_some()
    }

    pub fn is_registered(&self, path: &[String]) -> bool {
        match path.split_last() {
            None => true,
            Some((key, parent_path)) => self
                .get(parent_path)
                .map(|parent| parent.has_child(key))
                .unwrap_or(false),
        }
    }

    /// Merge hot-reloaded handler definitions along matching paths.
    ///
    /// A module present in `raw_root` but missing from the tree aborts the
    /// walk. Merges applied before that point are kept.
    pub fn update(&mut self, raw_root: &ModuleDef) -> Result<(), StoreError> {
        let assertions = self.assertions;
        update(&[], &mut self.root, raw_root, assertions)
    }
}

fn build(
    path: &[String],
    mut raw: ModuleDef,
    runtime: bool,
    assertions: bool,
) -> Result<Module, StoreError> {
    if assertions {
        raw.validate(path)?;
    }
    let children = raw.modules.take().unwrap_or_default();
    let mut module = Module::new(raw, runtime);
    if assertions && !module.state().is_object() {
        return Err(StoreError::InvalidModuleDefinition {
            path: path.join("."),
            reason: format!("state should be an object but is {}", module.state()),
        });
    }

    for (key, child) in children {
        let mut child_path = path.to_vec();
        child_path.push(key.clone());
        module.add_child(key, build(&child_path, child, runtime, assertions)?);
    }
    Ok(module)
}

fn update(
    path: &[String],
    target: &mut Module,
    raw: &ModuleDef,
    assertions: bool,
) -> Result<(), StoreError> {
    if assertions {
        raw.validate(path)?;
    }
    target.update(raw);

    for (key, child_raw) in raw.modules.iter().flatten() {
        let Some(child) = target.get_child_mut(key) else {
            return Err(StoreError::HotReloadNewModule { key: key.clone() });
        };
        let mut child_path = path.to_vec();
        child_path.push(key.clone());
        update(&child_path, child, child_raw, assertions)?;
    }
    Ok(())
}
