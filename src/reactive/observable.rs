use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

/// Callback invoked after every write with the new version number.
pub type ChangeListener = Arc<dyn Fn(u64) + Send + Sync>;

/// Identifies a registered change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A wrapped, observable state tree.
///
/// Every write increments [`version`](ObservableState::version) and then
/// notifies the change listeners synchronously, after internal locks are
/// released, so listeners may read the state again.
pub trait ObservableState: Send + Sync {
    /// Deep copy of the whole tree.
    fn snapshot(&self) -> Value;

    /// Deep copy of the subtree at `path`, if every key exists.
    fn read(&self, path: &[String]) -> Option<Value>;

    /// Set `key` on the object found at `path`.
    ///
    /// Returns false (and writes nothing) if `path` does not lead to an object.
    fn set(&self, path: &[String], key: &str, value: Value) -> bool;

    /// Remove `key` from the object found at `path`, returning the old value.
    fn remove(&self, path: &[String], key: &str) -> Option<Value>;

    /// Arbitrary in-place write over the whole tree.
    fn update(&self, f: &mut dyn FnMut(&mut Value));

    /// Wholesale replacement of the tree.
    fn replace(&self, value: Value);

    /// Monotonic write counter.
    fn version(&self) -> u64;

    fn on_change(&self, listener: ChangeListener) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}

/// Factory for observable state handles.
pub trait Reactivity: Send + Sync {
    fn wrap(&self, value: Value) -> Arc<dyn ObservableState>;
}

/// Produces [`VersionedState`] handles.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultReactivity;

impl Reactivity for DefaultReactivity {
    fn wrap(&self, value: Value) -> Arc<dyn ObservableState> {
        Arc::new(VersionedState::new(value))
    }
}

/// Lock-protected value with a version counter and push listeners.
pub struct VersionedState {
    value: RwLock<Value>,
    version: AtomicU64,
    listeners: Mutex<Vec<(ListenerId, ChangeListener)>>,
    next_listener: AtomicU64,
}

impl VersionedState {
    pub fn new(value: Value) -> Self {
        Self {
            value: RwLock::new(value),
            version: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        }
    }

    fn bump_and_notify(&self) {
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        // Copy first: a listener may add or remove listeners.
        let listeners: Vec<ChangeListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(version);
        }
    }
}

impl ObservableState for VersionedState {
    fn snapshot(&self) -> Value {
        self.value.read().clone()
    }

    fn read(&self, path: &[String]) -> Option<Value> {
        let guard = self.value.read();
        nested(&guard, path).cloned()
    }

    fn set(&self, path: &[String], key: &str, value: Value) -> bool {
        {
            let mut guard = self.value.write();
            let Some(Value::Object(map)) = nested_mut(&mut guard, path) else {
                return false;
            };
            map.insert(key.to_string(), value);
        }
        self.bump_and_notify();
        true
    }

    fn remove(&self, path: &[String], key: &str) -> Option<Value> {
        let removed = {
            let mut guard = self.value.write();
            match nested_mut(&mut guard, path) {
                Some(Value::Object(map)) => map.remove(key),
                _ => None,
            }
        };
        if removed.is_some() {
            self.bump_and_notify();
        }
        removed
    }

    fn update(&self, f: &mut dyn FnMut(&mut Value)) {
        {
            let mut guard = self.value.write();
            f(&mut guard);
        }
        self.bump_and_notify();
    }

    fn replace(&self, value: Value) {
        *self.value.write() = value;
        self.bump_and_notify();
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn on_change(&self, listener: ChangeListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.lock().retain(|(existing, _)| *existing != id);
    }
}

/// Walk `root` through object keys.
pub fn nested<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(root, |value, key| value.get(key.as_str()))
}

/// Mutable variant of [`nested`].
pub fn nested_mut<'a>(root: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    path.iter()
        .try_fold(root, |value, key| value.get_mut(key.as_str()))
}
