//! Subscriber lists with copy-on-iterate notification.
//!
//! Notification always walks a snapshot of the list, so a subscriber that
//! unsubscribes itself (or adds another) does not perturb the ongoing pass.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;

use crate::store::invocation::{ActionRecord, MutationRecord};

pub(crate) type MutationHook = dyn Fn(&MutationRecord, &Value) + Send + Sync;
pub(crate) type ActionHook = dyn Fn(&ActionRecord, &Value) -> anyhow::Result<()> + Send + Sync;
pub(crate) type ActionErrorHook =
    dyn Fn(&ActionRecord, &Value, &anyhow::Error) -> anyhow::Result<()> + Send + Sync;

/// Shared handle to a mutation subscriber. Clones share identity, so
/// subscribing the same handle twice registers it once.
#[derive(Clone)]
pub struct MutationSubscriber(Arc<MutationHook>);

impl MutationSubscriber {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&MutationRecord, &Value) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

/// Hooks run around each dispatch.
#[derive(Default)]
pub(crate) struct ActionHooks {
    before: Option<Box<ActionHook>>,
    after: Option<Box<ActionHook>>,
    error: Option<Box<ActionErrorHook>>,
}

impl ActionHooks {
    pub(crate) fn run_before(&self, action: &ActionRecord, state: &Value) {
        if let Some(hook) = &self.before {
            if let Err(err) = hook(action, state) {
                tracing::warn!(kind = %action.kind, error = %err, "error in before action subscriber");
            }
        }
    }

    pub(crate) fn run_after(&self, action: &ActionRecord, state: &Value) {
        if let Some(hook) = &self.after {
            if let Err(err) = hook(action, state) {
                tracing::warn!(kind = %action.kind, error = %err, "error in after action subscriber");
            }
        }
    }

    pub(crate) fn run_error(&self, action: &ActionRecord, state: &Value, error: &anyhow::Error) {
        if let Some(hook) = &self.error {
            if let Err(err) = hook(action, state, error) {
                tracing::warn!(kind = %action.kind, error = %err, "error in error action subscriber");
            }
        }
    }
}

/// Shared handle to an action subscriber with any of `before`, `after`
/// and `error` hooks. Clones share identity.
#[derive(Clone)]
pub struct ActionSubscriber(Arc<ActionHooks>);

impl ActionSubscriber {
    pub fn builder() -> ActionSubscriberBuilder {
        ActionSubscriberBuilder(ActionHooks::default())
    }

    /// A bare function subscribes as a `before` hook.
    pub fn before<F>(f: F) -> Self
    where
        F: Fn(&ActionRecord, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::builder().before(f).build()
    }
}

pub struct ActionSubscriberBuilder(ActionHooks);

impl ActionSubscriberBuilder {
    pub fn before<F>(mut self, f: F) -> Self
    where
        F: Fn(&ActionRecord, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.0.before = Some(Box::new(f));
        self
    }

    pub fn after<F>(mut self, f: F) -> Self
    where
        F: Fn(&ActionRecord, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.0.after = Some(Box::new(f));
        self
    }

    pub fn error<F>(mut self, f: F) -> Self
    where
        F: Fn(&ActionRecord, &Value, &anyhow::Error) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.0.error = Some(Box::new(f));
        self
    }

    pub fn build(self) -> ActionSubscriber {
        ActionSubscriber(Arc::new(self.0))
    }
}

/// Where a new subscriber is placed in the notification order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Notify before existing subscribers.
    pub prepend: bool,
}

/// Identity-deduplicated ordered list of shared handlers.
pub(crate) struct SubscriberList<T: ?Sized> {
    entries: RwLock<Vec<Arc<T>>>,
}

impl<T: ?Sized> SubscriberList<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Insert unless the same handler is already present.
    pub(crate) fn add(&self, handler: &Arc<T>, prepend: bool) {
        let mut entries = self.entries.write();
        if entries.iter().any(|existing| same(existing, handler)) {
            return;
        }
        if prepend {
            entries.insert(0, Arc::clone(handler));
        } else {
            entries.push(Arc::clone(handler));
        }
    }

    pub(crate) fn remove(&self, handler: &Arc<T>) {
        let mut entries = self.entries.write();
        if let Some(index) = entries.iter().position(|existing| same(existing, handler)) {
            entries.remove(index);
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries.read().clone()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}

fn same<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

pub(crate) type MutationList = SubscriberList<MutationHook>;
pub(crate) type ActionList = SubscriberList<ActionHooks>;

impl MutationSubscriber {
    pub(crate) fn shared(&self) -> &Arc<MutationHook> {
        &self.0
    }
}

impl ActionSubscriber {
    pub(crate) fn shared(&self) -> &Arc<ActionHooks> {
        &self.0
    }
}

/// Capability to remove exactly the record a `subscribe` call added.
pub struct Subscription {
    remove: Box<dyn FnOnce() + Send + Sync>,
}

impl Subscription {
    pub(crate) fn for_mutation(list: Weak<MutationList>, handler: MutationSubscriber) -> Self {
        Self {
            remove: Box::new(move || {
                if let Some(list) = list.upgrade() {
                    list.remove(handler.shared());
                }
            }),
        }
    }

    pub(crate) fn for_action(list: Weak<ActionList>, handler: ActionSubscriber) -> Self {
        Self {
            remove: Box::new(move || {
                if let Some(list) = list.upgrade() {
                    list.remove(handler.shared());
                }
            }),
        }
    }

    pub fn unsubscribe(self) {
        (self.remove)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_same_handler_is_added_once() {
        let list = MutationList::new();
        let handler = MutationSubscriber::new(|_, _| {});
        list.add(handler.shared(), false);
        list.add(handler.clone().shared(), false);
        assert_eq!(list.len(), 1);

        list.add(MutationSubscriber::new(|_, _| {}).shared(), false);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_prepend_goes_first() {
        let list = MutationList::new();
        let first = MutationSubscriber::new(|_, _| {});
        let second = MutationSubscriber::new(|_, _| {});
        list.add(first.shared(), false);
        list.add(second.shared(), true);

        let snapshot = list.snapshot();
        assert!(same(&snapshot[0], second.shared()));
        assert!(same(&snapshot[1], first.shared()));
    }

    #[test]
    fn test_subscription_removes_only_its_record() {
        let list = Arc::new(MutationList::new());
        let kept = MutationSubscriber::new(|_, _| {});
        let removed = MutationSubscriber::new(|_, _| {});
        list.add(kept.shared(), false);
        list.add(removed.shared(), false);

        Subscription::for_mutation(Arc::downgrade(&list), removed).unsubscribe();
        let snapshot = list.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(same(&snapshot[0], kept.shared()));
    }

    #[test]
    fn test_failing_hook_is_contained() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let subscriber = ActionSubscriber::builder()
            .before(|_, _| Err(anyhow::anyhow!("boom")))
            .after(move |_, _| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build();
        let action = ActionRecord {
            kind: "a".to_string(),
            payload: json!(null),
        };

        let hooks = subscriber.shared();
        hooks.run_before(&action, &json!({}));
        hooks.run_after(&action, &json!({}));
        hooks.run_error(&action, &json!({}), &anyhow::anyhow!("ignored"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
