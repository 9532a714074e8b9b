//! The root store: flat registries, commit/dispatch, subscriptions,
//! dynamic modules and hot update.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use futures::future::{self, try_join_all, FutureExt, TryFutureExt};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use serde_json::Value;

use crate::config::StoreOptions;
use crate::devtools::Inspector;
use crate::error::{DiagnosticsLog, StoreError};
use crate::module::{ActionFuture, ModuleDef, ModulePath, ModuleTree};
use crate::reactive::{nested, nested_mut, ChangeListener, ListenerId, ObservableState};
use crate::store::builder::StoreBuilder;
use crate::store::context::{ActionContext, GetterContext, Getters, LocalContext};
use crate::store::install::{InstallPass, StateAttachment};
use crate::store::invocation::{ActionRecord, Call, Invocation, MutationRecord};
use crate::store::registry::{GetterCache, Registries};
use crate::store::subscription::{
    ActionList, ActionSubscriber, MutationList, MutationSubscriber, SubscribeOptions,
    SubscriberList, Subscription,
};

pub(crate) struct StoreInner {
    this: Weak<StoreInner>,
    options: StoreOptions,
    pub(crate) state: Arc<dyn ObservableState>,
    modules: RwLock<ModuleTree>,
    registries: RwLock<Arc<Registries>>,
    /// Commit nesting depth of the owning thread.
    commit_gate: ReentrantMutex<Cell<usize>>,
    mutation_subscribers: Arc<MutationList>,
    action_subscribers: Arc<ActionList>,
    getter_cache: GetterCache,
    local_getters: Mutex<HashMap<String, Getters>>,
    diagnostics: DiagnosticsLog,
    inspector: Option<Arc<dyn Inspector>>,
}

impl StoreInner {
    pub(crate) fn new(
        options: StoreOptions,
        state: Arc<dyn ObservableState>,
        modules: ModuleTree,
        inspector: Option<Arc<dyn Inspector>>,
    ) -> Arc<Self> {
        let inspector = inspector.filter(|_| options.devtools);
        let diagnostics = DiagnosticsLog::new(options.diagnostics_capacity);
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            options,
            state,
            modules: RwLock::new(modules),
            registries: RwLock::new(Arc::new(Registries::default())),
            commit_gate: ReentrantMutex::new(Cell::new(0)),
            mutation_subscribers: Arc::new(SubscriberList::new()),
            action_subscribers: Arc::new(SubscriberList::new()),
            getter_cache: GetterCache::default(),
            local_getters: Mutex::new(HashMap::new()),
            diagnostics,
            inspector,
        })
    }

    pub(crate) fn weak(&self) -> Weak<StoreInner> {
        self.this.clone()
    }

    pub(crate) fn registries(&self) -> Arc<Registries> {
        Arc::clone(&self.registries.read())
    }

    /// Publish a rebuilt registry set under a fresh generation. Every
    /// cached getter value and local getter proxy dies with the old one.
    fn swap_registries(&self, mut registries: Registries) {
        {
            let mut current = self.registries.write();
            registries.generation = current.generation + 1;
            *current = Arc::new(registries);
        }
        self.getter_cache.clear();
        self.local_getters.lock().clear();
    }

    pub(crate) fn report(&self, error: StoreError) {
        self.diagnostics.report(error);
    }

    /// Run `f` with the commit gate held by the calling thread. Commits
    /// from other threads wait; nested commits on the same thread pass.
    pub(crate) fn with_commit<R>(&self, f: impl FnOnce() -> R) -> R {
        let depth = self.commit_gate.lock();
        depth.set(depth.get() + 1);
        let _restore = scopeguard::guard(depth, |depth| depth.set(depth.get() - 1));
        f()
    }

    /// Whether the calling thread is inside a commit.
    pub(crate) fn is_committing(&self) -> bool {
        self.commit_gate
            .try_lock()
            .is_some_and(|depth| depth.get() > 0)
    }

    pub(crate) fn normalize(&self, invocation: Invocation) -> Option<Call> {
        match invocation.normalize() {
            Ok(call) => Some(call),
            Err(err) => {
                self.report(err);
                None
            }
        }
    }

    pub(crate) fn commit_call(&self, call: Call) {
        let registries = self.registries();
        let Some(entry) = registries.mutations.get(&call.kind) else {
            self.report(StoreError::UnknownMutation { kind: call.kind });
            return;
        };
        tracing::debug!(kind = %call.kind, handlers = entry.len(), "commit");

        // Held through notification so subscribers see commits in order.
        let _serial = self.commit_gate.lock();
        self.with_commit(|| {
            for mutation in entry {
                let mut applied = false;
                self.state.update(&mut |root| {
                    if let Some(local) = nested_mut(root, &mutation.path) {
                        (mutation.handler)(local, &call.payload);
                        applied = true;
                    }
                });
                if !applied {
                    tracing::warn!(
                        kind = %call.kind,
                        path = %mutation.path.join("/"),
                        "module state missing, mutation skipped"
                    );
                }
            }
        });

        let record = MutationRecord {
            kind: call.kind,
            payload: call.payload,
        };
        let state = self.state.snapshot();
        for subscriber in self.mutation_subscribers.snapshot() {
            subscriber(&record, &state);
        }
        if let Some(inspector) = &self.inspector {
            inspector.on_mutation(&record, &state);
        }
    }

    pub(crate) fn dispatch_call(&self, call: Call) -> ActionFuture {
        let Some(inner) = self.this.upgrade() else {
            return future::ready(Ok(Value::Null)).boxed();
        };
        let registries = self.registries();
        let Some(entry) = registries.actions.get(&call.kind) else {
            self.report(StoreError::UnknownAction { kind: call.kind });
            return future::ready(Ok(Value::Null)).boxed();
        };
        tracing::debug!(kind = %call.kind, handlers = entry.len(), "dispatch");

        let record = ActionRecord {
            kind: call.kind,
            payload: call.payload,
        };
        let state = self.state.snapshot();
        for hooks in self.action_subscribers.snapshot() {
            hooks.run_before(&record, &state);
        }

        let store = Store {
            inner: Arc::clone(&inner),
        };
        let mut pending: Vec<ActionFuture> = entry
            .iter()
            .map(|action| {
                let context = ActionContext::new(action.context.clone(), store.clone());
                detach((action.handler)(context, record.payload.clone()))
            })
            .collect();
        // Detached handlers keep running when a sibling rejects first.
        let combined = if pending.len() > 1 {
            try_join_all(pending).map_ok(Value::Array).boxed()
        } else {
            pending
                .pop()
                .unwrap_or_else(|| future::ready(Ok(Value::Null)).boxed())
        };

        detach(
            async move {
                let result = combined.await;
                let state = inner.state.snapshot();
                let subscribers = inner.action_subscribers.snapshot();
                match &result {
                    Ok(_) => {
                        for hooks in &subscribers {
                            hooks.run_after(&record, &state);
                        }
                    }
                    Err(err) => {
                        tracing::debug!(kind = %record.kind, error = %err, "action rejected");
                        for hooks in &subscribers {
                            hooks.run_error(&record, &state, err);
                        }
                        if let Some(inspector) = &inner.inspector {
                            inspector.on_action_error(&record, err);
                        }
                    }
                }
                result
            }
            .boxed(),
        )
    }

    /// Evaluate a getter by fully-qualified name, memoized on the registry
    /// generation and state version.
    pub(crate) fn evaluate_getter(&self, kind: &str) -> Option<Value> {
        let registries = self.registries();
        let Some(wrapped) = registries.getters.get(kind) else {
            self.report(StoreError::UnknownGetter {
                kind: kind.to_string(),
            });
            return None;
        };

        let version = self.state.version();
        if let Some(value) = self.getter_cache.get(kind, registries.generation, version) {
            return Some(value);
        }

        let root_state = self.state.snapshot();
        let local_state = nested(&root_state, wrapped.context.path())
            .cloned()
            .unwrap_or(Value::Null);
        let getters = wrapped.context.getters();
        let root_getters = Getters::root(self.weak());
        let value = (wrapped.getter)(&GetterContext {
            state: &local_state,
            getters: &getters,
            root_state: &root_state,
            root_getters: &root_getters,
        });

        // A write during evaluation makes the result unreliable for caching.
        if self.state.version() == version {
            self.getter_cache
                .insert(kind, registries.generation, version, value.clone());
        }
        Some(value)
    }

    /// Local getter proxy for `namespace`, built once per registry generation.
    pub(crate) fn local_getters(&self, namespace: &str) -> Getters {
        if let Some(getters) = self.local_getters.lock().get(namespace) {
            return getters.clone();
        }
        let registries = self.registries();
        let getters = Getters::local(self.weak(), namespace, registries.getters.keys());
        self.local_getters
            .lock()
            .insert(namespace.to_string(), getters.clone());
        getters
    }

    fn attach_states(&self, attachments: Vec<StateAttachment>) {
        if attachments.is_empty() {
            return;
        }
        self.with_commit(|| {
            for attachment in attachments {
                let occupied = self
                    .state
                    .read(&attachment.parent)
                    .map(|parent| parent.get(&attachment.key).is_some())
                    .unwrap_or(false);
                if occupied {
                    if attachment.preserve {
                        continue;
                    }
                    let mut path = attachment.parent.clone();
                    path.push(attachment.key.clone());
                    self.report(StoreError::StateFieldOverridden {
                        key: attachment.key.clone(),
                        path: path.join("."),
                    });
                }
                if !self
                    .state
                    .set(&attachment.parent, &attachment.key, attachment.state)
                {
                    tracing::warn!(
                        parent = %attachment.parent.join("/"),
                        key = %attachment.key,
                        "parent state missing, module state not attached"
                    );
                }
            }
        });
    }

    /// Install the whole tree from the root into fresh registries.
    pub(crate) fn install_root(&self, hot: bool) {
        let mut registries = Registries::default();
        let attachments = {
            let mut tree = self.modules.write();
            let mut pass = InstallPass::new(self, &mut registries, hot);
            pass.install(&mut tree, &[]);
            let attachments = pass.attachments;
            self.swap_registries(registries);
            attachments
        };
        self.attach_states(attachments);
    }

    /// Rebuild the registries from the current tree without touching state.
    fn reset(&self) {
        self.install_root(true);
    }

    pub(crate) fn diagnostics(&self) -> &DiagnosticsLog {
        &self.diagnostics
    }

    pub(crate) fn on_init(&self) {
        if let Some(inspector) = &self.inspector {
            inspector.on_init(&self.state.snapshot());
        }
    }
}

/// Run `task` on the ambient tokio runtime so it completes even if the
/// returned future is dropped. Without a runtime the task stays lazy.
fn detach(task: ActionFuture) -> ActionFuture {
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            let handle = runtime.spawn(task);
            async move {
                handle
                    .await
                    .unwrap_or_else(|err| Err(anyhow::anyhow!("action task failed: {err}")))
            }
            .boxed()
        }
        Err(_) => task,
    }
}

/// Options for [`Store::register_module_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterOptions {
    /// Keep a state value already present at the module's slot.
    pub preserve_state: bool,
}

/// Options for [`Store::watch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    /// Call back once right away with `Null` as the previous value.
    pub immediate: bool,
}

/// Stops a [`Store::watch`] registration.
pub struct WatchHandle {
    state: Weak<dyn ObservableState>,
    listener: ListenerId,
}

impl WatchHandle {
    pub fn unwatch(self) {
        if let Some(state) = self.state.upgrade() {
            state.remove_listener(self.listener);
        }
    }
}

/// Handle to a store. Cheap to clone; all clones share one store.
#[derive(Clone)]
pub struct Store {
    pub(crate) inner: Arc<StoreInner>,
}

impl Store {
    pub fn builder(root: ModuleDef) -> StoreBuilder {
        StoreBuilder::new(root)
    }

    /// Snapshot of the root state.
    pub fn state(&self) -> Value {
        self.inner.state.snapshot()
    }

    /// The observable handle backing the state. Writes through it bypass
    /// the commit path and are flagged in strict mode.
    pub fn state_handle(&self) -> Arc<dyn ObservableState> {
        Arc::clone(&self.inner.state)
    }

    /// Rejects direct assignment of the root state with
    /// [`StoreError::InvalidMutation`]. Use [`Store::replace_state`] or a
    /// committed mutation instead.
    pub fn set_state(&self, _state: Value) -> Result<(), StoreError> {
        Err(StoreError::InvalidMutation)
    }

    /// Wholesale state replacement, under the commit gate.
    pub fn replace_state(&self, state: Value) {
        self.inner.with_commit(|| self.inner.state.replace(state));
    }

    pub fn getters(&self) -> Getters {
        Getters::root(self.inner.weak())
    }

    pub fn getter(&self, kind: &str) -> Option<Value> {
        self.inner.evaluate_getter(kind)
    }

    pub fn commit(&self, invocation: impl Into<Invocation>) {
        if let Some(call) = self.inner.normalize(invocation.into()) {
            self.inner.commit_call(call);
        }
    }

    /// Dispatch an action. Unknown types resolve to `Null`.
    pub fn dispatch(&self, invocation: impl Into<Invocation>) -> ActionFuture {
        match self.inner.normalize(invocation.into()) {
            Some(call) => self.inner.dispatch_call(call),
            None => future::ready(Ok(Value::Null)).boxed(),
        }
    }

    pub fn subscribe<F>(&self, f: F) -> Subscription
    where
        F: Fn(&MutationRecord, &Value) + Send + Sync + 'static,
    {
        self.subscribe_with(MutationSubscriber::new(f), SubscribeOptions::default())
    }

    pub fn subscribe_with(
        &self,
        subscriber: MutationSubscriber,
        options: SubscribeOptions,
    ) -> Subscription {
        self.inner
            .mutation_subscribers
            .add(subscriber.shared(), options.prepend);
        Subscription::for_mutation(Arc::downgrade(&self.inner.mutation_subscribers), subscriber)
    }

    /// Subscribe a bare `before` hook.
    pub fn subscribe_action<F>(&self, f: F) -> Subscription
    where
        F: Fn(&ActionRecord, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_action_with(ActionSubscriber::before(f), SubscribeOptions::default())
    }

    pub fn subscribe_action_with(
        &self,
        subscriber: ActionSubscriber,
        options: SubscribeOptions,
    ) -> Subscription {
        self.inner
            .action_subscribers
            .add(subscriber.shared(), options.prepend);
        Subscription::for_action(Arc::downgrade(&self.inner.action_subscribers), subscriber)
    }

    /// Call `callback(new, old)` whenever the selector's result changes.
    pub fn watch<S, C>(&self, selector: S, callback: C, options: WatchOptions) -> WatchHandle
    where
        S: Fn(&Value, &Getters) -> Value + Send + Sync + 'static,
        C: Fn(&Value, &Value) + Send + Sync + 'static,
    {
        let initial = selector(&self.state(), &self.getters());
        if options.immediate {
            callback(&initial, &Value::Null);
        }

        let last = Mutex::new(initial);
        let store = self.inner.weak();
        let listener: ChangeListener = Arc::new(move |_version| {
            let Some(inner) = store.upgrade() else {
                return;
            };
            let current = selector(&inner.state.snapshot(), &Getters::root(store.clone()));
            let previous = {
                let mut last = last.lock();
                if *last == current {
                    return;
                }
                std::mem::replace(&mut *last, current.clone())
            };
            callback(&current, &previous);
        });

        let listener = self.inner.state.on_change(listener);
        WatchHandle {
            state: Arc::downgrade(&self.inner.state),
            listener,
        }
    }

    pub fn register_module(
        &self,
        path: impl Into<ModulePath>,
        module: ModuleDef,
    ) -> Result<(), StoreError> {
        self.register_module_with(path, module, RegisterOptions::default())
    }

    /// Attach a runtime module and install its subtree into the registries.
    /// Registering over an existing path rebuilds every registry.
    pub fn register_module_with(
        &self,
        path: impl Into<ModulePath>,
        module: ModuleDef,
        options: RegisterOptions,
    ) -> Result<(), StoreError> {
        let path = path.into();
        if path.is_root() {
            return Err(StoreError::RootRegistration);
        }

        let attachments = {
            let mut tree = self.inner.modules.write();
            let replacing = tree.get(path.keys()).is_some();
            tree.register(path.keys(), module, true)?;
            // A replaced subtree leaves handlers behind, so rebuild from the root.
            let (mut registries, from) = if replacing {
                (Registries::default(), &[][..])
            } else {
                ((*self.inner.registries()).clone(), path.keys())
            };
            let mut pass = InstallPass::new(&self.inner, &mut registries, false)
                .preserve_state(options.preserve_state)
                .fresh_under(path.keys());
            pass.install(&mut tree, from);
            let attachments = pass.attachments;
            self.inner.swap_registries(registries);
            attachments
        };
        self.inner.attach_states(attachments);
        tracing::info!(path = %path.keys().join("/"), "module registered");
        Ok(())
    }

    /// Detach a runtime module and drop its state slot. Statically
    /// declared modules are left in place.
    pub fn unregister_module(&self, path: impl Into<ModulePath>) {
        let path = path.into();
        let removed = self.inner.modules.write().unregister(path.keys());
        if removed {
            if let Some((key, parent)) = path.keys().split_last() {
                self.inner.with_commit(|| self.inner.state.remove(parent, key));
            }
            tracing::info!(path = %path.keys().join("/"), "module unregistered");
        }
        self.inner.reset();
    }

    pub fn has_module(&self, path: impl Into<ModulePath>) -> bool {
        let path = path.into();
        self.inner.modules.read().is_registered(path.keys())
    }

    /// Merge new handler definitions into the existing tree and rebuild
    /// the registries. A module missing from the tree aborts the merge;
    /// merges applied before that point stay.
    pub fn hot_update(&self, module: ModuleDef) -> Result<(), StoreError> {
        let result = self.inner.modules.write().update(&module);
        self.inner.reset();
        if let Err(err) = &result {
            self.inner.report(err.clone());
        }
        result
    }

    /// Local context of the module occupying `namespace`, or the root
    /// context for the empty namespace.
    pub fn module_context(&self, namespace: &str) -> Option<LocalContext> {
        let tree = self.inner.modules.read();
        if namespace.is_empty() {
            return tree.root().context().cloned();
        }
        let registries = self.inner.registries();
        let path = registries.namespaces.get(namespace)?;
        tree.get(path).and_then(|module| module.context().cloned())
    }

    pub fn diagnostics(&self) -> &DiagnosticsLog {
        self.inner.diagnostics()
    }

    pub fn options(&self) -> &StoreOptions {
        &self.inner.options
    }

    pub fn is_committing(&self) -> bool {
        self.inner.is_committing()
    }
}
