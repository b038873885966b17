//! The mock store.
//!
//! A [`MockStore`] holds a working copy of state and getters, records every
//! commit and dispatch, and notifies subscribers synchronously. Handles are
//! cheap to clone and all point at the same store.
//!
//! ## Reset policy
//!
//! `reset()` works in place: the commit and dispatch recorders keep their
//! identity (handles obtained earlier stay valid and keep notifying), their
//! history is cleared, both subscriber registries are emptied, and state and
//! getters are re-derived from the values given at construction.

use crate::config::StoreOptions;
use crate::namespace::NamespaceMap;
use crate::recorder::{Notifier, Recorder, RecorderFactory};
use crate::result::{HandlerResult, StoreError, StoreResult};
use crate::subscription::{
    CallDescriptor, Handler, SubscriberRegistry, SubscriptionKind, Unsubscribe,
};
use crate::value::{Getters, SharedState};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

pub(crate) struct StoreInner {
    initial_state: Value,
    initial_getters: Getters,
    state: RefCell<SharedState>,
    getters: RefCell<Getters>,
    recorder_factory: Rc<dyn RecorderFactory>,
    commit: Rc<dyn Recorder>,
    dispatch: Rc<dyn Recorder>,
    mutation_subscribers: SubscriberRegistry,
    action_subscribers: SubscriberRegistry,
    modules: NamespaceMap,
}

impl StoreInner {
    fn registry(&self, kind: SubscriptionKind) -> &SubscriberRegistry {
        match kind {
            SubscriptionKind::Mutation => &self.mutation_subscribers,
            SubscriptionKind::Action => &self.action_subscribers,
        }
    }

    fn initialize(&self) {
        *self.getters.borrow_mut() = self.initial_getters.clone();
        *self.state.borrow_mut() = SharedState::new(self.initial_state.clone());
    }
}

/// Test double for a centralized state store
///
/// # Example
///
/// ```
/// use probar_store_mock::{MockStore, Recorder, StoreOptions};
/// use serde_json::json;
///
/// let store = MockStore::with_options(
///     StoreOptions::new().with_state(json!({"counter": 0})),
/// );
///
/// store.commit("increment", json!(1)).unwrap();
/// store.commit_recorder().assert_called_with("increment", &[json!(1)]);
///
/// store.state().set("counter", 5);
/// store.reset();
/// assert_eq!(store.state().get("counter"), Some(json!(0)));
/// ```
#[derive(Clone)]
pub struct MockStore {
    inner: Rc<StoreInner>,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockStore")
            .field("state", &self.inner.state.borrow().snapshot())
            .field("getters", &*self.inner.getters.borrow())
            .field("commits", &self.inner.commit.call_count())
            .field("dispatches", &self.inner.dispatch.call_count())
            .field("mutation_subscribers", &self.inner.mutation_subscribers.len())
            .field("action_subscribers", &self.inner.action_subscribers.len())
            .finish()
    }
}

impl MockStore {
    /// Create a store with empty state and getters
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    /// Create a store from options
    #[must_use]
    pub fn with_options(options: StoreOptions) -> Self {
        let StoreOptions {
            state,
            getters,
            recorder_factory,
        } = options;

        let inner = Rc::new_cyclic(|weak: &Weak<StoreInner>| {
            let commit =
                recorder_factory.create(Some(notifier(weak.clone(), SubscriptionKind::Mutation)));
            let dispatch =
                recorder_factory.create(Some(notifier(weak.clone(), SubscriptionKind::Action)));
            StoreInner {
                state: RefCell::new(SharedState::new(state.clone())),
                getters: RefCell::new(getters.clone()),
                initial_state: state,
                initial_getters: getters,
                recorder_factory,
                commit,
                dispatch,
                mutation_subscribers: SubscriberRegistry::new(SubscriptionKind::Mutation),
                action_subscribers: SubscriberRegistry::new(SubscriptionKind::Action),
                modules: NamespaceMap::new(weak.clone()),
            }
        });

        tracing::debug!("mock store created");
        Self { inner }
    }

    pub(crate) fn from_inner(inner: Rc<StoreInner>) -> Self {
        Self { inner }
    }

    /// Current working state
    ///
    /// The handle is replaced on reset; re-read it afterwards.
    #[must_use]
    pub fn state(&self) -> SharedState {
        self.inner.state.borrow().clone()
    }

    /// Shallow copy of the current getters
    #[must_use]
    pub fn getters(&self) -> Getters {
        self.inner.getters.borrow().clone()
    }

    /// Getter value by key
    #[must_use]
    pub fn getter(&self, key: &str) -> Option<Value> {
        self.inner.getters.borrow().get(key).cloned()
    }

    /// Define or overwrite a getter on the working copy
    pub fn set_getter(&self, key: &str, value: impl Into<Value>) {
        self.inner.getters.borrow_mut().insert(key, value);
    }

    /// Edit the working getters in place
    pub fn update_getters<R>(&self, f: impl FnOnce(&mut Getters) -> R) -> R {
        f(&mut self.inner.getters.borrow_mut())
    }

    /// State given at construction; never mutated
    #[must_use]
    pub fn initial_state(&self) -> &Value {
        &self.inner.initial_state
    }

    /// Getters given at construction; never mutated
    #[must_use]
    pub fn initial_getters(&self) -> &Getters {
        &self.inner.initial_getters
    }

    /// Commit a mutation with one payload
    pub fn commit(&self, name: &str, payload: impl Into<Value>) -> StoreResult<Value> {
        self.commit_args(name, &[payload.into()])
    }

    /// Commit a mutation with any number of arguments
    ///
    /// Subscribers receive the first argument as payload.
    pub fn commit_args(&self, name: &str, args: &[Value]) -> StoreResult<Value> {
        tracing::debug!(mutation = name, args = args.len(), "commit");
        self.inner.commit.invoke(name, args)
    }

    /// Dispatch an action with one payload
    pub fn dispatch(&self, name: &str, payload: impl Into<Value>) -> StoreResult<Value> {
        self.dispatch_args(name, &[payload.into()])
    }

    /// Dispatch an action with any number of arguments
    pub fn dispatch_args(&self, name: &str, args: &[Value]) -> StoreResult<Value> {
        tracing::debug!(action = name, args = args.len(), "dispatch");
        self.inner.dispatch.invoke(name, args)
    }

    /// Recorder behind [`commit`](Self::commit)
    #[must_use]
    pub fn commit_recorder(&self) -> Rc<dyn Recorder> {
        Rc::clone(&self.inner.commit)
    }

    /// Recorder behind [`dispatch`](Self::dispatch)
    #[must_use]
    pub fn dispatch_recorder(&self) -> Rc<dyn Recorder> {
        Rc::clone(&self.inner.dispatch)
    }

    /// Subscribe to commits
    pub fn subscribe<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&CallDescriptor, &SharedState) -> HandlerResult + 'static,
    {
        self.inner.mutation_subscribers.subscribe(handler)
    }

    /// Subscribe to dispatches
    pub fn subscribe_action<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&CallDescriptor, &SharedState) -> HandlerResult + 'static,
    {
        self.inner.action_subscribers.subscribe(handler)
    }

    /// Subscribe a shared handler to commits or dispatches
    ///
    /// The same handler may be registered repeatedly; each registration is
    /// notified and removed on its own.
    pub fn subscribe_handler(&self, kind: SubscriptionKind, handler: Handler) -> Unsubscribe {
        self.inner.registry(kind).subscribe_handler(handler)
    }

    /// Registry notified on commit
    #[must_use]
    pub fn mutation_subscribers(&self) -> &SubscriberRegistry {
        &self.inner.mutation_subscribers
    }

    /// Registry notified on dispatch
    #[must_use]
    pub fn action_subscribers(&self) -> &SubscriberRegistry {
        &self.inner.action_subscribers
    }

    /// Restore the store to how it was right after construction
    pub fn reset(&self) {
        let inner = &self.inner;
        inner.recorder_factory.reset(&*inner.dispatch);
        inner.recorder_factory.reset(&*inner.commit);
        inner.mutation_subscribers.clear();
        inner.action_subscribers.clear();
        inner.initialize();
        tracing::debug!("mock store reset");
    }

    /// Lookup table resolving namespaced module keys
    ///
    /// Always the same instance for a given store.
    #[must_use]
    pub fn modules(&self) -> NamespaceMap {
        self.inner.modules.clone()
    }

    /// Whether two handles point at the same store
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Non-owning handle, for subscribers that call back into the store
    #[must_use]
    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

/// Handle that does not keep a [`MockStore`] alive
#[derive(Clone)]
pub struct WeakStore {
    inner: Weak<StoreInner>,
}

impl fmt::Debug for WeakStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakStore")
            .field("attached", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl WeakStore {
    /// The store, or `StoreDropped` once every owning handle is gone
    pub fn upgrade(&self) -> StoreResult<MockStore> {
        self.inner
            .upgrade()
            .map(MockStore::from_inner)
            .ok_or(StoreError::StoreDropped)
    }
}

fn notifier(store: Weak<StoreInner>, kind: SubscriptionKind) -> Notifier {
    Rc::new(move |name: &str, args: &[Value]| {
        let Some(inner) = store.upgrade() else {
            return Ok(());
        };
        let descriptor = CallDescriptor::new(name, args.first().cloned());
        let state = inner.state.borrow().clone();
        inner.registry(kind).notify(&descriptor, &state)
    })
}
