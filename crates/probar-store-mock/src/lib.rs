//! Probar Store Mock: an inspectable stand-in for a centralized state store
//!
//! Components written against a store that exposes state, getters,
//! `commit` and `dispatch` can be exercised in isolation by handing them a
//! [`MockStore`] instead. The mock never runs real mutations or actions:
//! it records them, notifies subscribers, and lets the test arrange state
//! directly.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          MockStore                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  commit(name, ..) ──► Recorder ──► notifier ──► mutation     │
//! │                       (history)                 subscribers  │
//! │  dispatch(name, ..) ► Recorder ──► notifier ──► action       │
//! │                       (history)                 subscribers  │
//! │                                                              │
//! │  state / getters ◄── reset() ◄── initial state / getters     │
//! │                                                              │
//! │  modules()["cart/nested/"] ──► ModuleContext                 │
//! │      state slice, prefixed commit/dispatch, root getters     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use probar_store_mock::{MockStore, Recorder, StoreOptions};
//! use serde_json::json;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let store = MockStore::with_options(
//!     StoreOptions::new().with_state(json!({"cart": {"items": []}})),
//! );
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let seen_clone = Rc::clone(&seen);
//! store.subscribe(move |descriptor, _state| {
//!     seen_clone.borrow_mut().push(descriptor.type_name.clone());
//!     Ok(())
//! });
//!
//! let cart = store.modules().resolve("cart/").unwrap().unwrap();
//! cart.commit("add", json!({"sku": "A1"})).unwrap();
//!
//! store.commit_recorder().assert_called_with("cart/add", &[json!({"sku": "A1"})]);
//! assert_eq!(*seen.borrow(), vec!["cart/add".to_string()]);
//!
//! store.reset();
//! store.commit_recorder().assert_not_called();
//! ```

#![warn(missing_docs)]

mod config;
pub mod logging;
mod namespace;
mod recorder;
mod result;
mod store;
mod subscription;
mod value;

pub use config::{StoreFixture, StoreOptions};
pub use namespace::{
    module_path, Lookup, ModuleContext, ModuleState, NamespaceMap, PropertyKey,
    NAMESPACE_SEPARATOR,
};
pub use recorder::{Notifier, RecordedCall, Recorder, RecorderFactory, Spy, SpyFactory};
pub use result::{HandlerError, HandlerResult, StoreError, StoreResult};
pub use store::{MockStore, WeakStore};
pub use subscription::{
    CallDescriptor, Handler, SubscriberRegistry, SubscriptionKind, Unsubscribe,
};
pub use value::{is_truthy, Getters, SharedState};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        CallDescriptor, Getters, HandlerResult, MockStore, ModuleContext, Recorder,
        SharedState, StoreError, StoreOptions, StoreResult,
    };
}
