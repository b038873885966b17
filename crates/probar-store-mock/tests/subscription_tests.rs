//! Subscription lifecycle tests: registration order, unsubscribe, reset,
//! error propagation and re-entrant notification.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use pretty_assertions::assert_eq;
use probar_store_mock::prelude::*;
use probar_store_mock::{Handler, SubscriptionKind};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<(CallDescriptor, Value)>>>;

fn recording(log: &Log) -> impl Fn(&CallDescriptor, &SharedState) -> HandlerResult + 'static {
    let log = Rc::clone(log);
    move |descriptor: &CallDescriptor, state: &SharedState| {
        log.borrow_mut().push((descriptor.clone(), state.snapshot()));
        Ok(())
    }
}

// ============================================================================
// Mutation subscriptions
// ============================================================================

#[test]
fn test_subscribes_to_mutations() {
    let store = MockStore::new();
    let log: Log = Log::default();
    store.subscribe(recording(&log));

    store.commit("mutation", json!("payload")).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![(
            CallDescriptor::new("mutation", Some(json!("payload"))),
            json!({})
        )]
    );
}

#[test]
fn test_commit_without_args_has_no_payload() {
    let store = MockStore::new();
    let log: Log = Log::default();
    store.subscribe(recording(&log));

    store.commit_args("bare", &[]).unwrap();

    assert_eq!(log.borrow()[0].0.payload, None);
}

#[test]
fn test_returns_an_unsubscribe_callback() {
    let store = MockStore::new();
    let log: Log = Log::default();
    let unsubscribe = store.subscribe(recording(&log));

    assert!(unsubscribe.unsubscribe());
    store.commit("mutation", json!("payload")).unwrap();

    assert!(log.borrow().is_empty());
    store.commit_recorder().assert_called_times(1);
}

#[test]
fn test_resets_subscriptions_on_reset() {
    let store = MockStore::new();
    let log: Log = Log::default();
    let stale = store.subscribe(recording(&log));
    store.subscribe_action(recording(&log));

    store.reset();
    store.commit("mutation", json!("payload")).unwrap();
    store.dispatch("action", json!("payload")).unwrap();

    assert!(log.borrow().is_empty());
    assert!(store.mutation_subscribers().is_empty());
    assert!(store.action_subscribers().is_empty());
    assert!(!stale.unsubscribe());
}

#[test]
fn test_new_subscriptions_after_reset_are_notified() {
    let store = MockStore::new();
    let log: Log = Log::default();
    store.subscribe(recording(&log));
    store.reset();
    store.subscribe(recording(&log));

    store.commit("m", json!(null)).unwrap();
    assert_eq!(log.borrow().len(), 1);
}

// ============================================================================
// Action subscriptions
// ============================================================================

#[test]
fn test_subscribes_to_actions() {
    let store = MockStore::with_options(StoreOptions::new().with_state(json!({"n": 1})));
    let mutations: Log = Log::default();
    let actions: Log = Log::default();
    store.subscribe(recording(&mutations));
    store.subscribe_action(recording(&actions));

    store.dispatch("fetch", json!({"id": 3})).unwrap();

    assert!(mutations.borrow().is_empty());
    assert_eq!(
        *actions.borrow(),
        vec![(
            CallDescriptor::new("fetch", Some(json!({"id": 3}))),
            json!({"n": 1})
        )]
    );
}

#[test]
fn test_namespaced_dispatch_reaches_action_subscribers() {
    let store = MockStore::with_options(StoreOptions::new().with_state(json!({"cart": {"n": 0}})));
    let actions: Log = Log::default();
    store.subscribe_action(recording(&actions));

    let cart = store.modules().resolve("cart/").unwrap().unwrap();
    cart.dispatch("checkout", json!(true)).unwrap();

    assert_eq!(actions.borrow()[0].0.type_name, "cart/checkout");
}

// ============================================================================
// Ordering and duplicates
// ============================================================================

#[test]
fn test_handlers_run_in_subscription_order() {
    let store = MockStore::new();
    let order = Rc::new(RefCell::new(Vec::new()));
    for tag in ["first", "second", "third"] {
        let order = Rc::clone(&order);
        store.subscribe(move |_, _| {
            order.borrow_mut().push(tag);
            Ok(())
        });
    }

    store.commit("m", json!(null)).unwrap();
    assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
}

#[test]
fn test_same_handler_registered_twice() {
    let store = MockStore::new();
    let log: Log = Log::default();
    let handler: Handler = Rc::new(recording(&log));

    let first = store.subscribe_handler(SubscriptionKind::Mutation, Rc::clone(&handler));
    let second = store.subscribe_handler(SubscriptionKind::Mutation, handler);

    store.commit("a", json!(null)).unwrap();
    assert_eq!(log.borrow().len(), 2);

    assert!(second.unsubscribe());
    store.commit("b", json!(null)).unwrap();
    assert_eq!(log.borrow().len(), 3);

    assert!(first.unsubscribe());
    store.commit("c", json!(null)).unwrap();
    assert_eq!(log.borrow().len(), 3);
}

#[test]
fn test_handlers_see_earlier_handler_mutations() {
    let store = MockStore::with_options(StoreOptions::new().with_state(json!({"n": 0})));
    let seen = Rc::new(RefCell::new(None));

    store.subscribe(|_, state| {
        state.set("n", 1);
        Ok(())
    });
    let seen_clone = Rc::clone(&seen);
    store.subscribe(move |_, state| {
        *seen_clone.borrow_mut() = state.get("n");
        Ok(())
    });

    store.commit("m", json!(null)).unwrap();
    assert_eq!(*seen.borrow(), Some(json!(1)));
    assert_eq!(store.state().get("n"), Some(json!(1)));
}

// ============================================================================
// Errors and re-entrancy
// ============================================================================

#[test]
fn test_handler_error_propagates_and_aborts() {
    let store = MockStore::new();
    let log: Log = Log::default();
    store.subscribe(|descriptor, _| Err(format!("rejected {}", descriptor.type_name).into()));
    store.subscribe(recording(&log));

    let err = store.commit("m", json!(1)).unwrap_err();

    assert!(matches!(
        err,
        StoreError::Subscriber { kind: SubscriptionKind::Mutation, .. }
    ));
    assert!(err.to_string().contains("rejected m"));
    assert!(log.borrow().is_empty());
    store.commit_recorder().assert_called_with("m", &[json!(1)]);
}

#[test]
fn test_reentrant_commit_from_handler() {
    let store = MockStore::new();
    let log: Log = Log::default();
    let weak = store.downgrade();
    store.subscribe(move |descriptor, _| {
        if descriptor.type_name == "outer" {
            weak.upgrade()?.commit("inner", json!(null))?;
        }
        Ok(())
    });
    store.subscribe(recording(&log));

    store.commit("outer", json!(null)).unwrap();

    let types: Vec<String> = log.borrow().iter().map(|(d, _)| d.type_name.clone()).collect();
    assert_eq!(types, vec!["inner", "outer"]);
    store.commit_recorder().assert_called_times(2);
}

#[test]
fn test_handler_can_subscribe_during_notification() {
    let store = MockStore::new();
    let log: Log = Log::default();
    let weak = store.downgrade();
    let log_clone = Rc::clone(&log);
    let added = Rc::new(RefCell::new(false));
    store.subscribe(move |_, _| {
        if !*added.borrow() {
            *added.borrow_mut() = true;
            weak.upgrade()?.subscribe(recording(&log_clone));
        }
        Ok(())
    });

    store.commit("first", json!(null)).unwrap();
    assert!(log.borrow().is_empty());

    store.commit("second", json!(null)).unwrap();
    assert_eq!(log.borrow().len(), 1);
}
