//! Subscriber registries for commits and dispatches.

use crate::result::{HandlerResult, StoreError, StoreResult};
use crate::value::SharedState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Subscriber callback: `(descriptor, current state)`
pub type Handler = Rc<dyn Fn(&CallDescriptor, &SharedState) -> HandlerResult>;

/// What a subscriber receives about the triggering call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallDescriptor {
    /// Commit/dispatch type, including any namespace prefix
    #[serde(rename = "type")]
    pub type_name: String,
    /// First argument of the call, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl CallDescriptor {
    /// Create a descriptor
    #[must_use]
    pub fn new(type_name: &str, payload: Option<Value>) -> Self {
        Self {
            type_name: type_name.to_string(),
            payload,
        }
    }
}

/// Which registry a subscription lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionKind {
    /// Notified on commit
    Mutation,
    /// Notified on dispatch
    Action,
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mutation => write!(f, "mutation"),
            Self::Action => write!(f, "action"),
        }
    }
}

struct Entry {
    id: u64,
    handler: Handler,
}

/// Ordered list of handlers for one kind of call
///
/// The same handler may be registered several times; each registration is
/// notified once per call and removed independently.
pub struct SubscriberRegistry {
    kind: SubscriptionKind,
    entries: Rc<RefCell<Vec<Entry>>>,
    next_id: Cell<u64>,
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("kind", &self.kind)
            .field("handlers_count", &self.entries.borrow().len())
            .finish()
    }
}

impl SubscriberRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new(kind: SubscriptionKind) -> Self {
        Self {
            kind,
            entries: Rc::new(RefCell::new(Vec::new())),
            next_id: Cell::new(0),
        }
    }

    /// Registry kind
    #[must_use]
    pub fn kind(&self) -> SubscriptionKind {
        self.kind
    }

    /// Append a handler
    pub fn subscribe<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(&CallDescriptor, &SharedState) -> HandlerResult + 'static,
    {
        self.subscribe_handler(Rc::new(handler))
    }

    /// Append an already shared handler
    pub fn subscribe_handler(&self, handler: Handler) -> Unsubscribe {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push(Entry { id, handler });
        tracing::trace!(kind = %self.kind, id, "subscribed");
        Unsubscribe {
            entries: Rc::downgrade(&self.entries),
            id,
        }
    }

    /// Number of registrations
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Drop every registration
    ///
    /// Ids are never reused, so unsubscribe handles from before the clear
    /// become no-ops.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Call every handler in registration order
    ///
    /// No borrow is held while a handler runs, so handlers may commit,
    /// subscribe or unsubscribe. A registration removed during the loop is
    /// skipped; one added during the loop waits for the next call. The first
    /// failing handler stops the loop.
    pub fn notify(&self, descriptor: &CallDescriptor, state: &SharedState) -> StoreResult<()> {
        let snapshot: Vec<(u64, Handler)> = self
            .entries
            .borrow()
            .iter()
            .map(|entry| (entry.id, Rc::clone(&entry.handler)))
            .collect();

        tracing::trace!(
            kind = %self.kind,
            type_name = %descriptor.type_name,
            handlers = snapshot.len(),
            "notifying subscribers"
        );

        for (id, handler) in snapshot {
            if !self.is_registered(id) {
                continue;
            }
            handler(descriptor, state).map_err(|source| StoreError::Subscriber {
                kind: self.kind,
                type_name: descriptor.type_name.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn is_registered(&self, id: u64) -> bool {
        self.entries.borrow().iter().any(|entry| entry.id == id)
    }
}

/// Handle removing one registration from its registry
#[derive(Clone)]
pub struct Unsubscribe {
    entries: Weak<RefCell<Vec<Entry>>>,
    id: u64,
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe").field("id", &self.id).finish()
    }
}

impl Unsubscribe {
    /// Remove the registration this handle was created for
    ///
    /// Returns `false` if it was already removed, cleared by a reset, or
    /// the registry no longer exists.
    pub fn unsubscribe(&self) -> bool {
        let Some(entries) = self.entries.upgrade() else {
            return false;
        };
        let mut entries = entries.borrow_mut();
        match entries.iter().position(|entry| entry.id == self.id) {
            Some(index) => {
                entries.remove(index);
                tracing::trace!(id = self.id, "unsubscribed");
                true
            }
            None => false,
        }
    }
}
