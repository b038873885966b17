//! Namespaced module resolution.
//!
//! Components bound to a namespaced module ask the store's module map for a
//! key such as `"cart/"` or `"cart/nested/"` and expect a context that
//! reads the module's slice of state and prefixes its commits and
//! dispatches. [`NamespaceMap`] builds that context on every lookup, with
//! no caching, from the store's current state.
//!
//! ```
//! use probar_store_mock::{MockStore, Recorder, StoreOptions};
//! use serde_json::json;
//!
//! let store = MockStore::with_options(
//!     StoreOptions::new().with_state(json!({"cart": {"items": 2}})),
//! );
//! let cart = store.modules().resolve("cart/").unwrap().unwrap();
//! assert_eq!(cart.state().get("items"), Some(json!(2)));
//!
//! cart.dispatch("checkout", json!("now")).unwrap();
//! store.dispatch_recorder().assert_called_with("cart/checkout", &[json!("now")]);
//! ```

use crate::result::{StoreError, StoreResult};
use crate::store::{MockStore, StoreInner};
use crate::value::{child, child_mut, is_truthy, Getters, SharedState};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Separator between module names in a namespaced key
pub const NAMESPACE_SEPARATOR: char = '/';

/// Key used for a property-style lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// Ordinary string key; may be a module path
    Name(String),
    /// Non-string probe (the equivalent of a symbol); never a module path
    Symbol(String),
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Outcome of a property-style lookup
#[derive(Debug, Clone)]
pub enum Lookup {
    /// The key named a module
    Module(ModuleContext),
    /// Plain property on the backing table, if defined
    Property(Option<Value>),
}

impl Lookup {
    /// The module context, if the key named a module
    #[must_use]
    pub fn into_module(self) -> Option<ModuleContext> {
        match self {
            Self::Module(context) => Some(context),
            Self::Property(_) => None,
        }
    }
}

/// Module names in a namespaced key, or `None` if the key is not one
///
/// The segment after the last separator is dropped, so `"a/b/"` yields
/// `["a", "b"]` and `"a/b"` yields `["a"]`.
#[must_use]
pub fn module_path(key: &str) -> Option<Vec<&str>> {
    let mut segments: Vec<&str> = key.split(NAMESPACE_SEPARATOR).collect();
    if segments.len() <= 1 {
        return None;
    }
    segments.pop();
    Some(segments)
}

struct NamespaceInner {
    store: Weak<StoreInner>,
    properties: RefCell<Map<String, Value>>,
}

/// Lookup table from module keys to module contexts
///
/// One instance exists per store; clones share it, and every context it
/// produces hands the same instance back from [`ModuleContext::modules`].
#[derive(Clone)]
pub struct NamespaceMap {
    inner: Rc<NamespaceInner>,
}

impl fmt::Debug for NamespaceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceMap")
            .field("properties", &*self.inner.properties.borrow())
            .field("attached", &(self.inner.store.strong_count() > 0))
            .finish()
    }
}

impl NamespaceMap {
    pub(crate) fn new(store: Weak<StoreInner>) -> Self {
        Self {
            inner: Rc::new(NamespaceInner {
                store,
                properties: RefCell::new(Map::new()),
            }),
        }
    }

    /// Property-style lookup
    ///
    /// Symbols and keys without a separator read the plain property table;
    /// namespaced keys resolve a module.
    pub fn get(&self, key: impl Into<PropertyKey>) -> StoreResult<Lookup> {
        match key.into() {
            PropertyKey::Symbol(name) => Ok(Lookup::Property(self.property(&name))),
            PropertyKey::Name(name) => match self.resolve(&name)? {
                Some(context) => Ok(Lookup::Module(context)),
                None => Ok(Lookup::Property(self.property(&name))),
            },
        }
    }

    /// Resolve a namespaced key to its module context
    ///
    /// Returns `Ok(None)` for keys that are not module paths. Every module
    /// along the path must be present and truthy in the current state;
    /// otherwise the error names the outermost module of the key.
    pub fn resolve(&self, key: &str) -> StoreResult<Option<ModuleContext>> {
        let Some(modules) = module_path(key) else {
            return Ok(None);
        };
        let store = self.store()?;
        let state = store.state();

        let found = state.with(|root| {
            modules
                .iter()
                .try_fold(root, |current, module| {
                    child(current, module).filter(|value| is_truthy(value))
                })
                .is_some()
        });

        if !found {
            let module = modules.first().copied().unwrap_or_default().to_string();
            tracing::debug!(key, module = %module, "module not found in state");
            return Err(StoreError::ModuleNotFound {
                module,
                state_dump: state.to_pretty_json()?,
            });
        }

        tracing::trace!(key, depth = modules.len(), "resolved module");
        Ok(Some(ModuleContext {
            namespace: key.to_string(),
            state: ModuleState {
                root: state,
                path: modules.iter().map(|m| (*m).to_string()).collect(),
            },
            store: self.inner.store.clone(),
            modules: self.clone(),
        }))
    }

    /// Define a plain property on the backing table
    pub fn define_property(&self, name: &str, value: impl Into<Value>) {
        self.inner
            .properties
            .borrow_mut()
            .insert(name.to_string(), value.into());
    }

    /// Plain property from the backing table
    #[must_use]
    pub fn property(&self, name: &str) -> Option<Value> {
        self.inner.properties.borrow().get(name).cloned()
    }

    /// Whether two maps are the same instance
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn store(&self) -> StoreResult<MockStore> {
        self.inner
            .store
            .upgrade()
            .map(MockStore::from_inner)
            .ok_or(StoreError::StoreDropped)
    }
}

/// Module-scoped view of the store
///
/// Holds the store weakly, so a context captured by a subscriber does not
/// keep the store alive. Calls made after the store is dropped fail with
/// [`StoreError::StoreDropped`].
#[derive(Clone)]
pub struct ModuleContext {
    namespace: String,
    state: ModuleState,
    store: Weak<StoreInner>,
    modules: NamespaceMap,
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("namespace", &self.namespace)
            .field("state", &self.state)
            .field("attached", &(self.store.strong_count() > 0))
            .finish()
    }
}

impl ModuleContext {
    /// Key this context was resolved from, used as the call prefix
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Module names from the root down to this module
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.state.path
    }

    /// Commit `<namespace><name>` on the root store
    pub fn commit(&self, name: &str, payload: impl Into<Value>) -> StoreResult<Value> {
        self.store()?.commit(&self.qualify(name), payload)
    }

    /// Commit `<namespace><name>` with any number of arguments
    pub fn commit_args(&self, name: &str, args: &[Value]) -> StoreResult<Value> {
        self.store()?.commit_args(&self.qualify(name), args)
    }

    /// Dispatch `<namespace><name>` on the root store
    pub fn dispatch(&self, name: &str, payload: impl Into<Value>) -> StoreResult<Value> {
        self.store()?.dispatch(&self.qualify(name), payload)
    }

    /// Dispatch `<namespace><name>` with any number of arguments
    pub fn dispatch_args(&self, name: &str, args: &[Value]) -> StoreResult<Value> {
        self.store()?.dispatch_args(&self.qualify(name), args)
    }

    /// This module's slice of state
    #[must_use]
    pub fn state(&self) -> &ModuleState {
        &self.state
    }

    /// Root getters, unfiltered
    pub fn getters(&self) -> StoreResult<Getters> {
        Ok(self.store()?.getters())
    }

    /// Root getter by its full key
    pub fn getter(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.store()?.getter(key))
    }

    /// The module map this context came from
    #[must_use]
    pub fn modules(&self) -> NamespaceMap {
        self.modules.clone()
    }

    fn qualify(&self, name: &str) -> String {
        format!("{}{}", self.namespace, name)
    }

    fn store(&self) -> StoreResult<MockStore> {
        self.store
            .upgrade()
            .map(MockStore::from_inner)
            .ok_or(StoreError::StoreDropped)
    }
}

/// Live view of a module's sub-tree
///
/// Reads and writes go through the state tree that was current when the
/// module was resolved, so they see later mutations of that tree.
#[derive(Debug, Clone)]
pub struct ModuleState {
    root: SharedState,
    path: Vec<String>,
}

impl ModuleState {
    /// Copy of the sub-tree, or `None` if it has since been removed
    #[must_use]
    pub fn snapshot(&self) -> Option<Value> {
        self.with(|value| value.cloned())
    }

    /// Read the sub-tree without copying it
    pub fn with<R>(&self, f: impl FnOnce(Option<&Value>) -> R) -> R {
        self.root.with(|root| {
            let node = self
                .path
                .iter()
                .try_fold(root, |current, segment| child(current, segment));
            f(node)
        })
    }

    /// Field of the sub-tree
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.with(|node| node.and_then(|value| child(value, key)).cloned())
    }

    /// Set a field of the sub-tree, returning the previous value
    ///
    /// Does nothing and returns `None` if the sub-tree is gone or is not a
    /// mapping.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Option<Value> {
        let value = value.into();
        self.root.update(|root| {
            let node = self
                .path
                .iter()
                .try_fold(root, |current, segment| child_mut(current, segment))?;
            node.as_object_mut()?.insert(key.to_string(), value)
        })
    }

    /// Root state handle this view reads through
    #[must_use]
    pub fn root(&self) -> &SharedState {
        &self.root
    }
}
