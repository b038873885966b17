//! Call recorders for commits and dispatches.
//!
//! A recorder is the spy behind `store.commit` and `store.dispatch`: every
//! invocation is appended to an inspectable history and then forwarded to
//! an optional notifier. Recorders are pluggable through
//! [`RecorderFactory`] so a suite can swap in its own spy type; the store
//! itself only relies on invocation being synchronous and in call order.

use crate::result::StoreResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Callback run by a recorder after each recorded invocation
pub type Notifier = Rc<dyn Fn(&str, &[Value]) -> StoreResult<()>>;

/// A single recorded invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedCall {
    /// Commit/dispatch type, including any namespace prefix
    pub name: String,
    /// Arguments after the type
    pub args: Vec<Value>,
}

impl RecordedCall {
    /// Create a recorded call
    #[must_use]
    pub fn new(name: &str, args: &[Value]) -> Self {
        Self {
            name: name.to_string(),
            args: args.to_vec(),
        }
    }

    /// First argument, which subscribers receive as the payload
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.args.first()
    }

    /// Whether this call matches a type and argument list exactly
    #[must_use]
    pub fn matches(&self, name: &str, args: &[Value]) -> bool {
        self.name == name && self.args == args
    }
}

impl fmt::Display for RecordedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

/// An instrumented callable with an inspectable, resettable history
pub trait Recorder {
    /// Record a call, run the notifier, and return the configured value
    ///
    /// The call is recorded before the notifier runs, so it stays in the
    /// history even when the notifier fails.
    fn invoke(&self, name: &str, args: &[Value]) -> StoreResult<Value>;

    /// Recorded calls in invocation order
    fn calls(&self) -> Vec<RecordedCall>;

    /// Clear the history and configured return value, keeping the notifier
    fn reset(&self);

    /// Configure what subsequent invocations return
    fn returns(&self, value: Value);

    /// Number of recorded calls
    fn call_count(&self) -> usize {
        self.calls().len()
    }

    /// Whether anything was recorded
    fn was_called(&self) -> bool {
        self.call_count() > 0
    }

    /// Whether any recorded call matches exactly
    fn was_called_with(&self, name: &str, args: &[Value]) -> bool {
        self.calls().iter().any(|call| call.matches(name, args))
    }

    /// Most recent call
    fn last_call(&self) -> Option<RecordedCall> {
        self.calls().pop()
    }

    /// Call at a zero-based position
    fn nth_call(&self, index: usize) -> Option<RecordedCall> {
        self.calls().into_iter().nth(index)
    }

    /// Assert that some recorded call matches exactly
    ///
    /// # Panics
    ///
    /// Panics listing the recorded calls if none matches.
    fn assert_called_with(&self, name: &str, args: &[Value]) {
        let calls = self.calls();
        assert!(
            calls.iter().any(|call| call.matches(name, args)),
            "Expected call {} but recorded calls were: [{}]",
            RecordedCall::new(name, args),
            describe_calls(&calls)
        );
    }

    /// Assert that nothing was recorded
    ///
    /// # Panics
    ///
    /// Panics listing the recorded calls if any exist.
    fn assert_not_called(&self) {
        let calls = self.calls();
        assert!(
            calls.is_empty(),
            "Expected no calls but recorded {}: [{}]",
            calls.len(),
            describe_calls(&calls)
        );
    }

    /// Assert the exact number of recorded calls
    ///
    /// # Panics
    ///
    /// Panics if the count differs.
    fn assert_called_times(&self, expected: usize) {
        let calls = self.calls();
        assert_eq!(
            calls.len(),
            expected,
            "Expected {} call(s) but recorded {}: [{}]",
            expected,
            calls.len(),
            describe_calls(&calls)
        );
    }
}

fn describe_calls(calls: &[RecordedCall]) -> String {
    calls
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builds and resets recorders for a store
///
/// Each store asks its factory for two recorders at construction and hands
/// them back to [`RecorderFactory::reset`] on every store reset.
pub trait RecorderFactory {
    /// Create a recorder wired to an optional notifier
    fn create(&self, notifier: Option<Notifier>) -> Rc<dyn Recorder>;

    /// Clear a recorder's history; must be idempotent
    fn reset(&self, recorder: &dyn Recorder) {
        recorder.reset();
    }
}

/// Default in-memory recorder
#[derive(Default)]
pub struct Spy {
    calls: RefCell<Vec<RecordedCall>>,
    return_value: RefCell<Value>,
    notifier: Option<Notifier>,
}

impl fmt::Debug for Spy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spy")
            .field("calls", &self.calls.borrow().len())
            .field("return_value", &self.return_value.borrow())
            .field("has_notifier", &self.notifier.is_some())
            .finish()
    }
}

impl Spy {
    /// Create a spy with no notifier
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a spy that runs `notifier` after each recorded call
    #[must_use]
    pub fn with_notifier(notifier: Notifier) -> Self {
        Self {
            notifier: Some(notifier),
            ..Self::default()
        }
    }
}

impl Recorder for Spy {
    fn invoke(&self, name: &str, args: &[Value]) -> StoreResult<Value> {
        self.calls.borrow_mut().push(RecordedCall::new(name, args));
        if let Some(notifier) = &self.notifier {
            notifier(name, args)?;
        }
        Ok(self.return_value.borrow().clone())
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    fn reset(&self) {
        self.calls.borrow_mut().clear();
        *self.return_value.borrow_mut() = Value::Null;
    }

    fn returns(&self, value: Value) {
        *self.return_value.borrow_mut() = value;
    }
}

/// Factory producing [`Spy`] recorders
#[derive(Debug, Default, Clone, Copy)]
pub struct SpyFactory;

impl RecorderFactory for SpyFactory {
    fn create(&self, notifier: Option<Notifier>) -> Rc<dyn Recorder> {
        match notifier {
            Some(notifier) => Rc::new(Spy::with_notifier(notifier)),
            None => Rc::new(Spy::new()),
        }
    }
}
