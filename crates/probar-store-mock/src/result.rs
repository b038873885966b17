//! Result and error types for the store mock.

use crate::subscription::SubscriptionKind;
use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error returned by a subscriber handler
///
/// Anything convertible into a boxed error works, including `&str`,
/// `String` and [`StoreError`] itself (so handlers can `?` a nested commit).
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of subscriber handlers
pub type HandlerResult = Result<(), HandlerError>;

/// Errors that can occur in the store mock
#[derive(Debug, Error)]
pub enum StoreError {
    /// A namespaced key named a module that is missing from state
    #[error("module \"{module}\" not defined in state:\n{state_dump}")]
    ModuleNotFound {
        /// Outermost module segment of the requested key
        module: String,
        /// Pretty-printed root state at the time of the lookup
        state_dump: String,
    },

    /// A subscriber handler failed while being notified
    #[error("{kind} subscriber failed on \"{type_name}\": {source}")]
    Subscriber {
        /// Which registry the handler belonged to
        kind: SubscriptionKind,
        /// Type of the commit/dispatch being notified
        type_name: String,
        /// Error returned by the handler
        #[source]
        source: HandlerError,
    },

    /// The store backing a namespace map or context was dropped
    #[error("store has been dropped")]
    StoreDropped,

    /// Fixture document could not be used to seed a store
    #[error("Invalid fixture: {message}")]
    InvalidFixture {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_not_found_display() {
        let err = StoreError::ModuleNotFound {
            module: "cart".to_string(),
            state_dump: "{}".to_string(),
        };
        assert_eq!(err.to_string(), "module \"cart\" not defined in state:\n{}");
    }

    #[test]
    fn test_subscriber_error_keeps_source() {
        let err = StoreError::Subscriber {
            kind: SubscriptionKind::Action,
            type_name: "fetch".to_string(),
            source: "boom".into(),
        };
        assert_eq!(err.to_string(), "action subscriber failed on \"fetch\": boom");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_store_error_converts_into_handler_error() {
        let handler_err: HandlerError = StoreError::StoreDropped.into();
        assert_eq!(handler_err.to_string(), "store has been dropped");
    }
}
