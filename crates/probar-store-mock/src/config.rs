//! Store construction options and on-disk fixtures.

use crate::recorder::{RecorderFactory, SpyFactory};
use crate::result::{StoreError, StoreResult};
use crate::value::Getters;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// Options for [`MockStore::with_options`](crate::MockStore::with_options)
///
/// Defaults: empty state, empty getters, [`SpyFactory`] recorders.
#[derive(Clone)]
pub struct StoreOptions {
    pub(crate) state: Value,
    pub(crate) getters: Getters,
    pub(crate) recorder_factory: Rc<dyn RecorderFactory>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            state: Value::Object(Map::new()),
            getters: Getters::new(),
            recorder_factory: Rc::new(SpyFactory),
        }
    }
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("state", &self.state)
            .field("getters", &self.getters)
            .finish_non_exhaustive()
    }
}

impl StoreOptions {
    /// Create default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial state tree
    #[must_use]
    pub fn with_state(mut self, state: Value) -> Self {
        self.state = state;
        self
    }

    /// Initial getters, replacing any set so far
    #[must_use]
    pub fn with_getters(mut self, getters: impl Into<Getters>) -> Self {
        self.getters = getters.into();
        self
    }

    /// Add a single initial getter
    #[must_use]
    pub fn with_getter(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.getters.insert(key, value);
        self
    }

    /// Factory used to build the commit and dispatch recorders
    #[must_use]
    pub fn with_recorder_factory(mut self, factory: Rc<dyn RecorderFactory>) -> Self {
        self.recorder_factory = factory;
        self
    }

    /// Initial state tree
    #[must_use]
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Initial getters
    #[must_use]
    pub fn getters(&self) -> &Getters {
        &self.getters
    }
}

/// Serializable store seed
///
/// ```yaml
/// state:
///   counter: 0
///   cart:
///     items: []
/// getters:
///   cart/total: 0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreFixture {
    /// Initial state tree
    pub state: Map<String, Value>,
    /// Initial getters
    pub getters: Map<String, Value>,
}

impl StoreFixture {
    /// Parse a JSON fixture
    pub fn from_json_str(input: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Parse a YAML fixture
    pub fn from_yaml_str(input: &str) -> StoreResult<Self> {
        Ok(serde_yaml_ng::from_str(input)?)
    }

    /// Load a fixture file; `.json`, `.yaml` and `.yml` are recognized
    pub fn from_path(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let format = match extension.as_deref() {
            Some("json") => FixtureFormat::Json,
            Some("yaml" | "yml") => FixtureFormat::Yaml,
            _ => {
                return Err(StoreError::InvalidFixture {
                    message: format!(
                        "{}: unsupported fixture extension (expected .json, .yaml or .yml)",
                        path.display()
                    ),
                })
            }
        };
        let content = fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), ?format, "loading store fixture");
        match format {
            FixtureFormat::Json => Self::from_json_str(&content),
            FixtureFormat::Yaml => Self::from_yaml_str(&content),
        }
    }

    /// Options seeded from this fixture, with default recorders
    #[must_use]
    pub fn into_options(self) -> StoreOptions {
        StoreOptions::new()
            .with_state(Value::Object(self.state))
            .with_getters(self.getters)
    }
}

impl From<StoreFixture> for StoreOptions {
    fn from(fixture: StoreFixture) -> Self {
        fixture.into_options()
    }
}

#[derive(Debug, Clone, Copy)]
enum FixtureFormat {
    Json,
    Yaml,
}
