//! # DogRS Configuration
//!
//! DogRS includes a minimal, framework-agnostic configuration
//! system based on a flat key/value store. Keys are dotted paths
//! (`rq.connection`, `paginate.default`) and values are JSON values,
//! so structured settings (lists, maps, null) can live next to plain
//! strings and numbers.
//!
//! ## Setting and reading values
//! ```rust
//! use dog_core::DogApp;
//! use serde_json::json;
//!
//! let app = DogApp::new("docs");
//!
//! app.set("paginate.default", 10);
//! app.set("rq.queues", json!(["high", "low"]));
//!
//! assert_eq!(app.get("paginate.default"), Some(json!(10)));
//! ```
//!
//! ## Namespaces
//! Extensions read their settings as a namespace: every key under a
//! prefix, with the prefix stripped.
//!
//! ```rust
//! use dog_core::DogApp;
//!
//! let app = DogApp::new("docs");
//! app.set("rq.async", true);
//! app.set("rq.queues", serde_json::json!(["low"]));
//!
//! let ns = app.namespace("rq.");
//! assert_eq!(ns.get_bool("async"), Some(true));
//! ```
//!
//! ## Environment overrides
//! `load_env("DOG")` maps `DOG__RQ__ASYNC=true` to `rq.async = true`.
//! Values that parse as JSON are stored as JSON, anything else is
//! stored as a string.

use std::collections::BTreeMap;
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Default)]
pub struct DogConfig {
    values: HashMap<String, Value>,
}

impl DogConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key.
    ///
    /// Example: config.set("paginate.default", 10)
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    ///
    /// Returns None if the key is not present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Remove a key, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn snapshot(&self) -> DogConfigSnapshot {
        DogConfigSnapshot::new(self.values.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    /// All keys starting with `prefix`, with the prefix stripped.
    pub fn namespace(&self, prefix: &str) -> DogConfigSnapshot {
        let map = self
            .values
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(prefix)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (rest.to_string(), v.clone()))
            })
            .collect();
        DogConfigSnapshot::new(map)
    }

    /// Apply `PREFIX__A__B=value` environment variables as `a.b = value`.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    pub(crate) fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{prefix}__");

        for (key, raw) in vars {
            let Some(stripped) = key.strip_prefix(&marker) else {
                continue;
            };

            let normalized = stripped.to_lowercase().replace("__", ".");
            let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
            tracing::debug!(key = %normalized, "config override from environment");
            self.values.insert(normalized, value);
        }
    }
}

/// Read-only copy of (part of) the configuration.
///
/// Keys are kept sorted so iteration is deterministic.
#[derive(Debug, Clone, Default)]
pub struct DogConfigSnapshot {
    map: BTreeMap<String, Value>,
}

impl DogConfigSnapshot {
    pub(crate) fn new(map: BTreeMap<String, Value>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        match self.get(key)? {
            Value::Number(n) => n.as_u64().map(|n| n as usize),
            Value::String(s) => s.parse::<usize>().ok(),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse::<bool>().ok(),
            _ => None,
        }
    }

    /// Deserialize a single key into `T`.
    ///
    /// Missing keys and `null` both yield `Ok(None)`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> serde_json::Result<Option<T>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => serde_json::from_value(v.clone()).map(Some),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
