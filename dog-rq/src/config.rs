//! Settings read from the app's `rq.` configuration namespace.
//!
//! | Key | Value |
//! |---|---|
//! | `rq.connection` | default connection: object, URL or reference |
//! | `rq.connection_class` | `"redis"` (default) or `"memory"` |
//! | `rq.queues` | list of queue names to provision |
//! | `rq.queue_connections` | object of queue name to connection spec, or `null` |
//! | `rq.async` | force the execution mode; unset follows `testing` |
//!
//! Older flat keys (`rq.<name>.host` and friends) are translated by
//! [`crate::legacy`].

use dog_core::{DogApp, DogConfigSnapshot};
use dog_queue::ConnectionParams;
use indexmap::IndexMap;
use serde_json::Value;

use crate::legacy;
use crate::{RqError, RqResult};

pub const NAMESPACE: &str = "rq.";
pub const DEFAULT_QUEUE: &str = "default";
pub const DEFAULT_CONNECTION_CLASS: &str = "redis";

/// How one named connection is declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionSpec {
    /// Structured parameters
    Params(ConnectionParams),
    /// A connection URL, anything containing `://`
    Url(String),
    /// The name of another connection to share
    Reference(String),
}

impl ConnectionSpec {
    /// Parse a config value; `null` means "no explicit connection".
    pub fn from_value(key: &str, value: &Value) -> RqResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) if s.contains("://") => Ok(Some(Self::Url(s.clone()))),
            Value::String(s) => Ok(Some(Self::Reference(s.clone()))),
            Value::Object(_) => serde_json::from_value(value.clone())
                .map(|params| Some(Self::Params(params)))
                .map_err(|e| RqError::invalid_config(key, e)),
            other => Err(RqError::invalid_config(
                key,
                format!("expected an object, a URL or a connection name, got {other}"),
            )),
        }
    }
}

/// Typed view of the `rq.` namespace
#[derive(Debug, Clone, Default)]
pub struct RqSettings {
    /// Spec of the default connection, `None` for `localhost:6379/0`
    pub connection: Option<ConnectionSpec>,
    pub connection_class: Option<String>,
    pub queues: Vec<String>,
    pub queue_connections: IndexMap<String, Option<ConnectionSpec>>,
    pub is_async: Option<bool>,
}

impl RqSettings {
    /// Read the app's settings, translating legacy flat keys if present.
    pub fn from_app(app: &DogApp) -> RqResult<Self> {
        let ns = app.namespace(NAMESPACE);
        let mut settings = Self::from_namespace(&ns)?;

        if let Some(translated) = legacy::translate(&ns)? {
            translated.merge_into(&mut settings);
        }
        Ok(settings)
    }

    /// Parse the structured keys of an already-stripped namespace.
    pub fn from_namespace(ns: &DogConfigSnapshot) -> RqResult<Self> {
        let connection = match ns.get("connection") {
            Some(value) => ConnectionSpec::from_value("connection", value)?,
            None => None,
        };

        let connection_class = ns
            .get_as::<String>("connection_class")
            .map_err(|e| RqError::invalid_config("connection_class", e))?;

        let queues = ns
            .get_as::<Vec<String>>("queues")
            .map_err(|e| RqError::invalid_config("queues", e))?
            .unwrap_or_default();

        let mut queue_connections = IndexMap::new();
        match ns.get("queue_connections") {
            None | Some(Value::Null) => {}
            Some(Value::Object(map)) => {
                for (name, value) in map {
                    let key = format!("queue_connections.{name}");
                    queue_connections.insert(name.clone(), ConnectionSpec::from_value(&key, value)?);
                }
            }
            Some(other) => {
                return Err(RqError::invalid_config(
                    "queue_connections",
                    format!("expected an object, got {other}"),
                ))
            }
        }

        let is_async = ns
            .get_as::<bool>("async")
            .map_err(|e| RqError::invalid_config("async", e))?;

        Ok(Self {
            connection,
            connection_class,
            queues,
            queue_connections,
            is_async,
        })
    }

    pub fn connection_class(&self) -> &str {
        self.connection_class
            .as_deref()
            .unwrap_or(DEFAULT_CONNECTION_CLASS)
    }

    /// Every named connection spec, `"default"` taken from `rq.connection`.
    pub fn connection_specs(&self) -> IndexMap<String, Option<ConnectionSpec>> {
        let mut specs = self.queue_connections.clone();
        specs.insert(DEFAULT_QUEUE.to_string(), self.connection.clone());
        specs
    }
}
