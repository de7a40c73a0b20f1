//! Translation of the old flat configuration format.
//!
//! Before `rq.connection` / `rq.queues` / `rq.queue_connections`, every
//! queue was configured with flat keys:
//!
//! ```text
//! rq.default.host = "cache"     rq.low.port = 6380
//! rq.default.port = 6379        rq.low.db   = 1
//! rq.high.url = "redis://cache:6379/2"
//! ```
//!
//! `default` becomes the default connection, every other name becomes a
//! queue with its own connection. A name without a URL takes the fields it
//! does not set from the `default` keys. A URL plus a `db` key selects that
//! database. Keys with any other field name are left alone.

use dog_core::DogConfigSnapshot;
use dog_queue::ConnectionParams;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::config::{ConnectionSpec, RqSettings, DEFAULT_QUEUE, NAMESPACE};
use crate::{RqError, RqResult};

const FIELDS: [&str; 5] = ["host", "port", "password", "db", "url"];

/// Top-level `rq.` keys of the structured format; never legacy queue names.
const RESERVED: [&str; 5] = ["connection", "connection_class", "queues", "queue_connections", "async"];

#[derive(Debug, Default)]
struct LegacyEntry {
    host: Option<String>,
    port: Option<u16>,
    password: Option<String>,
    db: Option<u32>,
    url: Option<String>,
}

impl LegacyEntry {
    fn set(&mut self, key: &str, field: &str, value: &Value) -> RqResult<()> {
        match field {
            "host" => self.host = text(key, value)?,
            "password" => self.password = text(key, value)?,
            "url" => self.url = text(key, value)?,
            "port" => self.port = number(key, value)?,
            "db" => self.db = number(key, value)?,
            _ => {}
        }
        Ok(())
    }

    fn spec(&self, fallback: Option<&LegacyEntry>) -> RqResult<ConnectionSpec> {
        if let Some(url) = &self.url {
            return Ok(ConnectionSpec::Url(match self.db {
                Some(db) => url_with_db(url, db)?,
                None => url.clone(),
            }));
        }

        let defaults = ConnectionParams::default();
        let inherit = |own: &Option<String>, pick: fn(&LegacyEntry) -> &Option<String>| {
            own.clone().or_else(|| fallback.and_then(|f| pick(f).clone()))
        };

        Ok(ConnectionSpec::Params(ConnectionParams {
            host: inherit(&self.host, |e| &e.host).unwrap_or(defaults.host),
            port: self
                .port
                .or_else(|| fallback.and_then(|f| f.port))
                .unwrap_or(defaults.port),
            db: self
                .db
                .or_else(|| fallback.and_then(|f| f.db))
                .unwrap_or(defaults.db),
            password: inherit(&self.password, |e| &e.password),
            username: None,
        }))
    }
}

fn text(key: &str, value: &Value) -> RqResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(RqError::invalid_config(key, format!("expected a string, got {other}"))),
    }
}

fn number<T>(key: &str, value: &Value) -> RqResult<Option<T>>
where
    T: TryFrom<u64> + std::str::FromStr,
{
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_u64().and_then(|n| T::try_from(n).ok()),
        Value::String(s) => s.parse::<T>().ok(),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| RqError::invalid_config(key, format!("expected a number, got {value}")))
}

fn url_with_db(raw: &str, db: u32) -> RqResult<String> {
    let mut url = Url::parse(raw).map_err(|e| RqError::invalid_config("url", format!("{raw}: {e}")))?;
    url.set_path(&format!("/{db}"));
    Ok(url.into())
}

/// Structured settings recovered from legacy keys
#[derive(Debug, Default)]
pub struct LegacySettings {
    pub connection: Option<ConnectionSpec>,
    pub queues: Vec<String>,
    pub queue_connections: IndexMap<String, ConnectionSpec>,
    /// Every legacy key found, fully qualified
    pub keys: Vec<String>,
}

impl LegacySettings {
    /// Fill in whatever the structured keys did not already set.
    pub fn merge_into(self, settings: &mut RqSettings) {
        if settings.connection.is_none() {
            settings.connection = self.connection;
        }
        for name in self.queues {
            if !settings.queues.contains(&name) {
                settings.queues.push(name);
            }
        }
        for (name, spec) in self.queue_connections {
            settings.queue_connections.entry(name).or_insert(Some(spec));
        }
    }
}

/// Find legacy keys in the stripped `rq.` namespace and translate them.
///
/// Emits one deprecation warning listing every key found.
pub fn translate(ns: &DogConfigSnapshot) -> RqResult<Option<LegacySettings>> {
    let mut entries: IndexMap<String, LegacyEntry> = IndexMap::new();
    let mut keys = Vec::new();

    for (key, value) in ns.iter() {
        let Some((name, field)) = key.split_once('.') else {
            continue;
        };
        let reserved = RESERVED.contains(&name.to_lowercase().as_str());
        if name.is_empty() || reserved || !FIELDS.contains(&field) {
            continue;
        }

        let qualified = format!("{NAMESPACE}{key}");
        entries
            .entry(name.to_lowercase())
            .or_default()
            .set(&qualified, field, value)?;
        keys.push(qualified);
    }

    if keys.is_empty() {
        return Ok(None);
    }

    warn!(
        legacy_keys = %keys.join(", "),
        "The config format has changed. Replace flat 'rq.<name>.<field>' keys with \
         'rq.connection', 'rq.queues' and 'rq.queue_connections'."
    );

    let default_entry = entries.shift_remove(DEFAULT_QUEUE);
    let connection = default_entry
        .as_ref()
        .map(|entry| entry.spec(None))
        .transpose()?;

    let mut translated = LegacySettings {
        connection,
        keys,
        ..Default::default()
    };
    for (name, entry) in &entries {
        translated
            .queue_connections
            .insert(name.clone(), entry.spec(default_entry.as_ref())?);
        translated.queues.push(name.clone());
    }

    Ok(Some(translated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dog_core::DogApp;
    use serde_json::json;
    use tracing_test::traced_test;

    fn params(spec: &ConnectionSpec) -> &ConnectionParams {
        match spec {
            ConnectionSpec::Params(p) => p,
            other => panic!("expected params, got {other:?}"),
        }
    }

    fn legacy_app() -> DogApp {
        let app = DogApp::new("legacy");
        app.set("rq.default.port", 6390);
        app.set("rq.low.port", "6390");
        app.set("rq.low.db", 1);
        app.set("rq.high.url", "redis://localhost:6390/2");
        app.set("rq.multi.url", "redis://localhost:6390");
        app.set("rq.multi.db", 3);
        app.set("rq.basic.url", "redis://localhost:6390");
        app.set("rq.basic.timeout", 5);
        app
    }

    #[test]
    #[traced_test]
    fn translates_and_warns_once_with_every_key() {
        let app = legacy_app();
        let translated = translate(&app.namespace(NAMESPACE)).unwrap().unwrap();

        assert_eq!(translated.queues, vec!["basic", "high", "low", "multi"]);
        assert_eq!(params(translated.connection.as_ref().unwrap()).port, 6390);

        let low = params(&translated.queue_connections["low"]);
        assert_eq!((low.port, low.db), (6390, 1));
        assert_eq!(
            translated.queue_connections["high"],
            ConnectionSpec::Url("redis://localhost:6390/2".into())
        );
        assert_eq!(
            translated.queue_connections["multi"],
            ConnectionSpec::Url("redis://localhost:6390/3".into())
        );
        assert_eq!(
            translated.queue_connections["basic"],
            ConnectionSpec::Url("redis://localhost:6390".into())
        );

        assert_eq!(translated.keys.len(), 7);
        assert!(!translated.keys.contains(&"rq.basic.timeout".to_string()));
        assert!(logs_contain("The config format has changed"));
        assert!(logs_contain("rq.multi.db"));
    }

    #[test]
    fn named_params_inherit_default_fields() {
        let app = DogApp::new("inherit");
        app.set("rq.default.host", "cache");
        app.set("rq.default.password", "pw");
        app.set("rq.default.db", 4);
        app.set("rq.low.db", 1);

        let translated = translate(&app.namespace(NAMESPACE)).unwrap().unwrap();
        let low = params(&translated.queue_connections["low"]);
        assert_eq!(low.host, "cache");
        assert_eq!(low.password.as_deref(), Some("pw"));
        assert_eq!(low.db, 1);
        assert_eq!(low.port, 6379);
    }

    #[test]
    fn structured_keys_win_over_legacy() {
        let app = legacy_app();
        app.set("rq.connection", json!({"port": 7000}));
        app.set("rq.queues", json!(["low"]));
        app.set("rq.queue_connections", json!({"low": "redis://elsewhere:1/0"}));

        let settings = RqSettings::from_app(&app).unwrap();
        assert_eq!(params(settings.connection.as_ref().unwrap()).port, 7000);
        assert_eq!(settings.queues, vec!["low", "basic", "high", "multi"]);
        assert_eq!(
            settings.queue_connections["low"],
            Some(ConnectionSpec::Url("redis://elsewhere:1/0".into()))
        );
    }

    #[test]
    fn no_legacy_keys_means_no_translation() {
        let app = DogApp::new("modern");
        app.set("rq.queues", json!(["low"]));
        app.set("rq.low.timeout", 3);
        assert!(translate(&app.namespace(NAMESPACE)).unwrap().is_none());
    }

    #[test]
    fn structured_key_paths_are_not_legacy_names() {
        let app = DogApp::new("env-overrides");
        app.set("rq.connection.host", "cache");
        app.set("rq.queue_connections.url", "redis://cache:6379/1");
        assert!(translate(&app.namespace(NAMESPACE)).unwrap().is_none());

        app.set("rq.low.db", 2);
        let translated = translate(&app.namespace(NAMESPACE)).unwrap().unwrap();
        assert_eq!(translated.queues, vec!["low"]);
        assert_eq!(translated.keys, vec!["rq.low.db"]);
    }

    #[test]
    fn bad_legacy_values_are_configuration_errors() {
        let app = DogApp::new("bad");
        app.set("rq.low.port", "not-a-port");
        let err = translate(&app.namespace(NAMESPACE)).unwrap_err();
        assert!(err.to_string().contains("rq.low.port"));
    }
}
