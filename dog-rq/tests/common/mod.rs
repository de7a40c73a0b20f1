#![allow(dead_code)]

use dog_core::DogApp;
use dog_rq::Rq;
use serde_json::{json, Value};

/// Sync-family app whose connections live in an in-process broker
pub fn memory_app(name: &str) -> DogApp {
    let app = DogApp::new(name);
    app.set("rq.connection_class", "memory");
    app
}

/// Async-family counterpart of [`memory_app`]
pub fn memory_async_app(name: &str) -> DogApp {
    let app = DogApp::new_async(name);
    app.set("rq.connection_class", "memory");
    app
}

/// Queues `low` and `high` on their own databases, `share_low` pointing at `low`
pub fn configure_shared_queues(app: &DogApp) {
    app.set("rq.queues", json!(["low", "high", "share_low"]));
    app.set(
        "rq.queue_connections",
        json!({
            "low": {"port": 6379, "db": 1},
            "high": "redis://localhost:6379/2",
            "share_low": "low",
        }),
    );
}

pub fn registered(app: &DogApp) -> Rq {
    let rq = Rq::new();
    rq.init_app(app).expect("init_app");
    rq
}

/// Job body returning the current app's value for a config key
pub fn config_value(key: String) -> Result<Value, dog_queue::JobError> {
    let app = dog_core::current_app().ok_or_else(|| dog_queue::JobError::failed("no current app"))?;
    Ok(app.get(&key).unwrap_or(Value::Null))
}
