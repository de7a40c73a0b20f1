#![allow(deprecated)]

mod common;

use std::time::Duration;

use dog_queue::{same_connection, JobClass};
use dog_rq::compat::{get_connection, get_queue, get_worker, job, job_on};
use dog_rq::{QueueOverrides, RqError};
use serde_json::json;

use common::{config_value, memory_app, registered};

fn legacy_app(name: &str) -> dog_core::DogApp {
    let app = memory_app(name);
    app.set("rq.default.port", 6390);
    app.set("rq.low.port", 6390);
    app.set("rq.low.db", 1);
    app.set("rq.high.url", "redis://localhost:6390/2");
    app
}

#[test]
fn test_accessors_need_an_app_with_the_extension() {
    assert!(matches!(get_connection(None), Err(RqError::OutsideContext)));

    let bare = memory_app("bare");
    let _ctx = bare.app_context();
    assert!(matches!(get_queue(None, QueueOverrides::default()), Err(RqError::ExtensionMissing)));
}

#[test]
fn test_get_connection_falls_back_to_default() {
    let app = legacy_app("conn");
    let rq = registered(&app);
    let _ctx = app.app_context();

    let queues = rq.queues().unwrap();
    assert!(same_connection(&get_connection(Some("low")).unwrap(), queues.get("low").unwrap().connection()));
    assert!(same_connection(&get_connection(Some("nope")).unwrap(), queues.default_queue().connection()));
    assert_eq!(get_connection(None).unwrap().params().port, 6390);
}

#[test]
fn test_get_queue_returns_provisioned_queues_without_overrides() {
    let app = legacy_app("queue");
    let rq = registered(&app);
    let _ctx = app.app_context();

    let high = get_queue(Some("high"), QueueOverrides::default()).unwrap();
    assert!(same_connection(high.connection(), rq.get_queue("high").unwrap().connection()));
    assert_eq!(high.connection().params().db, 2);
}

#[test]
fn test_get_queue_with_overrides_builds_a_new_queue() {
    let app = legacy_app("overrides");
    let rq = registered(&app);
    let _ctx = app.app_context();
    let default = rq.queue().unwrap();

    let inline = get_queue(
        None,
        QueueOverrides {
            is_async: Some(false),
            result_ttl: Some(Duration::from_secs(5)),
            ..Default::default()
        },
    )
    .unwrap();
    assert!(!inline.is_async());
    assert!(default.is_async());
    assert!(same_connection(inline.connection(), default.connection()));
    assert_eq!(inline.job_class().name(), "ContextBoundJob");

    let fresh = get_queue(Some("unprovisioned"), QueueOverrides::default()).unwrap();
    assert_eq!(fresh.name(), "unprovisioned");
    assert!(same_connection(fresh.connection(), default.connection()));
}

#[test]
fn test_get_worker_keeps_the_given_order() {
    let app = legacy_app("worker");
    let _rq = registered(&app);
    let _ctx = app.app_context();

    assert_eq!(get_worker(&[]).unwrap().queue_names(), vec!["default", "high", "low"]);
    assert_eq!(get_worker(&["low", "default"]).unwrap().queue_names(), vec!["low", "default"]);
    assert!(matches!(get_worker(&["nope"]), Err(RqError::QueueNotFound(_))));
}

#[tokio::test]
async fn test_job_and_delay_enqueue_on_the_bound_queue() {
    let app = legacy_app("jobs");
    app.set("flag", true);
    let rq = registered(&app);

    let (on_default, on_low) = {
        let _ctx = app.app_context();
        (
            job("read_config", config_value).unwrap(),
            job_on("low", "read_config", config_value).unwrap(),
        )
    };
    assert_eq!(on_default.queue_name(), "default");

    let handle = app.in_context(on_low.delay("flag".into())).await.unwrap();
    assert_eq!(handle.origin(), "low");
    assert_eq!(rq.queues_for(&app).unwrap().get("low").unwrap().count().await.unwrap(), 1);
    assert_eq!(on_default.call("flag".into()).unwrap_err(), dog_queue::JobError::failed("no current app"));
    assert_eq!(app.in_context(async { on_low.call("flag".into()) }).await.unwrap(), json!(true));
}
