mod common;

use dog_queue::{same_connection, JobClass, WorkerOptions};
use dog_rq::{ErrorKind, RqError};
use serde_json::json;

use common::{configure_shared_queues, memory_app, registered};

#[test]
fn test_implicit_worker_puts_default_first() {
    let app = memory_app("implicit");
    configure_shared_queues(&app);
    let rq = registered(&app);
    let queues = rq.queues_for(&app).unwrap();

    for selection in [None, Some(&[][..])] {
        let worker = rq.make_worker_for(&app, selection, WorkerOptions::default()).unwrap();
        assert_eq!(worker.queue_names(), vec!["default", "low", "high", "share_low"]);
        assert!(same_connection(worker.connection(), queues.default_queue().connection()));
    }
}

#[test]
fn test_implicit_worker_moves_declared_default_to_front() {
    let app = memory_app("declared");
    app.set("rq.queues", json!(["low", "default"]));
    app.set("rq.queue_connections", json!({"low": {"db": 1}}));
    let rq = registered(&app);

    let worker = rq.make_worker_for(&app, None, WorkerOptions::default()).unwrap();
    assert_eq!(worker.queue_names(), vec!["default", "low"]);
    assert_eq!(worker.connection().params().db, 0);
}

#[test]
fn test_explicit_list_keeps_order_and_first_connection() {
    let app = memory_app("explicit");
    configure_shared_queues(&app);
    let rq = registered(&app);
    let queues = rq.queues_for(&app).unwrap();

    let worker = rq
        .make_worker_for(&app, Some(&["high", "default"][..]), WorkerOptions::default())
        .unwrap();
    assert_eq!(worker.queue_names(), vec!["high", "default"]);
    assert!(same_connection(worker.connection(), queues.get("high").unwrap().connection()));
    assert!(!same_connection(worker.connection(), queues.default_queue().connection()));

    let worker = rq
        .make_worker_for(&app, Some(&["default", "high"][..]), WorkerOptions::default())
        .unwrap();
    assert!(same_connection(worker.connection(), queues.default_queue().connection()));
}

#[test]
fn test_worker_uses_the_app_job_class() {
    let app = memory_app("class");
    let rq = registered(&app);
    let worker = rq.make_worker_for(&app, None, WorkerOptions::default()).unwrap();
    assert_eq!(worker.job_class().name(), "ContextBoundJob");
}

#[test]
fn test_unknown_queue_is_a_lookup_error() {
    let app = memory_app("lookup");
    let rq = registered(&app);

    let err = rq
        .make_worker_for(&app, Some(&["default", "nope"][..]), WorkerOptions::default())
        .unwrap_err();
    assert!(matches!(err, RqError::QueueNotFound(ref name) if name == "nope"));
    assert_eq!(err.kind(), ErrorKind::Lookup);
}

#[test]
fn test_make_worker_uses_the_current_app() {
    let app = memory_app("current");
    app.set("rq.queues", json!(["low"]));
    let rq = registered(&app);

    assert!(matches!(
        rq.make_worker(None, WorkerOptions::default()),
        Err(RqError::OutsideContext)
    ));

    let _ctx = app.app_context();
    let worker = rq
        .make_worker(None, WorkerOptions { name: Some("w".into()), ..Default::default() })
        .unwrap();
    assert_eq!(worker.name(), "w");
    assert_eq!(worker.queue_names(), vec!["default", "low"]);
}
