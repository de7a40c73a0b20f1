mod common;

use dog_core::DogApp;
use dog_queue::{JobError, JobStatus, WorkOptions, WorkerOptions};
use dog_rq::{Rq, RqError};
use serde_json::json;

use common::{config_value, configure_shared_queues, memory_app, memory_async_app, registered};

async fn enqueue_and_work(app: DogApp) {
    configure_shared_queues(&app);
    app.set("shop.greeting", "hello from the app");
    let rq = registered(&app);

    let read = rq.job("read_config", config_value).queue("low");
    let job = app
        .in_context(read.enqueue("shop.greeting".to_string()))
        .await
        .unwrap();
    assert_eq!(job.origin(), "low");
    assert_eq!(job.status().await.unwrap(), Some(JobStatus::Queued));

    let worker = rq
        .make_worker_for(&app, Some(&["low"][..]), WorkerOptions::default())
        .unwrap();
    assert!(worker.work(WorkOptions::burst()).await.unwrap());

    let result = job.latest_result().await.unwrap().unwrap();
    assert!(result.is_success(), "{result:?}");
    assert_eq!(result.return_value, Some(json!("hello from the app")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_app_job_runs_in_its_context() {
    enqueue_and_work(memory_app("sync-shop")).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_async_app_job_runs_in_its_context() {
    enqueue_and_work(memory_async_app("async-shop")).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_async_job_bodies_see_the_app_too() {
    let app = memory_async_app("async-bodies");
    app.set("answer", 42);
    let rq = registered(&app);

    let answer = rq.job_async("answer", |key: String| async move {
        tokio::task::yield_now().await;
        config_value(key)
    });
    let job = app.scope(answer.enqueue("answer".into())).await.unwrap();

    rq.make_worker_for(&app, None, WorkerOptions::default())
        .unwrap()
        .work(WorkOptions::burst())
        .await
        .unwrap();
    let result = job.latest_result().await.unwrap().unwrap();
    assert_eq!(result.return_value, Some(json!(42)));
}

#[tokio::test]
async fn test_testing_apps_run_jobs_inline() {
    let app = memory_app("inline");
    app.set_testing(true);
    app.set("token", "abc");
    let rq = registered(&app);

    let read = rq.job("read_config", config_value);
    let job = app.in_context(read.enqueue("token".into())).await.unwrap();

    assert_eq!(rq.queues_for(&app).unwrap().default_queue().count().await.unwrap(), 0);
    let result = job.latest_result().await.unwrap().unwrap();
    assert_eq!(result.return_value, Some(json!("abc")));
}

#[tokio::test]
async fn test_inline_failures_are_returned_and_recorded() {
    let app = memory_app("inline-fail");
    app.set_testing(true);
    let rq = registered(&app);

    let fail = rq.job("fail", |_: ()| -> Result<(), JobError> { Err(JobError::failed("nope")) });
    let err = app.in_context(fail.enqueue(())).await.unwrap_err();
    assert!(matches!(err, RqError::Queue(dog_queue::QueueError::JobFailed(JobError::Failed(ref m))) if m == "nope"));
}

#[tokio::test]
async fn test_calling_the_wrapper_skips_the_queue() {
    let app = memory_app("direct");
    let rq = registered(&app);
    let double = rq.job("double", |n: i64| Ok(n * 2)).doc("Double a number.");

    assert_eq!(double.call(21).unwrap(), 42);
    assert_eq!(double.description(), Some("Double a number."));
    assert_eq!(rq.queues_for(&app).unwrap().default_queue().count().await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_jobs_of_dropped_apps_fail_with_a_context_error() {
    let factory = std::sync::Arc::new(dog_queue::MemoryConnectionFactory::new());
    let rq = Rq::with_connection_factory(factory);

    let app = DogApp::new("short-lived");
    rq.init_app(&app).unwrap();
    let read = rq.job("read_config", config_value);
    let job = app.in_context(read.enqueue("x".into())).await.unwrap();

    let queue = rq.queues_for(&app).unwrap().default_queue().clone();
    drop(app);

    let worker = dog_queue::Worker::new(vec![queue], WorkerOptions::default()).unwrap();
    assert!(worker.work(WorkOptions::burst()).await.unwrap());

    let result = job.latest_result().await.unwrap().unwrap();
    assert_eq!(result.status, JobStatus::Failed);
    assert!(result.error.unwrap().contains("no longer exists"));
}
