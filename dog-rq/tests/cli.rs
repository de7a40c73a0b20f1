mod common;

use dog_queue::JobStatus;
use serde_json::json;

use common::{config_value, configure_shared_queues, memory_app, memory_async_app, registered};

#[tokio::test(flavor = "multi_thread")]
async fn test_worker_command_drains_the_named_queues() {
    for app in [memory_app("cli-sync"), memory_async_app("cli-async")] {
        configure_shared_queues(&app);
        app.set("who", "cli");
        let rq = registered(&app);

        let on_low = rq.job("read_config", config_value).queue("low");
        let on_high = on_low.clone().queue("high");
        let low = app.in_context(on_low.enqueue("who".into())).await.unwrap();
        let high = app.in_context(on_high.enqueue("who".into())).await.unwrap();

        let code = app.run_cli(["rq", "worker", "--burst", "low"]).await.unwrap();
        assert_eq!(code, 0);

        let result = low.latest_result().await.unwrap().unwrap();
        assert_eq!(result.return_value, Some(json!("cli")));
        assert_eq!(high.status().await.unwrap(), Some(JobStatus::Queued));
    }
}

#[tokio::test]
async fn test_worker_command_without_queues_watches_all() {
    let app = memory_app("cli-all");
    app.set("rq.queues", json!(["low"]));
    let rq = registered(&app);

    let job = app
        .in_context(rq.job("read_config", config_value).queue("low").enqueue("missing".into()))
        .await
        .unwrap();

    let code = app
        .run_cli(["rq", "worker", "--burst", "--name", "cli-worker", "--max-jobs", "5"])
        .await
        .unwrap();
    assert_eq!(code, 0);

    let record = job.fetch().await.unwrap().unwrap();
    assert_eq!(record.status, JobStatus::Finished);
    assert_eq!(record.worker_name.as_deref(), Some("cli-worker"));
}

#[tokio::test]
async fn test_unknown_queue_fails_the_command() {
    let app = memory_app("cli-unknown");
    let _rq = registered(&app);

    let err = app.run_cli(["rq", "worker", "--burst", "nope"]).await.unwrap_err();
    assert!(err.to_string().contains("nope"));
}

#[tokio::test]
async fn test_usage_errors_exit_with_clap_codes() {
    let app = memory_app("cli-usage");
    let _rq = registered(&app);

    assert_eq!(app.run_cli(["rq", "shell"]).await.unwrap(), 2);
    assert_eq!(app.run_cli(["rq", "worker", "--help"]).await.unwrap(), 0);
}
