use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::connection::SharedConnection;
use crate::job::{Job, JobClass, JobHandle, JobRegistry, PlainJobClass};
use crate::{JobId, JobRecord, QueueError, QueueResult};

/// Default time finished job records are kept
pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(500);

/// A named queue on one connection.
///
/// Asynchronous queues push jobs to the broker for a worker to pick up;
/// synchronous ones run the job inline as part of enqueueing it.
#[derive(Clone)]
pub struct Queue {
    name: String,
    connection: SharedConnection,
    is_async: bool,
    job_class: Arc<dyn JobClass>,
    registry: Arc<JobRegistry>,
    result_ttl: Duration,
}

impl Queue {
    pub fn new(name: impl Into<String>, connection: SharedConnection, registry: Arc<JobRegistry>) -> Self {
        Self {
            name: name.into(),
            connection,
            is_async: true,
            job_class: Arc::new(PlainJobClass),
            registry,
            result_ttl: DEFAULT_RESULT_TTL,
        }
    }

    pub fn with_async(mut self, is_async: bool) -> Self {
        self.is_async = is_async;
        self
    }

    pub fn with_job_class(mut self, job_class: Arc<dyn JobClass>) -> Self {
        self.job_class = job_class;
        self
    }

    pub fn with_result_ttl(mut self, ttl: Duration) -> Self {
        self.result_ttl = ttl;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection(&self) -> &SharedConnection {
        &self.connection
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn job_class(&self) -> &Arc<dyn JobClass> {
        &self.job_class
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Build a job on this queue without submitting it.
    pub fn create_job(&self, func_name: &str, args: Value) -> Job {
        Job::new(
            JobRecord::new(func_name, args, &self.name),
            Arc::clone(&self.connection),
            Arc::clone(&self.job_class),
            Arc::clone(&self.registry),
        )
    }

    /// Submit a call of `func_name` with `args`.
    ///
    /// On a synchronous queue the job runs before this returns, and a
    /// failing job is returned as [`QueueError::JobFailed`] after its
    /// outcome has been stored.
    #[instrument(skip(self, args), fields(queue = %self.name, func = %func_name))]
    pub async fn enqueue_call(&self, func_name: &str, args: Value) -> QueueResult<JobHandle> {
        let mut job = self.create_job(func_name, args);

        if !self.is_async {
            debug!(job_id = %job.id(), "running job inline");
            return match job.execute(None, Some(self.result_ttl)).await? {
                Ok(_) => Ok(job.handle()),
                Err(e) => {
                    warn!(job_id = %job.id(), error = %e, "inline job failed");
                    Err(QueueError::JobFailed(e))
                }
            };
        }

        job.record_mut().mark_queued();
        self.connection.save_job(job.record(), None).await?;
        self.connection.push_job(&self.name, job.id()).await?;
        debug!(job_id = %job.id(), "job enqueued");
        Ok(job.handle())
    }

    /// Load a job previously created on this queue's connection.
    pub async fn fetch_job(&self, job_id: &JobId) -> QueueResult<Option<Job>> {
        let record = self.connection.fetch_job(job_id).await?;
        Ok(record.map(|record| {
            Job::new(
                record,
                Arc::clone(&self.connection),
                Arc::clone(&self.job_class),
                Arc::clone(&self.registry),
            )
        }))
    }

    /// Number of jobs waiting
    pub async fn count(&self) -> QueueResult<usize> {
        self.connection.queue_len(&self.name).await
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("name", &self.name)
            .field("connection", &self.connection)
            .field("is_async", &self.is_async)
            .field("job_class", &self.job_class.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MemoryConnection;
    use crate::job::JobFunc;
    use crate::{JobError, JobStatus};
    use serde_json::json;

    fn registry() -> Arc<JobRegistry> {
        let registry = JobRegistry::new();
        registry.register("add", JobFunc::blocking(|v| {
            let a = v[0].as_i64().unwrap_or(0);
            let b = v[1].as_i64().unwrap_or(0);
            Ok(json!(a + b))
        }));
        registry.register("fail", JobFunc::blocking(|_| Err(JobError::failed("nope"))));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn async_queue_pushes_to_broker() {
        let queue = Queue::new("low", Arc::new(MemoryConnection::new()), registry());
        let handle = queue.enqueue_call("add", json!([1, 2])).await.unwrap();

        assert_eq!(queue.count().await.unwrap(), 1);
        assert_eq!(handle.status().await.unwrap(), Some(JobStatus::Queued));
        assert!(handle.latest_result().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sync_queue_runs_inline() {
        let queue = Queue::new("low", Arc::new(MemoryConnection::new()), registry()).with_async(false);
        let handle = queue.enqueue_call("add", json!([1, 2])).await.unwrap();

        assert_eq!(queue.count().await.unwrap(), 0);
        let result = handle.latest_result().await.unwrap().unwrap();
        assert_eq!(result.return_value, Some(json!(3)));
    }

    #[tokio::test]
    async fn sync_queue_reports_failures() {
        let queue = Queue::new("low", Arc::new(MemoryConnection::new()), registry()).with_async(false);
        let err = queue.enqueue_call("fail", json!(null)).await.unwrap_err();
        assert!(matches!(err, QueueError::JobFailed(JobError::Failed(msg)) if msg == "nope"));
    }

    #[tokio::test]
    async fn unknown_functions_fail_when_performed() {
        let queue = Queue::new("low", Arc::new(MemoryConnection::new()), registry());
        let job = queue.create_job("missing", json!(null));
        assert!(matches!(job.func(), Err(QueueError::FunctionNotRegistered(_))));
        assert!(job.perform().await.is_err());
    }
}
