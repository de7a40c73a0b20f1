pub mod class;
pub mod func;
pub mod registry;

pub use class::{JobClass, PlainJobClass};
pub use func::{BlockingFn, JobFunc, JobOutput, SuspendableFn};
pub use registry::JobRegistry;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::connection::SharedConnection;
use crate::{JobError, JobId, JobRecord, JobResult, JobStatus, QueueError, QueueResult};

/// A job bound to the connection, job class and registry it runs with
pub struct Job {
    record: JobRecord,
    connection: SharedConnection,
    job_class: Arc<dyn JobClass>,
    registry: Arc<JobRegistry>,
}

impl Job {
    pub(crate) fn new(
        record: JobRecord,
        connection: SharedConnection,
        job_class: Arc<dyn JobClass>,
        registry: Arc<JobRegistry>,
    ) -> Self {
        Self {
            record,
            connection,
            job_class,
            registry,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.record.job_id
    }

    pub fn func_name(&self) -> &str {
        &self.record.func_name
    }

    pub fn args(&self) -> &Value {
        &self.record.args
    }

    pub fn origin(&self) -> &str {
        &self.record.origin
    }

    pub fn status(&self) -> JobStatus {
        self.record.status
    }

    pub fn record(&self) -> &JobRecord {
        &self.record
    }

    pub(crate) fn record_mut(&mut self) -> &mut JobRecord {
        &mut self.record
    }

    pub fn job_class(&self) -> &Arc<dyn JobClass> {
        &self.job_class
    }

    /// The callable to execute, read through the job class.
    pub fn func(&self) -> QueueResult<JobFunc> {
        let func = self
            .registry
            .get(&self.record.func_name)
            .ok_or_else(|| QueueError::FunctionNotRegistered(self.record.func_name.clone()))?;
        self.job_class.wrap(func)
    }

    /// Run the job body without touching the broker.
    pub async fn perform(&self) -> Result<Value, JobError> {
        let func = self.func().map_err(|e| JobError::failed(e.to_string()))?;
        func.call(self.record.args.clone()).await
    }

    /// Run the job body and store the outcome.
    ///
    /// Broker errors are returned as `Err`; the job's own failure is the
    /// inner result and is already recorded.
    pub(crate) async fn execute(
        &mut self,
        worker_name: Option<&str>,
        result_ttl: Option<Duration>,
    ) -> QueueResult<Result<Value, JobError>> {
        self.record.mark_started(worker_name);
        self.connection.save_job(&self.record, None).await?;

        let outcome = self.perform().await;
        match &outcome {
            Ok(value) => self.record.mark_finished(value.clone()),
            Err(e) => self.record.mark_failed(e.to_string()),
        }

        self.connection.save_job(&self.record, result_ttl).await?;
        Ok(outcome)
    }

    pub fn handle(&self) -> JobHandle {
        JobHandle {
            id: self.record.job_id.clone(),
            origin: self.record.origin.clone(),
            connection: Arc::clone(&self.connection),
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.record.job_id)
            .field("func", &self.record.func_name)
            .field("origin", &self.record.origin)
            .field("status", &self.record.status)
            .finish()
    }
}

/// Reference to a submitted job, used to look up its outcome later
#[derive(Clone)]
pub struct JobHandle {
    id: JobId,
    origin: String,
    connection: SharedConnection,
}

impl JobHandle {
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Queue the job was submitted to
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn connection(&self) -> &SharedConnection {
        &self.connection
    }

    /// The stored record, `None` once it has expired
    pub async fn fetch(&self) -> QueueResult<Option<JobRecord>> {
        self.connection.fetch_job(&self.id).await
    }

    pub async fn status(&self) -> QueueResult<Option<JobStatus>> {
        Ok(self.fetch().await?.map(|r| r.status))
    }

    /// The outcome, `None` while the job is pending or after it expired
    pub async fn latest_result(&self) -> QueueResult<Option<JobResult>> {
        Ok(self.fetch().await?.and_then(|r| r.outcome()))
    }
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .finish()
    }
}
