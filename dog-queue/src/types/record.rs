use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::JobId;

/// Job status lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created but not pushed anywhere yet
    Created,

    /// Waiting on a queue
    Queued,

    /// Picked up by a worker or running inline
    Started,

    /// Completed successfully
    Finished,

    /// The job body returned an error or panicked
    Failed,
}

impl JobStatus {
    /// Check if the job is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    /// Get the status name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Queued => "queued",
            Self::Started => "started",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }
}

/// Job record, the state a connection stores for one job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,

    /// Name the callable was registered under
    pub func_name: String,

    /// Arguments handed to the callable
    pub args: Value,

    /// Queue the job was created on
    pub origin: String,

    pub status: JobStatus,

    pub created_at: DateTime<Utc>,
    pub enqueued_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,

    /// Return value of a finished job
    pub result: Option<Value>,

    /// Error message of a failed job
    pub error: Option<String>,

    /// Name of the worker that ran the job, `None` when run inline
    pub worker_name: Option<String>,
}

impl JobRecord {
    /// Create a new job record
    pub fn new(func_name: impl Into<String>, args: Value, origin: impl Into<String>) -> Self {
        Self {
            job_id: JobId::new(),
            func_name: func_name.into(),
            args,
            origin: origin.into(),
            status: JobStatus::Created,
            created_at: Utc::now(),
            enqueued_at: None,
            started_at: None,
            ended_at: None,
            result: None,
            error: None,
            worker_name: None,
        }
    }

    pub fn mark_queued(&mut self) {
        self.status = JobStatus::Queued;
        self.enqueued_at = Some(Utc::now());
    }

    pub fn mark_started(&mut self, worker_name: Option<&str>) {
        self.status = JobStatus::Started;
        self.started_at = Some(Utc::now());
        self.worker_name = worker_name.map(str::to_string);
    }

    pub fn mark_finished(&mut self, result: Value) {
        self.status = JobStatus::Finished;
        self.ended_at = Some(Utc::now());
        self.result = Some(result);
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.ended_at = Some(Utc::now());
        self.error = Some(error.into());
    }

    /// The outcome, once the job has reached a terminal state
    pub fn outcome(&self) -> Option<JobResult> {
        self.status.is_terminal().then(|| JobResult {
            status: self.status,
            return_value: self.result.clone(),
            error: self.error.clone(),
        })
    }
}

/// Outcome of a finished or failed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub status: JobStatus,
    pub return_value: Option<Value>,
    pub error: Option<String>,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Finished
    }
}
