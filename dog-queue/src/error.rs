use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Infrastructure errors for broker and worker operations
#[derive(Error, Debug, Clone)]
pub enum QueueError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job execution failed: {0}")]
    JobFailed(#[from] JobError),

    #[error("Function not registered: {0}")]
    FunctionNotRegistered(String),

    #[error("Invalid connection parameters: {0}")]
    InvalidConnection(String),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("A worker needs at least one queue")]
    NoQueues,

    #[error("Job class refused to provide the callable: {0}")]
    JobClass(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Job execution outcome, recorded on the job. Nothing is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The job body returned an error
    #[error("{0}")]
    Failed(String),

    /// The job body panicked
    #[error("job panicked: {0}")]
    Panicked(String),

    /// The arguments could not be decoded for the job body
    #[error("invalid job arguments: {0}")]
    InvalidArgs(String),

    /// The environment the job needs is gone (for example its owning app)
    #[error("job context unavailable: {0}")]
    Context(String),
}

impl JobError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    pub fn context(msg: impl Into<String>) -> Self {
        Self::Context(msg.into())
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        match self {
            Self::Failed(msg) | Self::Panicked(msg) | Self::InvalidArgs(msg) | Self::Context(msg) => msg,
        }
    }
}

impl From<tokio::task::JoinError> for JobError {
    fn from(err: tokio::task::JoinError) -> Self {
        match err.try_into_panic() {
            Ok(payload) => Self::Panicked(crate::job::func::panic_message(payload.as_ref())),
            Err(err) => Self::Panicked(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for QueueError {
    fn from(err: redis::RedisError) -> Self {
        Self::Broker(err.to_string())
    }
}
