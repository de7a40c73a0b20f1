//! # dog-queue: broker connections, named queues and workers
//!
//! - [`connection`]: [`Connection`] handles built by a [`ConnectionFactory`]
//!   from parameters or URLs. An in-process broker is always available; the
//!   Redis broker is behind the `redis` feature (on by default).
//! - [`Queue`]: a named queue on one connection. Asynchronous queues push
//!   jobs to the broker, synchronous queues run them inline.
//! - [`JobRegistry`] maps function names to [`JobFunc`] bodies, blocking or
//!   suspendable. A [`JobClass`] decorates the body every time a job reads it
//!   back for execution.
//! - [`Worker`] drains a list of queues, in order, through the first queue's
//!   connection.
//!
//! ```rust
//! use std::sync::Arc;
//! use dog_queue::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> QueueResult<()> {
//! let registry = Arc::new(JobRegistry::new());
//! registry.register("greet", JobFunc::blocking(|name| Ok(json!(format!("hello {name}")))));
//!
//! let conn = MemoryConnectionFactory::new().from_url("redis://localhost:6379/0")?;
//! let queue = Queue::new("default", conn, registry);
//! let job = queue.enqueue_call("greet", json!("dog")).await?;
//!
//! let worker = Worker::new(vec![queue], WorkerOptions::default())?;
//! worker.work(WorkOptions::burst()).await?;
//!
//! let result = job.latest_result().await?.expect("job ran");
//! assert_eq!(result.return_value, Some(json!("hello \"dog\"")));
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod job;
pub mod observability;
pub mod queue;
pub mod types;
pub mod worker;

pub use connection::{
    factory_by_name, same_connection, Connection, ConnectionFactory, ConnectionParams,
    MemoryConnection, MemoryConnectionFactory, SharedConnection,
};
#[cfg(feature = "redis")]
pub use connection::{RedisConnection, RedisConnectionFactory};
pub use error::{JobError, QueueError, QueueResult};
pub use job::{Job, JobClass, JobFunc, JobHandle, JobOutput, JobRegistry, PlainJobClass};
pub use observability::WorkerMetrics;
pub use queue::{Queue, DEFAULT_RESULT_TTL};
pub use types::{JobId, JobRecord, JobResult, JobStatus};
pub use worker::{WorkOptions, Worker, WorkerHandle, WorkerOptions};

pub mod prelude {
    pub use crate::{
        Connection, ConnectionFactory, ConnectionParams, JobClass, JobError, JobFunc, JobHandle,
        JobRegistry, MemoryConnectionFactory, Queue, QueueError, QueueResult, SharedConnection,
        WorkOptions, Worker, WorkerOptions,
    };
}
