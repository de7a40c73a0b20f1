//! Deprecated free functions from the first releases of the extension.
//!
//! Each one finds the extension through the current app (it must have been
//! passed to [`Rq::init_app`]) and logs a deprecation warning the first
//! time it is used.

use std::sync::Arc;
use std::time::Duration;

use dog_core::DogApp;
use dog_queue::{JobError, Queue, SharedConnection, Worker, WorkerOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::DEFAULT_QUEUE;
use crate::deprecation::{warn_once, Deprecated};
use crate::extension::EXTENSION_NAME;
use crate::job_wrapper::JobWrapper;
use crate::provisioner::QueueSet;
use crate::{Rq, RqError, RqResult};

/// Per-call settings for [`get_queue`]; any set field creates a new queue
#[derive(Debug, Clone, Default)]
pub struct QueueOverrides {
    pub connection: Option<SharedConnection>,
    pub is_async: Option<bool>,
    pub result_ttl: Option<Duration>,
}

impl QueueOverrides {
    pub fn is_empty(&self) -> bool {
        self.connection.is_none() && self.is_async.is_none() && self.result_ttl.is_none()
    }
}

fn current_extension() -> RqResult<(DogApp, Arc<Rq>)> {
    let app = dog_core::current_app().ok_or(RqError::OutsideContext)?;
    let rq = app
        .extension::<Rq>(EXTENSION_NAME)
        .ok_or(RqError::ExtensionMissing)?;
    Ok((app, rq))
}

fn connection_of(queues: &QueueSet, name: &str) -> SharedConnection {
    let queue = queues.get(name).unwrap_or_else(|| queues.default_queue());
    Arc::clone(queue.connection())
}

/// Connection of the named queue, or of the default queue when there is
/// no such queue.
#[deprecated(note = "use `rq.get_queue(name)?.connection()`")]
pub fn get_connection(queue: Option<&str>) -> RqResult<SharedConnection> {
    warn_once(Deprecated::GetConnection);
    let (app, rq) = current_extension()?;
    let queues = rq.queues_for(&app)?;
    Ok(connection_of(&queues, queue.unwrap_or(DEFAULT_QUEUE)))
}

/// The named queue.
///
/// With overrides, or for a name that was never provisioned, a new queue is
/// built. It uses the named queue's connection (falling back to the default
/// one) and the default queue's job class and mode unless overridden.
#[deprecated(note = "use `rq.get_queue(name)`")]
pub fn get_queue(name: Option<&str>, overrides: QueueOverrides) -> RqResult<Queue> {
    warn_once(Deprecated::GetQueue);
    let (app, rq) = current_extension()?;
    let queues = rq.queues_for(&app)?;
    let name = name.unwrap_or(DEFAULT_QUEUE);

    if overrides.is_empty() {
        if let Some(queue) = queues.get(name) {
            return Ok(queue.clone());
        }
    }

    let base = queues.default_queue();
    let connection = overrides
        .connection
        .unwrap_or_else(|| connection_of(&queues, name));
    let mut queue = Queue::new(name, connection, Arc::clone(rq.registry()))
        .with_job_class(Arc::clone(base.job_class()))
        .with_async(overrides.is_async.unwrap_or(base.is_async()));
    if let Some(ttl) = overrides.result_ttl {
        queue = queue.with_result_ttl(ttl);
    }
    Ok(queue)
}

/// Worker over the named queues; none means every queue.
#[deprecated(note = "use `rq.make_worker(..)`")]
pub fn get_worker(queues: &[&str]) -> RqResult<Worker> {
    warn_once(Deprecated::GetWorker);
    let (app, rq) = current_extension()?;
    rq.make_worker_for(&app, Some(queues), WorkerOptions::default())
}

/// Register a job function on the current app's extension.
#[deprecated(note = "use `rq.job(..)`; `delay` is now `enqueue`")]
#[allow(deprecated)]
pub fn job<A, R, F>(name: &str, f: F) -> RqResult<JobWrapper<A, R>>
where
    A: Serialize + DeserializeOwned + 'static,
    R: Serialize + DeserializeOwned + 'static,
    F: Fn(A) -> Result<R, JobError> + Send + Sync + 'static,
{
    job_on(DEFAULT_QUEUE, name, f)
}

/// Same as [`job`], bound to `queue`.
#[deprecated(note = "use `rq.job(..).queue(name)`")]
pub fn job_on<A, R, F>(queue: &str, name: &str, f: F) -> RqResult<JobWrapper<A, R>>
where
    A: Serialize + DeserializeOwned + 'static,
    R: Serialize + DeserializeOwned + 'static,
    F: Fn(A) -> Result<R, JobError> + Send + Sync + 'static,
{
    warn_once(Deprecated::Job);
    let (_, rq) = current_extension()?;
    Ok(rq.job(name, f).queue(queue))
}
