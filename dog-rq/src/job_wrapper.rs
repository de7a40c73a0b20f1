use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

use dog_queue::{JobError, JobFunc, JobHandle, QueueError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::DEFAULT_QUEUE;
use crate::deprecation::{warn_once, Deprecated};
use crate::{Rq, RqResult};

fn invalid_args(err: serde_json::Error) -> JobError {
    JobError::InvalidArgs(err.to_string())
}

fn encode<T: Serialize>(value: T) -> Result<Value, JobError> {
    serde_json::to_value(value).map_err(|e| JobError::failed(format!("cannot encode value: {e}")))
}

/// A registered job function with typed arguments and result.
///
/// Calling it runs the function in-process; [`enqueue`](Self::enqueue)
/// submits it to its queue (`"default"` unless set with
/// [`queue`](Self::queue)).
pub struct JobWrapper<A, R> {
    rq: Rq,
    name: String,
    queue: String,
    doc: Option<String>,
    func: JobFunc,
    _types: PhantomData<fn(A) -> R>,
}

impl<A, R> JobWrapper<A, R>
where
    A: Serialize + DeserializeOwned,
    R: Serialize + DeserializeOwned,
{
    fn new(rq: Rq, name: String, func: JobFunc) -> Self {
        rq.registry().register(name.clone(), func.clone());
        Self {
            rq,
            name,
            queue: DEFAULT_QUEUE.to_string(),
            doc: None,
            func,
            _types: PhantomData,
        }
    }

    /// Enqueue on `name` instead of `"default"`
    pub fn queue(mut self, name: impl Into<String>) -> Self {
        self.queue = name.into();
        self
    }

    pub fn doc(mut self, text: impl Into<String>) -> Self {
        self.doc = Some(text.into());
        self
    }

    /// Name the function is registered and enqueued under
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn queue_name(&self) -> &str {
        &self.queue
    }

    /// Run the function now, on this thread. No queue is involved.
    pub fn call(&self, args: A) -> Result<R, JobError> {
        let out = self.func.call_blocking(encode(args)?)?;
        serde_json::from_value(out).map_err(invalid_args)
    }

    /// Run the function now from async code. No queue is involved.
    pub async fn call_async(&self, args: A) -> Result<R, JobError> {
        let out = self.func.call(encode(args)?).await?;
        serde_json::from_value(out).map_err(invalid_args)
    }

    /// Submit a call to the bound queue of the current app.
    pub async fn enqueue(&self, args: A) -> RqResult<JobHandle> {
        let queue = self.rq.get_queue(&self.queue)?;
        let args = serde_json::to_value(args).map_err(QueueError::from)?;
        Ok(queue.enqueue_call(&self.name, args).await?)
    }

    #[deprecated(note = "renamed to `enqueue`")]
    pub async fn delay(&self, args: A) -> RqResult<JobHandle> {
        warn_once(Deprecated::Delay);
        self.enqueue(args).await
    }
}

impl<A, R> Clone for JobWrapper<A, R> {
    fn clone(&self) -> Self {
        Self {
            rq: self.rq.clone(),
            name: self.name.clone(),
            queue: self.queue.clone(),
            doc: self.doc.clone(),
            func: self.func.clone(),
            _types: PhantomData,
        }
    }
}

impl<A, R> fmt::Debug for JobWrapper<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobWrapper")
            .field("name", &self.name)
            .field("queue", &self.queue)
            .field("doc", &self.doc)
            .field("func", &self.func)
            .finish()
    }
}

impl Rq {
    /// Register a blocking job function under `name`.
    ///
    /// Registering another function under the same name replaces it.
    pub fn job<A, R, F>(&self, name: impl Into<String>, f: F) -> JobWrapper<A, R>
    where
        A: Serialize + DeserializeOwned + 'static,
        R: Serialize + DeserializeOwned + 'static,
        F: Fn(A) -> Result<R, JobError> + Send + Sync + 'static,
    {
        let func = JobFunc::blocking(move |value| {
            let args = serde_json::from_value(value).map_err(invalid_args)?;
            encode(f(args)?)
        });
        JobWrapper::new(self.clone(), name.into(), func)
    }

    /// Register an async job function under `name`.
    pub fn job_async<A, R, F, Fut>(&self, name: impl Into<String>, f: F) -> JobWrapper<A, R>
    where
        A: Serialize + DeserializeOwned + 'static,
        R: Serialize + DeserializeOwned + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, JobError>> + Send + 'static,
    {
        let func = JobFunc::suspendable(move |value| {
            let pending = serde_json::from_value::<A>(value).map(&f);
            async move {
                let out = pending.map_err(invalid_args)?.await?;
                encode(out)
            }
        });
        JobWrapper::new(self.clone(), name.into(), func)
    }
}
