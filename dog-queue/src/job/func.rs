use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::JobError;

/// What a job body produces
pub type JobOutput = Result<Value, JobError>;

pub type BlockingFn = Arc<dyn Fn(Value) -> JobOutput + Send + Sync>;
pub type SuspendableFn = Arc<dyn Fn(Value) -> BoxFuture<'static, JobOutput> + Send + Sync>;

/// A job body: either a plain blocking function or one that returns a
/// future.
///
/// Both can be invoked from either side: [`call`](Self::call) from async
/// code, [`call_blocking`](Self::call_blocking) from blocking code.
#[derive(Clone)]
pub enum JobFunc {
    Blocking(BlockingFn),
    Suspendable(SuspendableFn),
}

impl JobFunc {
    pub fn blocking<F>(f: F) -> Self
    where
        F: Fn(Value) -> JobOutput + Send + Sync + 'static,
    {
        Self::Blocking(Arc::new(f))
    }

    pub fn suspendable<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = JobOutput> + Send + 'static,
    {
        Self::Suspendable(Arc::new(move |args| f(args).boxed()))
    }

    pub fn is_suspendable(&self) -> bool {
        matches!(self, Self::Suspendable(_))
    }

    /// Run from async code.
    ///
    /// Blocking bodies run on the blocking pool. Panics become
    /// [`JobError::Panicked`].
    pub async fn call(&self, args: Value) -> JobOutput {
        match self {
            Self::Blocking(f) => {
                let f = Arc::clone(f);
                tokio::task::spawn_blocking(move || f(args)).await?
            }
            Self::Suspendable(f) => AssertUnwindSafe(f(args))
                .catch_unwind()
                .await
                .map_err(|payload| JobError::Panicked(panic_message(payload.as_ref())))?,
        }
    }

    /// Run from blocking code; suspendable bodies are driven to completion
    /// on the calling thread.
    pub fn call_blocking(&self, args: Value) -> JobOutput {
        match self {
            Self::Blocking(f) => f(args),
            Self::Suspendable(f) => futures::executor::block_on(f(args)),
        }
    }
}

impl fmt::Debug for JobFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocking(_) => f.write_str("JobFunc::Blocking"),
            Self::Suspendable(_) => f.write_str("JobFunc::Suspendable"),
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
