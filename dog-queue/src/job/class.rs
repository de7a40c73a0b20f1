use std::fmt;

use crate::job::JobFunc;
use crate::QueueResult;

/// Hook applied whenever a job's callable is read back for execution.
///
/// Queues carry a job class, and every job created on that queue (and
/// every worker built over it) reads its callable through
/// [`wrap`](JobClass::wrap). Implementations return a callable that
/// decorates the original, for instance to re-establish an execution
/// context around it.
pub trait JobClass: Send + Sync {
    /// Label for logs
    fn name(&self) -> &str {
        "Job"
    }

    fn wrap(&self, func: JobFunc) -> QueueResult<JobFunc>;
}

impl fmt::Debug for dyn JobClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobClass").field("name", &self.name()).finish()
    }
}

/// Runs callables as they are
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainJobClass;

impl JobClass for PlainJobClass {
    fn wrap(&self, func: JobFunc) -> QueueResult<JobFunc> {
        Ok(func)
    }
}
