use std::collections::HashSet;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::warn;

/// Deprecated entry points, each warned about once per process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Deprecated {
    GetConnection,
    GetQueue,
    GetWorker,
    Job,
    Delay,
}

impl Deprecated {
    pub fn message(self) -> &'static str {
        match self {
            Self::GetConnection => {
                "'compat::get_connection' is deprecated and will be removed. Use 'rq.get_queue(name)?.connection()' instead."
            }
            Self::GetQueue => "'compat::get_queue' is deprecated and will be removed. Use 'rq.get_queue(name)' instead.",
            Self::GetWorker => "'compat::get_worker' is deprecated and will be removed. Use 'rq.make_worker(..)' instead.",
            Self::Job => "'compat::job' is deprecated and will be removed. Use 'rq.job(..)' instead.",
            Self::Delay => {
                "The 'delay' method has been renamed to 'enqueue'. The old name is deprecated and will be removed."
            }
        }
    }
}

static WARNED: Lazy<Mutex<HashSet<Deprecated>>> = Lazy::new(|| Mutex::new(HashSet::new()));

/// Log the deprecation notice for `which` unless it was already logged.
///
/// Returns whether a warning was emitted.
pub fn warn_once(which: Deprecated) -> bool {
    let first = WARNED.lock().insert(which);
    if first {
        warn!(deprecated = ?which, "{}", which.message());
    }
    first
}
