use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use super::JobFunc;

/// Registry of job callables, by the name jobs refer to them with.
///
/// Workers and queues share one registry through an `Arc`; registration
/// can happen at any time and a later registration under the same name
/// replaces the earlier one.
pub struct JobRegistry {
    funcs: RwLock<HashMap<String, JobFunc>>,
}

impl JobRegistry {
    /// Create a new job registry
    pub fn new() -> Self {
        Self {
            funcs: RwLock::new(HashMap::new()),
        }
    }

    /// Register a callable under `name`
    pub fn register(&self, name: impl Into<String>, func: JobFunc) {
        let name = name.into();
        debug!(func = %name, suspendable = func.is_suspendable(), "registered job function");
        self.funcs.write().insert(name, func);
    }

    pub fn get(&self, name: &str) -> Option<JobFunc> {
        self.funcs.read().get(name).cloned()
    }

    /// Check if a callable is registered
    pub fn is_registered(&self, name: &str) -> bool {
        self.funcs.read().contains_key(name)
    }

    /// All registered names, sorted
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.funcs.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
