use std::sync::Arc;

use dog_queue::{JobClass, JobRegistry, Queue};
use indexmap::IndexMap;
use tracing::debug;

use crate::config::DEFAULT_QUEUE;
use crate::resolver::ResolvedConnections;

/// The queues provisioned for one app, `"default"` first
#[derive(Debug, Clone)]
pub struct QueueSet {
    default: Queue,
    queues: IndexMap<String, Queue>,
}

impl QueueSet {
    pub fn get(&self, name: &str) -> Option<&Queue> {
        self.queues.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.queues.contains_key(name)
    }

    /// Names in provisioning order
    pub fn names(&self) -> Vec<&str> {
        self.queues.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Queue)> {
        self.queues.iter().map(|(name, queue)| (name.as_str(), queue))
    }

    pub fn default_queue(&self) -> &Queue {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

/// Explicit configuration wins; otherwise inline while testing.
pub fn resolve_execution_mode(configured: Option<bool>, testing: bool) -> bool {
    configured.unwrap_or(!testing)
}

/// One queue per declared name, plus `"default"` even when undeclared.
///
/// A queue uses the connection resolved under its own name (references
/// were already followed by the resolver) and otherwise shares the default
/// connection. Every queue gets the same mode, job class and registry.
pub fn provision_queues(
    connections: &ResolvedConnections,
    declared: &[String],
    is_async: bool,
    job_class: Arc<dyn JobClass>,
    registry: Arc<JobRegistry>,
) -> QueueSet {
    let build = |name: &str| {
        let connection = connections
            .get(name)
            .unwrap_or_else(|| connections.default_connection());
        Queue::new(name, Arc::clone(connection), Arc::clone(&registry))
            .with_async(is_async)
            .with_job_class(Arc::clone(&job_class))
    };

    let default = build(DEFAULT_QUEUE);
    let mut queues = IndexMap::with_capacity(declared.len() + 1);
    queues.insert(DEFAULT_QUEUE.to_string(), default.clone());

    for name in declared {
        if queues.contains_key(name) {
            continue;
        }
        if !connections.contains(name) {
            debug!(queue = %name, "no connection configured, sharing the default");
        }
        queues.insert(name.clone(), build(name));
    }

    debug!(queues = ?queues.keys().collect::<Vec<_>>(), is_async, "provisioned queues");
    QueueSet { default, queues }
}
