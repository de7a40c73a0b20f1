use dog_core::DogApp;
use dog_queue::{Queue, Worker, WorkerOptions};
use tracing::debug;

use crate::config::DEFAULT_QUEUE;
use crate::provisioner::QueueSet;
use crate::{Rq, RqError, RqResult};

impl Rq {
    /// Worker for the current app.
    ///
    /// With no names (or an empty list) the worker watches every queue,
    /// `"default"` first, and so uses the default connection. An explicit
    /// list is watched in the given order and the worker uses the first
    /// listed queue's connection.
    pub fn make_worker(&self, queues: Option<&[&str]>, options: WorkerOptions) -> RqResult<Worker> {
        self.make_worker_for(&self.current_app()?, queues, options)
    }

    /// Same as [`make_worker`](Self::make_worker) for a given app.
    pub fn make_worker_for(
        &self,
        app: &DogApp,
        queues: Option<&[&str]>,
        options: WorkerOptions,
    ) -> RqResult<Worker> {
        let provisioned = self.queues_for(app)?;

        let selected = match queues {
            Some(names) if !names.is_empty() => listed_queues(&provisioned, names)?,
            _ => all_queues_default_first(&provisioned),
        };

        debug!(
            app = %app.name(),
            queues = ?selected.iter().map(Queue::name).collect::<Vec<_>>(),
            "assembling worker"
        );
        Ok(Worker::new(selected, options)?)
    }
}

fn all_queues_default_first(provisioned: &QueueSet) -> Vec<Queue> {
    let mut selected = vec![provisioned.default_queue().clone()];
    selected.extend(
        provisioned
            .iter()
            .filter(|(name, _)| *name != DEFAULT_QUEUE)
            .map(|(_, queue)| queue.clone()),
    );
    selected
}

fn listed_queues(provisioned: &QueueSet, names: &[&str]) -> RqResult<Vec<Queue>> {
    names
        .iter()
        .map(|name| {
            provisioned
                .get(name)
                .cloned()
                .ok_or_else(|| RqError::QueueNotFound(name.to_string()))
        })
        .collect()
}
