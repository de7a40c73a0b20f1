use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::connection::SharedConnection;
use crate::job::{Job, JobClass};
use crate::observability::WorkerMetrics;
use crate::queue::{Queue, DEFAULT_RESULT_TTL};
use crate::{QueueError, QueueResult};

/// Construction options for a worker
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Worker name; a random one is generated when unset
    pub name: Option<String>,
    /// How long finished job records are kept
    pub default_result_ttl: Duration,
    /// How long the worker's own registration is considered alive
    pub worker_ttl: Duration,
    /// Interval between broker health checks while working
    pub maintenance_interval: Duration,
    /// Interval between "still running" reports for a long job
    pub job_monitoring_interval: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            name: None,
            default_result_ttl: DEFAULT_RESULT_TTL,
            worker_ttl: Duration::from_secs(420),
            maintenance_interval: Duration::from_secs(600),
            job_monitoring_interval: Duration::from_secs(30),
        }
    }
}

/// Options for one [`Worker::work`] run
#[derive(Debug, Clone)]
pub struct WorkOptions {
    /// Stop as soon as all queues are empty
    pub burst: bool,
    /// Stop after this many jobs
    pub max_jobs: Option<usize>,
    /// Stop after being idle this long
    pub max_idle_time: Option<Duration>,
    /// Run the scheduler alongside the worker
    pub with_scheduler: bool,
    /// Sleep between polls of empty queues
    pub poll_interval: Duration,
}

impl Default for WorkOptions {
    fn default() -> Self {
        Self {
            burst: false,
            max_jobs: None,
            max_idle_time: None,
            with_scheduler: false,
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl WorkOptions {
    pub fn burst() -> Self {
        Self {
            burst: true,
            ..Self::default()
        }
    }
}

/// Handle for managing a spawned worker
pub struct WorkerHandle {
    shutdown_tx: oneshot::Sender<()>,
    join_handle: JoinHandle<QueueResult<bool>>,
}

impl WorkerHandle {
    /// Gracefully shutdown the worker, returning whether it ran any job
    pub async fn shutdown(self) -> QueueResult<bool> {
        let _ = self.shutdown_tx.send(());
        self.join_handle
            .await
            .map_err(|e| QueueError::Internal(format!("Worker join error: {}", e)))?
    }
}

/// Drains a list of queues.
///
/// Queues are polled in list order. The worker talks to the broker
/// through the first queue's connection and reads every job's callable
/// through the first queue's job class.
pub struct Worker {
    name: String,
    queues: Vec<Queue>,
    connection: SharedConnection,
    job_class: Arc<dyn JobClass>,
    options: WorkerOptions,
    metrics: Arc<WorkerMetrics>,
}

impl Worker {
    pub fn new(queues: Vec<Queue>, options: WorkerOptions) -> QueueResult<Self> {
        let first = queues.first().ok_or(QueueError::NoQueues)?;
        let connection = Arc::clone(first.connection());
        let job_class = Arc::clone(first.job_class());
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

        Ok(Self {
            name,
            queues,
            connection,
            job_class,
            options,
            metrics: Arc::new(WorkerMetrics::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queues(&self) -> &[Queue] {
        &self.queues
    }

    pub fn queue_names(&self) -> Vec<&str> {
        self.queues.iter().map(Queue::name).collect()
    }

    pub fn connection(&self) -> &SharedConnection {
        &self.connection
    }

    pub fn job_class(&self) -> &Arc<dyn JobClass> {
        &self.job_class
    }

    pub fn options(&self) -> &WorkerOptions {
        &self.options
    }

    pub fn metrics(&self) -> &Arc<WorkerMetrics> {
        &self.metrics
    }

    /// Work until a stop condition in `options` is met.
    ///
    /// Returns whether at least one job was processed. Without `burst`,
    /// `max_jobs` or `max_idle_time` this runs forever; see
    /// [`spawn`](Self::spawn) for a stoppable worker.
    pub async fn work(&self, options: WorkOptions) -> QueueResult<bool> {
        self.work_until(options, std::future::pending()).await
    }

    /// Run in the background until the handle is shut down.
    pub fn spawn(self, options: WorkOptions) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let join_handle = tokio::spawn(async move {
            self.work_until(options, async {
                let _ = shutdown_rx.await;
            })
            .await
        });

        WorkerHandle {
            shutdown_tx,
            join_handle,
        }
    }

    #[instrument(skip_all, fields(worker = %self.name, queues = ?self.queue_names()))]
    async fn work_until<S>(&self, options: WorkOptions, shutdown: S) -> QueueResult<bool>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if options.with_scheduler {
            warn!("this worker has no scheduler; scheduled jobs are not run");
        }
        info!(burst = options.burst, "worker started");

        let mut processed = 0usize;
        let mut idle_since = Instant::now();
        let mut last_maintenance = Instant::now();
        let mut stopping = false;

        loop {
            if stopping {
                info!("Worker shutdown requested");
                break;
            }

            if options.max_jobs.is_some_and(|max| processed >= max) {
                info!(processed, "max jobs reached");
                break;
            }

            if last_maintenance.elapsed() >= self.options.maintenance_interval {
                self.maintenance().await?;
                last_maintenance = Instant::now();
            }

            // A job already taken off the queue always runs to completion.
            let next = self.process_next();
            tokio::pin!(next);
            let result = tokio::select! {
                biased;

                result = &mut next => result,

                _ = &mut shutdown => {
                    debug!("shutdown requested, finishing the current job");
                    stopping = true;
                    next.await
                }
            };

            match result {
                Ok(true) => {
                    processed += 1;
                    idle_since = Instant::now();
                }
                Ok(false) => {
                    if options.burst {
                        debug!("queues empty, burst finished");
                        break;
                    }
                    if options.max_idle_time.is_some_and(|max| idle_since.elapsed() >= max) {
                        info!("max idle time reached");
                        break;
                    }
                    if !stopping {
                        tokio::select! {
                            biased;

                            _ = &mut shutdown => stopping = true,
                            _ = tokio::time::sleep(options.poll_interval) => {}
                        }
                    }
                }
                Err(e) => {
                    error!("Error processing job: {}", e);
                    return Err(e);
                }
            }
        }

        info!(
            processed,
            successful = self.metrics.successful_jobs(),
            failed = self.metrics.failed_jobs(),
            "Worker stopped"
        );
        Ok(processed > 0)
    }

    async fn maintenance(&self) -> QueueResult<()> {
        debug!(worker_ttl = ?self.options.worker_ttl, "worker maintenance");
        self.connection.ping().await
    }

    /// Process the next available job, if any.
    pub async fn process_next(&self) -> QueueResult<bool> {
        let names = self.queue_names();

        let (origin, record) = loop {
            let Some((origin, job_id)) = self.connection.pop_job(&names).await? else {
                return Ok(false);
            };
            match self.connection.fetch_job(&job_id).await? {
                Some(record) => break (origin, record),
                None => warn!(job_id = %job_id, queue = %origin, "job record missing, skipping"),
            }
        };

        let registry = self
            .queues
            .iter()
            .find(|q| q.name() == origin)
            .unwrap_or(&self.queues[0])
            .registry();

        let mut job = Job::new(
            record,
            Arc::clone(&self.connection),
            Arc::clone(&self.job_class),
            Arc::clone(registry),
        );
        self.run_job(&mut job).await?;
        Ok(true)
    }

    async fn run_job(&self, job: &mut Job) -> QueueResult<()> {
        let job_id = job.id().clone();
        let func = job.func_name().to_string();
        debug!(job_id = %job_id, func = %func, queue = %job.origin(), "Processing job");

        let started = Instant::now();
        let outcome = {
            let execution = job.execute(Some(&self.name), Some(self.options.default_result_ttl));
            tokio::pin!(execution);

            let period = self.options.job_monitoring_interval.max(Duration::from_millis(10));
            let mut monitor = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    result = &mut execution => break result?,
                    _ = monitor.tick() => {
                        debug!(job_id = %job_id, elapsed = ?started.elapsed(), "job still running");
                    }
                }
            }
        };

        let took = started.elapsed();
        match outcome {
            Ok(_) => {
                self.metrics.record_success(took);
                info!(job_id = %job_id, func = %func, ?took, "Job completed successfully");
            }
            Err(e) => {
                self.metrics.record_failure(took);
                error!(job_id = %job_id, func = %func, error = %e, "Job failed");
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("queues", &self.queue_names())
            .field("connection", &self.connection)
            .finish()
    }
}
