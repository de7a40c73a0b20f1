use std::time::Duration;

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use dog_core::{DogApp, DogCommand};
use dog_queue::{WorkOptions, WorkerOptions};
use tracing::{error, info};

use crate::Rq;

#[derive(Parser, Debug)]
#[command(name = "rq", about = "Job queue worker commands")]
pub struct RqCli {
    #[command(subcommand)]
    pub command: RqSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum RqSubcommand {
    /// Start a worker that runs queued jobs
    Worker(WorkerArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct WorkerArgs {
    /// Stop once every queue is empty
    #[arg(short, long)]
    pub burst: bool,

    /// Worker name, random when unset
    #[arg(short, long)]
    pub name: Option<String>,

    /// Seconds to keep job results
    #[arg(long, default_value_t = 500)]
    pub results_ttl: u64,

    /// Seconds the worker's registration stays valid
    #[arg(long, default_value_t = 420)]
    pub worker_ttl: u64,

    /// Seconds between maintenance runs
    #[arg(long, default_value_t = 600)]
    pub maintenance_interval: u64,

    /// Seconds between progress reports of a running job
    #[arg(long, default_value_t = 30)]
    pub job_monitoring_interval: u64,

    /// Stop after this many jobs
    #[arg(long)]
    pub max_jobs: Option<usize>,

    /// Stop after being idle this many seconds
    #[arg(long)]
    pub max_idle_time: Option<u64>,

    /// Run the scheduler too
    #[arg(long)]
    pub with_scheduler: bool,

    /// Queues to watch, in order; all queues when none are given
    pub queues: Vec<String>,
}

impl WorkerArgs {
    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            name: self.name.clone(),
            default_result_ttl: Duration::from_secs(self.results_ttl),
            worker_ttl: Duration::from_secs(self.worker_ttl),
            maintenance_interval: Duration::from_secs(self.maintenance_interval),
            job_monitoring_interval: Duration::from_secs(self.job_monitoring_interval),
        }
    }

    pub fn work_options(&self) -> WorkOptions {
        WorkOptions {
            burst: self.burst,
            max_jobs: self.max_jobs,
            max_idle_time: self.max_idle_time.map(Duration::from_secs),
            with_scheduler: self.with_scheduler,
            ..WorkOptions::default()
        }
    }
}

/// The `rq` command group installed by [`Rq::init_app`]
pub struct RqCommand {
    rq: Rq,
}

impl RqCommand {
    pub fn new(rq: Rq) -> Self {
        Self { rq }
    }

    async fn worker(&self, app: &DogApp, args: WorkerArgs) -> anyhow::Result<i32> {
        let names: Vec<&str> = args.queues.iter().map(String::as_str).collect();
        let worker = self
            .rq
            .make_worker_for(app, Some(names.as_slice()), args.worker_options())?;

        info!(worker = %worker.name(), queues = ?worker.queue_names(), "starting worker");
        match worker.work(args.work_options()).await {
            Ok(_) => Ok(0),
            Err(e) => {
                error!(error = %e, "worker stopped with an error");
                Ok(1)
            }
        }
    }
}

#[async_trait]
impl DogCommand for RqCommand {
    fn name(&self) -> &str {
        "rq"
    }

    fn about(&self) -> &str {
        "Job queue worker commands"
    }

    async fn run(&self, app: DogApp, args: Vec<String>) -> anyhow::Result<i32> {
        let argv = std::iter::once("rq".to_string()).chain(args);
        let cli = match RqCli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(e) => {
                let code = e.exit_code();
                e.print()?;
                return Ok(code);
            }
        };

        match cli.command {
            RqSubcommand::Worker(args) => self.worker(&app, args).await,
        }
    }
}
