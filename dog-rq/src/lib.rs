//! # dog-rq: named job queues for DogRS apps
//!
//! [`Rq`] turns an app's `rq.` configuration into live connections and
//! named queues, runs every job inside the app that enqueued it, and
//! assembles workers over those queues.
//!
//! ```text
//! rq.connection         → resolver ─┐
//! rq.queue_connections  →           ├→ provisioner → QueueSet (per app)
//! rq.queues, rq.async   →  ─────────┘                  │
//!                                   Rq::make_worker ◄──┤
//!                                   JobWrapper::enqueue◄┘
//! ```
//!
//! - Connection specs are parameter objects, URLs, or the name of another
//!   connection. Names that reference the same target share one handle.
//! - `"default"` is always provisioned; queues without a connection of
//!   their own share the default one.
//! - Jobs run inline when `rq.async` is false, or when it is unset and the
//!   app is `testing`.
//! - [`ContextBoundJobClass`] makes the owning app current while a job
//!   runs, in either the sync or the async context family.
//!
//! ```rust
//! use dog_core::DogApp;
//! use dog_queue::{MemoryConnectionFactory, WorkOptions, WorkerOptions};
//! use dog_rq::Rq;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let app = DogApp::new_async("shop");
//! app.set("rq.queues", json!(["low"]));
//! app.set("shop.greeting", "hello");
//!
//! let rq = Rq::with_connection_factory(Arc::new(MemoryConnectionFactory::new()));
//! rq.init_app(&app)?;
//!
//! let greet = rq
//!     .job("greet", |name: String| {
//!         let app = dog_core::current_app().expect("runs in the app");
//!         Ok(format!("{} {name}", app.get_str("shop.greeting").unwrap_or_default()))
//!     })
//!     .queue("low");
//!
//! let job = app.scope(greet.enqueue("dog".into())).await?;
//! let worker = rq.make_worker_for(&app, Some(&["low"][..]), WorkerOptions::default())?;
//! worker.work(WorkOptions::burst()).await?;
//!
//! let result = job.latest_result().await?.expect("job ran");
//! assert_eq!(result.return_value, Some(json!("hello dog")));
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod compat;
pub mod config;
pub mod deprecation;
pub mod error;
pub mod extension;
pub mod job_class;
pub mod job_wrapper;
pub mod legacy;
pub mod provisioner;
pub mod resolver;
pub mod worker;

pub use cli::{RqCli, RqCommand, RqSubcommand, WorkerArgs};
pub use compat::QueueOverrides;
pub use config::{ConnectionSpec, RqSettings, DEFAULT_QUEUE};
pub use error::{ErrorKind, RqError, RqResult};
pub use extension::{Rq, EXTENSION_NAME};
pub use job_class::ContextBoundJobClass;
pub use job_wrapper::JobWrapper;
pub use provisioner::{provision_queues, resolve_execution_mode, QueueSet};
pub use resolver::{resolve_connections, ResolvedConnections};
