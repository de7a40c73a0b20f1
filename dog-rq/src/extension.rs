use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dog_core::{context_for, AppFamily, AppId, CurrentContext, DogApp, WeakDogApp};
use dog_queue::{factory_by_name, ConnectionFactory, JobClass, JobRegistry, Queue, SharedConnection};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::cli::RqCommand;
use crate::config::{RqSettings, DEFAULT_QUEUE};
use crate::job_class::ContextBoundJobClass;
use crate::provisioner::{provision_queues, resolve_execution_mode, QueueSet};
use crate::resolver::resolve_connections;
use crate::{RqError, RqResult};

/// Name the extension is registered under on each app
pub const EXTENSION_NAME: &str = "rq";

struct Registration {
    app: WeakDogApp,
    queues: Arc<QueueSet>,
}

struct RqInner {
    registrations: RwLock<HashMap<AppId, Registration>>,
    sync_context: RwLock<Option<Arc<dyn CurrentContext>>>,
    async_context: RwLock<Option<Arc<dyn CurrentContext>>>,
    factory: Option<Arc<dyn ConnectionFactory>>,
    registry: Arc<JobRegistry>,
}

/// Job queue extension.
///
/// One instance can serve several apps; each app gets its own queues when
/// passed to [`init_app`](Self::init_app). Accessors such as
/// [`queues`](Self::queues) pick the app active in the caller's context.
///
/// Registrations hold apps weakly: the queues of a dropped app are released
/// by the next registration or lookup.
#[derive(Clone)]
pub struct Rq {
    inner: Arc<RqInner>,
}

impl Rq {
    /// Connections are built by the factory named in `rq.connection_class`.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Build every app's connections with `factory`, ignoring
    /// `rq.connection_class`.
    pub fn with_connection_factory(factory: Arc<dyn ConnectionFactory>) -> Self {
        Self::build(Some(factory))
    }

    fn build(factory: Option<Arc<dyn ConnectionFactory>>) -> Self {
        Self {
            inner: Arc::new(RqInner {
                registrations: RwLock::new(HashMap::new()),
                sync_context: RwLock::new(None),
                async_context: RwLock::new(None),
                factory,
                registry: Arc::new(JobRegistry::new()),
            }),
        }
    }

    /// Job callables known to every queue of this extension
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.inner.registry
    }

    /// Provision `app`'s connections and queues and install the `rq`
    /// extension and command group on it.
    ///
    /// Fails if an `rq` extension is already installed on the app. Nothing
    /// is registered when resolution fails.
    pub fn init_app(&self, app: &DogApp) -> RqResult<()> {
        if app.has_extension(EXTENSION_NAME) {
            return Err(RqError::AlreadyRegistered);
        }

        let settings = RqSettings::from_app(app)?;
        let factory = match &self.inner.factory {
            Some(factory) => Arc::clone(factory),
            None => factory_by_name(settings.connection_class())?,
        };

        let connections = resolve_connections(&settings.connection_specs(), factory.as_ref())?;
        let is_async = resolve_execution_mode(settings.is_async, app.testing());
        let job_class: Arc<dyn JobClass> = Arc::new(ContextBoundJobClass::new(app));
        let queues = provision_queues(
            &connections,
            &settings.queues,
            is_async,
            job_class,
            Arc::clone(&self.inner.registry),
        );

        let slot = match app.family() {
            AppFamily::Sync => &self.inner.sync_context,
            AppFamily::Async => &self.inner.async_context,
        };
        slot.write().get_or_insert_with(|| context_for(app.family()));

        self.prune();
        self.inner.registrations.write().insert(
            app.id(),
            Registration {
                app: app.downgrade(),
                queues: Arc::new(queues),
            },
        );

        app.register_extension(EXTENSION_NAME, Arc::new(self.clone()));
        app.register_command(Arc::new(RqCommand::new(self.clone())));

        info!(
            app = %app.name(),
            factory = factory.name(),
            is_async,
            queues = ?self.queues_for(app)?.names(),
            "rq extension initialized"
        );
        Ok(())
    }

    /// Release the queues of apps that have been dropped.
    fn prune(&self) {
        let mut registrations = self.inner.registrations.write();
        registrations.retain(|id, reg| {
            let alive = reg.app.is_alive();
            if !alive {
                debug!(app = %id, "dropping queues of a released app");
            }
            alive
        });
    }

    /// Number of registered apps still alive
    pub fn registered_count(&self) -> usize {
        self.prune();
        self.inner.registrations.read().len()
    }

    /// The registered app active in the caller's context.
    ///
    /// The sync accessor is asked before the async one.
    pub fn current_app(&self) -> RqResult<DogApp> {
        if self.registered_count() == 0 {
            return Err(RqError::NoApplications);
        }

        let accessors = [&self.inner.sync_context, &self.inner.async_context];
        let app = accessors
            .iter()
            .filter_map(|slot| slot.read().clone())
            .find_map(|ctx| ctx.current())
            .ok_or(RqError::OutsideContext)?;

        if !self.inner.registrations.read().contains_key(&app.id()) {
            return Err(RqError::NotRegistered);
        }
        Ok(app)
    }

    /// Queues of `app`
    pub fn queues_for(&self, app: &DogApp) -> RqResult<Arc<QueueSet>> {
        self.prune();
        self.inner
            .registrations
            .read()
            .get(&app.id())
            .map(|reg| Arc::clone(&reg.queues))
            .ok_or(RqError::NotRegistered)
    }

    /// Queues of the current app
    pub fn queues(&self) -> RqResult<Arc<QueueSet>> {
        self.queues_for(&self.current_app()?)
    }

    /// A queue of the current app, by name
    pub fn get_queue(&self, name: &str) -> RqResult<Queue> {
        self.queues()?
            .get(name)
            .cloned()
            .ok_or_else(|| RqError::QueueNotFound(name.to_string()))
    }

    /// The current app's default queue
    pub fn queue(&self) -> RqResult<Queue> {
        self.get_queue(DEFAULT_QUEUE)
    }

    /// Connection of the named queue, or of the default queue when no
    /// such queue exists
    pub fn connection(&self, queue: &str) -> RqResult<SharedConnection> {
        let queues = self.queues()?;
        let queue = queues.get(queue).unwrap_or_else(|| queues.default_queue());
        Ok(Arc::clone(queue.connection()))
    }
}

impl Default for Rq {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Rq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rq")
            .field("registered", &self.registered_count())
            .field("functions", &self.inner.registry.registered_names())
            .finish()
    }
}
