use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use anyhow::Result;
use parking_lot::RwLock;
use serde_json::Value;

use crate::cli::DogCommand;
use crate::context::{self, AppContextGuard, InSyncContext};
use crate::{DogConfig, DogConfigSnapshot, DogExtensionRegistry};

static NEXT_APP_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`DogApp`].
///
/// Clones of an app share the id; two independently created apps never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppId(u64);

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app#{}", self.0)
    }
}

/// How an app runs its handlers, and therefore where its ambient
/// context lives (see [`crate::context`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppFamily {
    /// Blocking handlers, thread-scoped context.
    Sync,
    /// Async handlers, task-scoped context.
    Async,
}

struct DogAppInner {
    id: AppId,
    name: String,
    family: AppFamily,
    config: RwLock<DogConfig>,
    extensions: RwLock<DogExtensionRegistry>,
    commands: RwLock<BTreeMap<String, Arc<dyn DogCommand>>>,
}

/// DogApp is the central application container for DogRS.
///
/// Framework-agnostic. Holds:
/// - config
/// - extensions, by name
/// - CLI command groups
///
/// Cloning is cheap and every clone refers to the same app.
pub struct DogApp {
    inner: Arc<DogAppInner>,
}

impl Clone for DogApp {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for DogApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DogApp")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("family", &self.inner.family)
            .finish()
    }
}

impl DogApp {
    /// A sync-family app.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_family(name, AppFamily::Sync)
    }

    /// An async-family app.
    pub fn new_async(name: impl Into<String>) -> Self {
        Self::with_family(name, AppFamily::Async)
    }

    pub fn with_family(name: impl Into<String>, family: AppFamily) -> Self {
        let id = AppId(NEXT_APP_ID.fetch_add(1, Ordering::Relaxed));
        Self {
            inner: Arc::new(DogAppInner {
                id,
                name: name.into(),
                family,
                config: RwLock::new(DogConfig::new()),
                extensions: RwLock::new(DogExtensionRegistry::new()),
                commands: RwLock::new(BTreeMap::new()),
            }),
        }
    }

    pub fn id(&self) -> AppId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn family(&self) -> AppFamily {
        self.inner.family
    }

    /// True when both handles refer to the same app.
    pub fn ptr_eq(&self, other: &DogApp) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// A handle that does not keep the app alive.
    pub fn downgrade(&self) -> WeakDogApp {
        WeakDogApp {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// The `testing` config flag.
    pub fn testing(&self) -> bool {
        self.get_bool("testing").unwrap_or(false)
    }

    pub fn set_testing(&self, testing: bool) {
        self.set("testing", testing);
    }
}

// ──────────────────────────────────────────────────────────────
// Config
// ──────────────────────────────────────────────────────────────

impl DogApp {
    /// Feathers: `app.set(key, value)`
    pub fn set<K, V>(&self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.inner.config.write().set(key, value);
    }

    /// Feathers: `app.get(key)`
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.config.read().get(key).cloned()
    }

    /// String view of a config value; non-strings are rendered as JSON.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.config_snapshot().get_string(key)
    }

    /// Boolean view of a config value; `"true"`/`"false"` strings count.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.config_snapshot().get_bool(key)
    }

    pub fn unset(&self, key: &str) -> Option<Value> {
        self.inner.config.write().remove(key)
    }

    /// Edit the config in place.
    pub fn configure<F>(&self, f: F)
    where
        F: FnOnce(&mut DogConfig),
    {
        let mut cfg = self.inner.config.write();
        f(&mut cfg);
    }

    pub fn config_snapshot(&self) -> DogConfigSnapshot {
        self.inner.config.read().snapshot()
    }

    /// Every key under `prefix`, prefix stripped.
    pub fn namespace(&self, prefix: &str) -> DogConfigSnapshot {
        self.inner.config.read().namespace(prefix)
    }

    /// Apply `PREFIX__A__B=value` environment overrides.
    pub fn load_env(&self, prefix: &str) {
        self.inner.config.write().load_env(prefix);
    }
}

// ──────────────────────────────────────────────────────────────
// Extensions and commands
// ──────────────────────────────────────────────────────────────

impl DogApp {
    pub fn register_extension<T>(&self, name: impl Into<String>, extension: Arc<T>)
    where
        T: std::any::Any + Send + Sync,
    {
        self.inner.extensions.write().register(name, extension);
    }

    pub fn extension<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: std::any::Any + Send + Sync,
    {
        self.inner.extensions.read().get::<T>(name)
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.inner.extensions.read().contains(name)
    }

    /// Install a command group; a later group with the same name wins.
    pub fn register_command(&self, command: Arc<dyn DogCommand>) {
        let name = command.name().to_string();
        tracing::debug!(app = %self.name(), command = %name, "registered command group");
        self.inner.commands.write().insert(name, command);
    }

    pub fn command(&self, name: &str) -> Option<Arc<dyn DogCommand>> {
        self.inner.commands.read().get(name).cloned()
    }

    pub fn command_names(&self) -> Vec<String> {
        self.inner.commands.read().keys().cloned().collect()
    }

    /// Run a CLI invocation, `args[0]` naming the command group.
    ///
    /// The command runs inside this app's context.
    pub async fn run_cli<I, S>(&self, args: I) -> Result<i32>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args: Vec<String> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            anyhow::bail!(
                "missing command; available: {}",
                self.command_names().join(", ")
            );
        }

        let name = args.remove(0);
        let command = self
            .command(&name)
            .ok_or_else(|| anyhow::anyhow!("no such command: {name}"))?;

        self.in_context(command.run(self.clone(), args)).await
    }
}

// ──────────────────────────────────────────────────────────────
// Ambient context
// ──────────────────────────────────────────────────────────────

impl DogApp {
    /// Push this app on the current thread's context stack.
    pub fn app_context(&self) -> AppContextGuard {
        AppContextGuard::push(self.clone())
    }

    /// Run `fut` with this app as the task-local current app.
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        context::async_scope(self.clone(), fut).await
    }

    /// Run blocking `f` with this app as the task-local current app.
    pub fn sync_scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        context::async_sync_scope(self.clone(), f)
    }

    /// Run `fut` in this app's context, using the accessor of its family.
    pub async fn in_context<F: Future>(&self, fut: F) -> F::Output {
        match self.family() {
            AppFamily::Sync => InSyncContext::new(self.clone(), fut).await,
            AppFamily::Async => self.scope(fut).await,
        }
    }

    /// The app active in the caller's context, if any.
    pub fn current() -> Option<DogApp> {
        context::current_app()
    }
}

/// Non-owning handle to a [`DogApp`].
#[derive(Clone)]
pub struct WeakDogApp {
    id: AppId,
    inner: Weak<DogAppInner>,
}

impl WeakDogApp {
    pub fn id(&self) -> AppId {
        self.id
    }

    pub fn upgrade(&self) -> Option<DogApp> {
        self.inner.upgrade().map(|inner| DogApp { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl fmt::Debug for WeakDogApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakDogApp")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    #[test]
    fn ids_are_unique_and_shared_by_clones() {
        let a = DogApp::new("a");
        let b = DogApp::new("a");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
        assert!(a.clone().ptr_eq(&a));
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn weak_handle_does_not_keep_app_alive() {
        let app = DogApp::new("short-lived");
        let weak = app.downgrade();
        assert!(weak.upgrade().is_some());
        drop(app);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn testing_flag_reads_config() {
        let app = DogApp::new("t");
        assert!(!app.testing());
        app.set_testing(true);
        assert!(app.testing());
        assert_eq!(app.get("testing"), Some(json!(true)));
    }

    struct Echo;

    #[async_trait]
    impl DogCommand for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn run(&self, app: DogApp, args: Vec<String>) -> Result<i32> {
            let current = DogApp::current().map(|a| a.ptr_eq(&app)).unwrap_or(false);
            Ok(if current { args.len() as i32 } else { -1 })
        }
    }

    #[tokio::test]
    async fn run_cli_dispatches_in_app_context() {
        for app in [DogApp::new("sync"), DogApp::new_async("async")] {
            app.register_command(Arc::new(Echo));
            let code = app.run_cli(["echo", "a", "b"]).await.unwrap();
            assert_eq!(code, 2);
        }
    }

    #[tokio::test]
    async fn run_cli_rejects_unknown_group() {
        let app = DogApp::new("none");
        let err = app.run_cli(["nope"]).await.unwrap_err();
        assert!(err.to_string().contains("no such command"));
    }
}
