//! Ambient application context.
//!
//! Two families of hosts exist and each keeps "the current app" in its
//! own place:
//!
//! - [`AppFamily::Sync`] apps live on a thread-local stack. Entering is a
//!   guard (`app.app_context()`) that pops on drop.
//! - [`AppFamily::Async`] apps live in a tokio task-local, entered with
//!   `app.scope(fut)` or, for blocking code, `app.sync_scope(f)`.
//!
//! Code that needs to know which app is active without having it passed
//! in asks a [`CurrentContext`] accessor, or calls [`current_app`].

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use pin_project::pin_project;

use crate::app::{AppFamily, AppId, DogApp};

thread_local! {
    static SYNC_STACK: RefCell<Vec<DogApp>> = const { RefCell::new(Vec::new()) };
}

tokio::task_local! {
    static ASYNC_APP: DogApp;
}

/// Keeps an app pushed on the current thread's context stack.
///
/// Not `Send`: the context belongs to the thread that created it.
#[must_use = "the app context is popped as soon as the guard is dropped"]
pub struct AppContextGuard {
    app_id: AppId,
    _not_send: PhantomData<*const ()>,
}

impl AppContextGuard {
    pub(crate) fn push(app: DogApp) -> Self {
        let app_id = app.id();
        SYNC_STACK.with(|stack| stack.borrow_mut().push(app));
        Self {
            app_id,
            _not_send: PhantomData,
        }
    }
}

impl Drop for AppContextGuard {
    fn drop(&mut self) {
        let _ = SYNC_STACK.try_with(|stack| {
            let popped = stack.borrow_mut().pop();
            if let Some(app) = popped {
                if app.id() != self.app_id {
                    tracing::warn!(
                        expected = %self.app_id,
                        found = %app.id(),
                        "app context popped out of order"
                    );
                }
            }
        });
    }
}

/// Future adapter that makes `app` the thread's current app for the
/// duration of every poll of `inner`.
#[pin_project]
pub struct InSyncContext<F> {
    app: DogApp,
    #[pin]
    inner: F,
}

impl<F> InSyncContext<F> {
    pub(crate) fn new(app: DogApp, inner: F) -> Self {
        Self { app, inner }
    }
}

impl<F: Future> Future for InSyncContext<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _guard = AppContextGuard::push(this.app.clone());
        this.inner.poll(cx)
    }
}

pub(crate) async fn async_scope<F: Future>(app: DogApp, fut: F) -> F::Output {
    ASYNC_APP.scope(app, fut).await
}

pub(crate) fn async_sync_scope<F, R>(app: DogApp, f: F) -> R
where
    F: FnOnce() -> R,
{
    ASYNC_APP.sync_scope(app, f)
}

/// Capability to look up the app active in the caller's context.
pub trait CurrentContext: Send + Sync {
    /// Which host family this accessor polls.
    fn family(&self) -> AppFamily;

    /// The innermost active app, if any.
    fn current(&self) -> Option<DogApp>;
}

/// Thread-local accessor used by [`AppFamily::Sync`] hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncContext;

impl CurrentContext for SyncContext {
    fn family(&self) -> AppFamily {
        AppFamily::Sync
    }

    fn current(&self) -> Option<DogApp> {
        SYNC_STACK
            .try_with(|stack| stack.borrow().last().cloned())
            .ok()
            .flatten()
    }
}

/// Task-local accessor used by [`AppFamily::Async`] hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct AsyncContext;

impl CurrentContext for AsyncContext {
    fn family(&self) -> AppFamily {
        AppFamily::Async
    }

    fn current(&self) -> Option<DogApp> {
        ASYNC_APP.try_with(|app| app.clone()).ok()
    }
}

/// The accessor matching a host family.
pub fn context_for(family: AppFamily) -> Arc<dyn CurrentContext> {
    match family {
        AppFamily::Sync => Arc::new(SyncContext),
        AppFamily::Async => Arc::new(AsyncContext),
    }
}

/// The app active in either family, task-local first.
pub fn current_app() -> Option<DogApp> {
    AsyncContext.current().or_else(|| SyncContext.current())
}
