use dog_core::{AppFamily, AppId, DogApp, WeakDogApp};
use dog_queue::{JobClass, JobError, JobFunc, QueueError, QueueResult};

/// Job class that runs every callable inside its owning app's context.
///
/// One is created per registered app and installed on all of that app's
/// queues. It only holds a weak handle, so queued jobs do not keep the app
/// alive; a job that runs after the app is gone fails with
/// [`JobError::Context`].
///
/// Sync-family apps get a blocking wrapper that pushes the thread-local
/// context, async-family apps a suspendable wrapper that scopes the
/// task-local one. Either wrapper accepts either style of callable.
#[derive(Debug, Clone)]
pub struct ContextBoundJobClass {
    owner: WeakDogApp,
    family: AppFamily,
}

impl ContextBoundJobClass {
    pub fn new(app: &DogApp) -> Self {
        Self {
            owner: app.downgrade(),
            family: app.family(),
        }
    }

    pub fn owner(&self) -> &WeakDogApp {
        &self.owner
    }

    pub fn family(&self) -> AppFamily {
        self.family
    }
}

fn owner_gone(id: AppId) -> String {
    format!("application {id} no longer exists")
}

fn upgrade(owner: &WeakDogApp) -> Result<DogApp, JobError> {
    owner
        .upgrade()
        .ok_or_else(|| JobError::context(owner_gone(owner.id())))
}

impl JobClass for ContextBoundJobClass {
    fn name(&self) -> &str {
        "ContextBoundJob"
    }

    fn wrap(&self, func: JobFunc) -> QueueResult<JobFunc> {
        if !self.owner.is_alive() {
            return Err(QueueError::JobClass(owner_gone(self.owner.id())));
        }
        let owner = self.owner.clone();

        Ok(match self.family {
            AppFamily::Sync => JobFunc::blocking(move |args| {
                let app = upgrade(&owner)?;
                let _ctx = app.app_context();
                func.call_blocking(args)
            }),
            AppFamily::Async => JobFunc::suspendable(move |args| {
                let owner = owner.clone();
                let func = func.clone();
                async move {
                    let app = upgrade(&owner)?;
                    match func {
                        JobFunc::Suspendable(f) => app.scope(f(args)).await,
                        JobFunc::Blocking(f) => {
                            tokio::task::spawn_blocking(move || app.sync_scope(|| f(args))).await?
                        }
                    }
                }
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn reads_config() -> JobFunc {
        JobFunc::blocking(|key: Value| {
            let app = dog_core::current_app().ok_or_else(|| JobError::failed("no app"))?;
            Ok(app.get(key.as_str().unwrap_or_default()).unwrap_or(Value::Null))
        })
    }

    fn reads_config_async() -> JobFunc {
        JobFunc::suspendable(|key: Value| async move {
            tokio::task::yield_now().await;
            let app = dog_core::current_app().ok_or_else(|| JobError::failed("no app"))?;
            Ok(app.get(key.as_str().unwrap_or_default()).unwrap_or(Value::Null))
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn both_families_see_their_app_with_both_styles() {
        for app in [DogApp::new("sync"), DogApp::new_async("async")] {
            app.set("greeting", "hi from app");
            let class = ContextBoundJobClass::new(&app);

            for func in [reads_config(), reads_config_async()] {
                let wrapped = class.wrap(func).unwrap();
                assert_eq!(
                    wrapped.call(json!("greeting")).await.unwrap(),
                    json!("hi from app"),
                    "{:?}",
                    app.family()
                );
            }
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blocking_callers_can_run_suspendable_bodies() {
        let app = DogApp::new("sync");
        app.set("n", 7);
        let wrapped = ContextBoundJobClass::new(&app).wrap(reads_config_async()).unwrap();
        let out = tokio::task::spawn_blocking(move || wrapped.call_blocking(json!("n")))
            .await
            .unwrap();
        assert_eq!(out.unwrap(), json!(7));
    }

    #[tokio::test]
    async fn context_is_left_after_errors() {
        let app = DogApp::new("sync");
        let failing = JobFunc::blocking(|_| Err(JobError::failed("boom")));
        let wrapped = ContextBoundJobClass::new(&app).wrap(failing).unwrap();

        assert_eq!(wrapped.call_blocking(json!(null)), Err(JobError::failed("boom")));
        assert!(dog_core::current_app().is_none());
    }

    #[tokio::test]
    async fn dead_owner_fails() {
        let app = DogApp::new_async("gone");
        let class = ContextBoundJobClass::new(&app);
        let wrapped = class.wrap(reads_config()).unwrap();
        drop(app);

        let err = wrapped.call(json!("x")).await.unwrap_err();
        assert!(matches!(err, JobError::Context(_)));
        assert!(matches!(class.wrap(reads_config()), Err(QueueError::JobClass(_))));
    }
}
