use async_trait::async_trait;

use crate::DogApp;

/// A command group an extension installs on the app's CLI.
///
/// `run` receives the arguments after the group name, e.g. for
/// `rq worker --burst` the `rq` command gets `["worker", "--burst"]`.
/// The returned integer is the process exit code.
#[async_trait]
pub trait DogCommand: Send + Sync {
    /// Name the group is invoked by.
    fn name(&self) -> &str;

    /// One line for help listings.
    fn about(&self) -> &str {
        ""
    }

    async fn run(&self, app: DogApp, args: Vec<String>) -> anyhow::Result<i32>;
}
