//! dog-core: framework-agnostic core for DogRS.
//!
//! The application container ([`DogApp`]), its configuration store,
//! the extension and command registries, and the ambient "current app"
//! context shared by everything that runs on behalf of an app.

pub mod app;
pub mod cli;
pub mod config;
pub mod context;
pub mod registry;

pub use app::{AppFamily, AppId, DogApp, WeakDogApp};
pub use cli::DogCommand;
pub use config::{DogConfig, DogConfigSnapshot};
pub use context::{context_for, current_app, AppContextGuard, AsyncContext, CurrentContext, SyncContext};
pub use registry::DogExtensionRegistry;
