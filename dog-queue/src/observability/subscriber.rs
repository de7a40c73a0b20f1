use tracing_subscriber::EnvFilter;

pub type InitResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Human-readable logs filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() -> InitResult {
    tracing_subscriber::fmt().with_env_filter(filter()).try_init()
}

/// JSON logs filtered by `RUST_LOG` (default `info`).
pub fn init_json_tracing() -> InitResult {
    tracing_subscriber::fmt().json().with_env_filter(filter()).try_init()
}
