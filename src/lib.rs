pub mod config;
pub mod dom;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod keyboard;
pub mod llm;
pub mod presence;
pub mod settings;
pub mod store;

pub use engine::{Engine, EngineHandle};
pub use errors::{SparkError, SparkResult};

/// Initialize tracing and load `.env` if present. Safe to call more than
/// once; only the first call installs the subscriber.
pub fn init_telemetry() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .try_init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();
}
