//! Logging setup for the reconciliation engine.
//!

// Re-exports for convenience
pub use tracing::metadata::LevelFilter;
pub use tracing::{debug, error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{util::SubscriberInitExt, Layer};

/// Set up logging for a process embedding the engine.
///
/// `RUST_LOG` is honored when set; an explicit `level` overrides both it and
/// the default of INFO for the privsync crates.
pub fn setup(level: Option<LevelFilter>) {
    let env = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "privsync_core=info,privsync_mysql=info".into());
    let env_layer = tracing_subscriber::EnvFilter::new(env).boxed();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_filter(level.unwrap_or(LevelFilter::INFO))
        .boxed();

    tracing_subscriber::registry()
        .with(vec![env_layer, fmt_layer])
        .init();

    debug!("logging set up");
}
