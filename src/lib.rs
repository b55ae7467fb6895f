pub mod config;
pub mod db;
pub mod editor; // Structural edits to templates and instances
pub mod error;
pub mod export; // JSON template/instance documents
pub mod frequency; // Recurrence rules
pub mod materializer; // Template → instance + occurrences
pub mod models;
pub mod occurrences; // Completion events
pub mod service;
pub mod templates;
pub mod timeline; // Merged patient timeline
pub mod validation;

pub use error::ProtocolError;
pub use service::ProtocolService;

use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber. `RUST_LOG` takes precedence over
/// the default filter. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);
}
