use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging for the storage core.
pub fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("mesh_core=debug")
        } else {
            EnvFilter::new("mesh_core=info")
        }
    });

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)?;

    info!("storage core logging initialized");
    Ok(())
}

/// Initialize logging with fallback behavior if setup fails.
pub fn init_logging_safe() {
    if let Err(e) = init_logging() {
        eprintln!(
            "warning: failed to set up tracing subscriber: {}. Falling back to default output.",
            e
        );
    }
}

/// Log a pipeline stage transition (classify/compress/encrypt/shard or inverse).
pub fn log_pipeline_stage(file_hash_hex: &str, stage: &str, details: &str) {
    info!(target: "mesh_core::pipeline", "{} [{}]: {}", stage, file_hash_hex, details);
}

/// Log an auto-heal tick outcome for a single manifest.
pub fn log_heal_event(file_hash_hex: &str, outcome: &str) {
    info!(target: "mesh_core::heal", "{}: {}", file_hash_hex, outcome);
}

/// Log a threshold key-layer event (distribute/reconstruct).
pub fn log_key_event(file_hash_hex: &str, event: &str) {
    info!(target: "mesh_core::keys", "{}: {}", file_hash_hex, event);
}

/// Log an error with additional context.
pub fn log_error_with_context(context: &str, error: &dyn std::error::Error) {
    error!(target: "mesh_core::error", "{}: {}", context, error);
}
