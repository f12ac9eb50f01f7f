use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall-clock helpers shared by the directory's expiry bookkeeping and the
/// connection layer's logging.
pub fn timestamp() -> Duration {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap()
}

pub fn now_ms() -> u64 {
    timestamp().as_millis() as u64
}

/// Installs the process-wide `tracing` subscriber. Call once, before the
/// directory or listener are started.
pub fn init_logging(verbosity: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
