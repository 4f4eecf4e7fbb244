//! Tracing setup for the `chartbind` binary and embedding applications.
//!
//! Library code only emits `tracing` events. Hosts that already install a
//! subscriber can skip this module entirely.

/// Installs a compact `tracing` subscriber filtered by `RUST_LOG`
/// (falling back to `default_level`).
///
/// Returns `false` if a global subscriber was already set.
pub fn init_default_tracing(default_level: &str) -> bool {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .is_ok()
}
