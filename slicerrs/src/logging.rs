//! Opt-in log output for binaries and tests embedding the compiler.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `SLICER_LOG`, then `RUST_LOG`,
/// defaulting to `warn`. Safe to call more than once; only the first call
/// installs anything.
pub fn init() {
    let filter = std::env::var("SLICER_LOG")
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
