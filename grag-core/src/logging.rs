//! ABOUTME: Tracing bootstrap shared by binaries, tests, and doctests
//! ABOUTME: Mirrors the ambient logging convention used across the workspace

/// Initialize a process-wide `tracing` subscriber from `RUST_LOG`, falling
/// back to `info` when unset. Safe to call more than once: later calls are
/// no-ops if a global subscriber is already installed.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
