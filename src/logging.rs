#![forbid(unsafe_code)]
//! Process-wide `tracing` subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::types::{KvError, Result};

/// Installs a formatted subscriber filtered by `level`, e.g. `"info"` or
/// `"leafkv::primitives::mmap=debug"`.
///
/// Fails instead of panicking when the directive is invalid or a global
/// subscriber is already installed.
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level).map_err(|_| KvError::Invalid("invalid log level"))?;
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|_| KvError::Invalid("logging already initialized"))
}
