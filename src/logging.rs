//! Tracing initialisation.
//!
//! Logs go to stderr so they never interleave with the rendered menu on stdout.
//! `RUST_LOG` overrides the configured level when set:
//!
//! ```bash
//! RUST_LOG=andor_menu::menu=debug andor-camera
//! ```

use crate::error::{AppError, AppResult};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber at `level` (trace, debug, info, warn, error).
pub fn init(level: &str) -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| AppError::Logging(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))
}
