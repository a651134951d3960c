//! Tracing setup.
//!
//! The TUI owns the terminal, so log output goes to a file instead of stderr.

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Environment variable holding the log filter, e.g. `shapes_auth=debug`.
pub const LOG_ENV: &str = "SHAPES_AUTH_LOG";

/// Filter used when `SHAPES_AUTH_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn";

/// Returns the default log file path: ~/.local/share/shapes-auth/shapes-auth.log
pub fn default_log_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir().context("Could not determine local data directory")?;
    Ok(data_dir.join("shapes-auth").join("shapes-auth.log"))
}

/// Install a global subscriber appending to `path`.
///
/// A second call is a no-op.
pub fn init(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(Arc::new(file))
        .with_ansi(false);

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        tracing::warn!(error = %err, "tracing already initialized");
    }
    Ok(())
}
