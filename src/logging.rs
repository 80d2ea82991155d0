//! Log setup.
//!
//! The dashboard owns the terminal, so logs go to a file. `RUST_LOG`
//! overrides the level chosen by `--verbose`.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::debug;
use tracing_subscriber::EnvFilter;

pub fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "tickboard=debug,info" } else { "info" })
    })
}

/// Install the global subscriber writing to `path` (appending).
pub fn init(path: &Path, verbose: bool) -> std::io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let installed = tracing_subscriber::fmt()
        .with_env_filter(default_filter(verbose))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    // A second init in the same process keeps the first subscriber.
    if let Err(e) = installed {
        debug!(path = %path.display(), error = %e, "log subscriber already installed");
    }
    Ok(())
}
