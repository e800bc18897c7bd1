//! Logging setup for hosts embedding the loader.
//!
//! The loader emits `tracing` events under the `just::resolver`,
//! `just::exporter`, `just::fetch` and `just::factory` targets.

use tracing::Level;

/// Install a global fmt subscriber writing events at `level` and above to stderr.
///
/// Returns an error message if a global subscriber is already set.
pub fn try_init(level: Level) -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| e.to_string())
}

/// Like `try_init`, ignoring an already installed subscriber.
pub fn init(level: Level) {
    let _ = try_init(level);
}
