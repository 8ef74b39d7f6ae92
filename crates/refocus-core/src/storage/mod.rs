mod config;
pub mod store;

pub use config::{Config, PlanConfig};
pub use store::{session_key, SessionRecord, SessionStore, StorageEvent, Subscription};

use std::path::PathBuf;

/// Returns `~/.config/refocus[-dev]/` based on REFOCUS_ENV.
///
/// Set REFOCUS_ENV=dev to use the development data directory, or
/// REFOCUS_DATA_DIR to pin an explicit directory (used by integration
/// tests to stay hermetic).
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> std::io::Result<PathBuf> {
    if let Ok(dir) = std::env::var("REFOCUS_DATA_DIR") {
        let dir = PathBuf::from(dir);
        std::fs::create_dir_all(&dir)?;
        return Ok(dir);
    }

    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("REFOCUS_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("refocus-dev")
    } else {
        base_dir.join("refocus")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
