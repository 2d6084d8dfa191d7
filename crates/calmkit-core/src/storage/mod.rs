mod config;

pub use config::{Config, LoggingConfig, SessionConfig};

use std::path::PathBuf;

/// Returns the config directory, creating it if needed.
///
/// `CALMKIT_CONFIG_DIR` overrides the location entirely. Otherwise this is
/// `~/.config/calmkit[-dev]/`, with `CALMKIT_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("CALMKIT_CONFIG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("CALMKIT_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("calmkit-dev")
            } else {
                base_dir.join("calmkit")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
