mod adapter;
mod model;
mod raw;

use std::path::{Path, PathBuf};

pub use model::{
    Launcher, Overrides, ProbePolicy, Readiness, Strategy, DEFAULT_GRACE_PERIOD, DEFAULT_PYTHON,
    DEFAULT_STOP_TIMEOUT,
};

/// File names looked up in the working directory when no file is given.
pub const DEFAULT_FILENAMES: [&str; 2] = ["tandem.toml", ".tandem.toml"];

/// Error type for configuration parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[cfg(feature = "toml")]
    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("validation error(s): {0}")]
    Validation(String),
}

/// Find a configuration file in `dir`.
#[must_use]
pub fn discover(dir: &Path) -> Option<PathBuf> {
    DEFAULT_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Load the launcher configuration.
///
/// An explicit `file` must exist. Without one, `dir` is searched for
/// [`DEFAULT_FILENAMES`] and the built-in defaults apply if none is found.
///
/// # Errors
///
/// Returns a `ConfigError` if the configuration file cannot be read or parsed.
pub fn load(file: Option<&Path>, dir: &Path) -> Result<Launcher, ConfigError> {
    match file.map(Path::to_path_buf).or_else(|| discover(dir)) {
        Some(path) => load_from_path(&path),
        None => Ok(Launcher::default()),
    }
}

/// Load a launcher configuration from a file path.
///
/// A relative `workdir` is resolved against the directory of the file.
///
/// # Errors
///
/// Returns a `ConfigError` if the configuration file cannot be read or parsed.
pub fn load_from_path(path: &Path) -> Result<Launcher, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let mut launcher = parse_auto(&text, path)?;

    if launcher.workdir.is_relative() {
        if let Some(parent) = path.parent() {
            launcher.workdir = parent.join(&launcher.workdir);
        }
    }

    Ok(launcher)
}

/// Parse a launcher configuration from a string.
///
/// # Errors
///
/// Returns a `ConfigError` if the configuration string cannot be parsed.
pub fn parse_auto(text: &str, path: &Path) -> Result<Launcher, ConfigError> {
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    match ext {
        #[cfg(feature = "toml")]
        "toml" => parse_toml(text),
        _ => Err(ConfigError::Validation("unknown config extension".into())),
    }
}

/// Parse a launcher configuration from a TOML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the configuration string cannot be parsed.
#[cfg(feature = "toml")]
pub fn parse_toml(config: &str) -> Result<Launcher, ConfigError> {
    let raw = toml::from_str::<raw::RawLauncher>(config)?;
    raw.try_into()
}
