use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Log level for the server and client binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
  Off,
  Warn,
  #[default]
  Info,
  Debug,
  Trace,
}

/// Purely ambient configuration: logging knobs only. Nothing here gates
/// protocol behavior -- spec.md rules out environment-variable-driven
/// protocol decisions, not observability settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
  pub log_level: LogLevel,
  /// Where to write JSON-lines logs. `None` disables file logging.
  pub log_path: Option<PathBuf>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      log_level: LogLevel::Info,
      log_path: None,
    }
  }
}

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("io: {0}")]
  Io(#[from] std::io::Error),
  #[error("toml: {0}")]
  Toml(#[from] toml::de::Error),
  #[error("unsupported platform: no config directory available")]
  UnsupportedPlatform,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
