use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::paths::{default_log_path, global_config_path};
use super::types::{Config, LogLevel, Result};

/// Load configuration by merging the global config file (if present) over
/// built-in defaults. There is no per-project config: the two binaries
/// this crate serves (`authme-server`, `authme-client`) have no notion of
/// a project directory.
pub fn load() -> Result<Config> {
  let mut cfg = Config {
    log_path: default_log_path(),
    ..Config::default()
  };

  if let Some(path) = global_config_path() {
    cfg = load_from_path(&path, cfg)?;
  }

  Ok(cfg)
}

fn load_from_path(path: &Path, base: Config) -> Result<Config> {
  let Ok(s) = fs::read_to_string(path) else {
    return Ok(base);
  };
  let partial: PartialConfig = toml::from_str(&s)?;
  Ok(partial.merge_over(base))
}

#[cfg(test)]
pub(crate) fn load_from_path_for_test(path: &Path) -> Result<Config> {
  load_from_path(
    path,
    Config {
      log_path: default_log_path(),
      ..Config::default()
    },
  )
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
  log_level: Option<LogLevel>,
  log_path: Option<String>,
}

impl PartialConfig {
  fn merge_over(self, base: Config) -> Config {
    Config {
      log_level: self.log_level.unwrap_or(base.log_level),
      log_path: self.log_path.map(Into::into).or(base.log_path),
    }
  }
}
