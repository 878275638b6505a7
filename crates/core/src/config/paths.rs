use std::path::PathBuf;

/// Location of the global config file (~/.config/authme/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
  dirs::config_dir().map(|p| p.join("authme").join("config.toml"))
}

/// Default location for JSON-lines logs (~/.local/state/authme/logs.jsonl,
/// falling back to the data dir on platforms without a state dir).
pub fn default_log_path() -> Option<PathBuf> {
  dirs::state_dir()
    .or_else(dirs::data_dir)
    .map(|p| p.join("authme").join("logs.jsonl"))
}
