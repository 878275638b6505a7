mod load;
mod paths;
mod types;

pub use load::load;
pub use paths::default_log_path;
pub use types::{Config, ConfigError, LogLevel, Result};

#[cfg(test)]
pub(crate) use load::load_from_path_for_test;
