use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::OnceLock;

use crate::config::LogLevel;
use tracing::{info, subscriber::set_global_default};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

static WORKER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize structured JSON logging. With `log_path` set, logs go to that
/// file (non-blocking, append mode, created if missing). With `None`,
/// logging is installed with the given filter but writes nowhere -- used by
/// `LogLevel::Off` and by tests that don't want file I/O.
pub fn init(log_path: Option<&Path>, level: LogLevel) {
  let filter = EnvFilter::new(match level {
    LogLevel::Off => "off",
    LogLevel::Warn => "warn",
    LogLevel::Info => "info",
    LogLevel::Debug => "debug",
    LogLevel::Trace => "trace",
  });

  let Some(log_path) = log_path else {
    let subscriber = Registry::default().with(filter);
    let _ = set_global_default(subscriber);
    return;
  };

  if let Some(parent) = log_path.parent() {
    let _ = fs::create_dir_all(parent);
  }

  let file = match OpenOptions::new().create(true).append(true).open(log_path) {
    Ok(f) => f,
    Err(_) => {
      let subscriber = Registry::default().with(filter);
      let _ = set_global_default(subscriber);
      return;
    }
  };

  let (nb_writer, guard) = tracing_appender::non_blocking(file);
  let _ = WORKER_GUARD.set(guard);

  let json_layer = fmt::layer()
    .with_timer(ChronoUtc::rfc_3339())
    .json()
    .with_current_span(true)
    .with_span_list(true)
    .with_level(true)
    .with_target(false)
    .with_thread_ids(false)
    .with_thread_names(false)
    .with_writer(move || nb_writer.clone());

  let subscriber = Registry::default().with(filter).with(json_layer);
  let _ = set_global_default(subscriber);

  info!(
    event = "logging_initialized",
    log_path = %log_path.display(),
    level = ?level,
    "logging initialized"
  );
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::{fs, thread, time::Duration};
  use tracing::info;

  #[test]
  fn writes_json_logs() {
    let td = tempfile::tempdir().unwrap();
    let log = td.path().join("logs.jsonl");

    init(Some(&log), LogLevel::Info);
    info!(answer = 42, "hello world");

    thread::sleep(Duration::from_millis(50));

    let s = fs::read_to_string(&log).expect("read logs");
    assert!(s.lines().count() >= 1, "no log lines written");
  }
}
