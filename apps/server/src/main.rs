use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use authme_core::database::Database;
use authme_core::ipc::{Channel, ChannelNames, ServerCleanup};
use authme_core::server::{self, ServerState};
use clap::Parser;
use tracing::{error, info};

/// `authme-server [-l <database_path>]`. Without `-l`, the database is
/// memory-only: no load, no save.
#[derive(Debug, Parser)]
#[command(version, about = "authme server", bin_name = "authme-server")]
struct Args {
  #[arg(short = 'l', long = "load")]
  database_path: Option<PathBuf>,
}

fn main() -> ExitCode {
  let args = Args::parse();

  let cfg = authme_core::config::load().unwrap_or_default();
  authme_core::logging::init(cfg.log_path.as_deref(), cfg.log_level);
  authme_core::signal::install();

  let (database, save_path) = match &args.database_path {
    Some(path) => match Database::load(path) {
      Ok((db, true)) => (db, Some(path.clone())),
      Ok((db, false)) => {
        error!(event = "database_load_incomplete", path = %path.display());
        eprintln!("database at {} has an invalid line; loaded records up to that point, but will not save back to it", path.display());
        (db, None)
      }
      Err(err) => {
        error!(event = "database_load_failed", path = %path.display(), error = %err);
        eprintln!("failed reading database: {err}");
        return ExitCode::FAILURE;
      }
    },
    None => (Database::new(), None),
  };

  let names = ChannelNames::production();
  let channel = match Channel::create(&names) {
    Ok(channel) => Arc::new(channel),
    Err(err) => {
      error!(event = "channel_setup_failed", error = %err);
      eprintln!("failed setting up shared resources: {err}");
      return ExitCode::FAILURE;
    }
  };

  let _cleanup = ServerCleanup::new(channel.clone(), names);
  let mut state = ServerState::new(channel, database, save_path);

  info!(event = "server_started");
  if let Err(err) = server::run(&mut state) {
    error!(event = "server_loop_failed", error = %err);
  }
  info!(event = "server_shutting_down");

  if let Err(err) = state.save() {
    eprintln!("could not save the database: {err}");
  }

  ExitCode::SUCCESS
}
