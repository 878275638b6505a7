use std::process::ExitCode;

use authme_client_cli::args::Cli;
use clap::Parser;

fn main() -> ExitCode {
  let cfg = authme_core::config::load().unwrap_or_default();
  authme_core::logging::init(cfg.log_path.as_deref(), cfg.log_level);

  authme_client_cli::run(Cli::parse())
}
