//! Argument parsing and the register/login/instruction-loop driver for
//! the authme client binary.

pub mod args;
mod commands;

use std::process::ExitCode;

use authme_core::ipc::{Channel, ChannelNames};

pub use commands::ClientError;

/// Entry point called by the `authme-client` binary after config/logging
/// setup. Opens the channel to an already-running server, then runs the
/// selected mode to completion.
pub fn run(cli: args::Cli) -> ExitCode {
  authme_core::signal::install();

  let names = ChannelNames::production();
  let channel = match Channel::open(&names) {
    Ok(channel) => channel,
    Err(err) => {
      // Opening the channel fails when the named resources don't exist at
      // all (no server has ever started) -- a setup failure, not the
      // `ServerUnavailable` case `print_channel_error` handles, so this
      // keeps the underlying system error in the message.
      eprintln!("could not connect to the server: {err}");
      return ExitCode::FAILURE;
    }
  };

  match cli.mode {
    args::Mode::Register(creds) => match commands::register(&channel, &creds) {
      Ok(()) => ExitCode::SUCCESS,
      Err(_) => ExitCode::FAILURE,
    },
    args::Mode::Login(creds) => match commands::login(&channel, &creds) {
      Ok(session_id) => {
        if commands::instruction_loop(&channel, &creds.username, &session_id) {
          ExitCode::SUCCESS
        } else {
          ExitCode::FAILURE
        }
      }
      Err(_) => ExitCode::FAILURE,
    },
  }
}
