use std::io::{self, Write};

use authme_core::ipc::{Channel, ChannelError};
use authme_core::protocol::{Request, RequestStatus, Response};
use thiserror::Error;
use tracing::{info, warn};

use crate::args::Credentials;

#[derive(Debug, Error)]
pub enum ClientError {
  #[error(transparent)]
  Channel(#[from] ChannelError),
  #[error("registration failed")]
  RegistrationFailed,
  #[error("login failed")]
  LoginFailed,
}

type Result<T> = std::result::Result<T, ClientError>;

/// Per spec: whenever `ServerUnavailable` is observed -- before or during
/// a wait, at connect time or mid-session -- print exactly this message.
/// Other channel errors get a generic message; neither is silent.
fn print_channel_error(err: &ChannelError) {
  match err {
    ChannelError::ServerUnavailable => eprintln!("server is not available"),
    other => eprintln!("communication with the server failed: {other}"),
  }
}

/// A single REGISTRATION round trip.
pub fn register(channel: &Channel, creds: &Credentials) -> Result<()> {
  let response = channel
    .client_request(&Request::Registration {
      username: creds.username.clone(),
      password: creds.password.clone(),
    })
    .inspect_err(print_channel_error)?;

  match response {
    Response::Registration { status: RequestStatus::Success } => {
      println!("Registration successful.");
      Ok(())
    }
    _ => {
      eprintln!("Registration failed.");
      Err(ClientError::RegistrationFailed)
    }
  }
}

/// A single LOGIN round trip, returning the session id on success.
pub fn login(channel: &Channel, creds: &Credentials) -> Result<String> {
  let response = channel
    .client_request(&Request::Login {
      username: creds.username.clone(),
      password: creds.password.clone(),
    })
    .inspect_err(print_channel_error)?;

  match response {
    Response::Login { status: RequestStatus::Success, session_id } => {
      eprintln!("Login successful.");
      Ok(session_id)
    }
    _ => {
      eprintln!("Login failed.");
      Err(ClientError::LoginFailed)
    }
  }
}

/// Post-login instruction loop: `1` write secret, `2` read secret, `3`
/// logout. Reprompts on out-of-range input. Breaks without sending
/// LOGOUT if a shutdown signal arrives, or on EOF. Returns `false` the
/// moment the server is observed offline, so the caller can exit
/// non-zero instead of reprompting forever against a dead server.
pub fn instruction_loop(channel: &Channel, username: &str, session_id: &str) -> bool {
  loop {
    match next_instruction() {
      Some(1) => {
        if !handle_secret_write(channel, username, session_id) {
          return false;
        }
      }
      Some(2) => {
        if !handle_secret_read(channel, username, session_id) {
          return false;
        }
      }
      Some(3) => return handle_logout(channel, username, session_id),
      _ => return true,
    }
  }
}

fn print_menu() {
  println!("Commands:");
  println!("  1) write secret");
  println!("  2) read secret");
  println!("  3) logout");
  print!("Please select a command (1-3): ");
  let _ = io::stdout().flush();
}

/// Prompt until a valid `1..=3` choice arrives, or `None` on signal
/// shutdown / EOF.
fn next_instruction() -> Option<u8> {
  loop {
    if !authme_core::signal::is_running() {
      return None;
    }

    print_menu();

    let mut line = String::new();
    if io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
      return None;
    }

    match line.trim().parse::<u8>() {
      Ok(n) if (1..=3).contains(&n) => return Some(n),
      _ => continue,
    }
  }
}

/// Runs a secret-write exchange. Returns `false` only when the server was
/// observed offline; any other outcome (success, logical failure, a
/// non-fatal channel error) returns `true` so the menu keeps prompting.
fn handle_secret_write(channel: &Channel, username: &str, session_id: &str) -> bool {
  print!("New secret: ");
  let _ = io::stdout().flush();

  let mut secret = String::new();
  if io::stdin().read_line(&mut secret).is_err() {
    eprintln!("Could not read your input.");
    return true;
  }
  let secret = secret.trim_end_matches('\n').to_owned();

  let result = channel.client_request(&Request::SecretWrite {
    session_id: session_id.to_owned(),
    username: username.to_owned(),
    secret,
  });

  match result {
    Ok(Response::SecretWrite { status: RequestStatus::Success }) => true,
    Ok(_) => {
      eprintln!("Could not write your new secret.");
      true
    }
    Err(ChannelError::ServerUnavailable) => {
      print_channel_error(&ChannelError::ServerUnavailable);
      false
    }
    Err(err) => {
      warn!(event = "secret_write_failed", error = %err);
      true
    }
  }
}

fn handle_secret_read(channel: &Channel, username: &str, session_id: &str) -> bool {
  let result = channel.client_request(&Request::SecretRead {
    session_id: session_id.to_owned(),
    username: username.to_owned(),
  });

  match result {
    Ok(Response::SecretRead { status: RequestStatus::Success, secret }) => {
      println!("Your secret: {secret}");
      true
    }
    Ok(_) => {
      eprintln!("Could not read the secret.");
      true
    }
    Err(ChannelError::ServerUnavailable) => {
      print_channel_error(&ChannelError::ServerUnavailable);
      false
    }
    Err(err) => {
      warn!(event = "secret_read_failed", error = %err);
      true
    }
  }
}

fn handle_logout(channel: &Channel, username: &str, session_id: &str) -> bool {
  let result = channel.client_request(&Request::Logout {
    session_id: session_id.to_owned(),
    username: username.to_owned(),
  });

  let stayed_online = match &result {
    Err(ChannelError::ServerUnavailable) => {
      print_channel_error(&ChannelError::ServerUnavailable);
      false
    }
    _ => true,
  };

  if !matches!(result, Ok(Response::Logout { status: RequestStatus::Success })) && stayed_online {
    eprintln!("Could not logout correctly.");
  }
  info!(event = "client_logout", %username);
  stayed_online
}
