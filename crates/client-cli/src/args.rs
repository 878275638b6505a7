use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(version, about = "authme client", long_about = None, bin_name = "authme-client")]
pub struct Cli {
  #[command(subcommand)]
  pub mode: Mode,
}

#[derive(Debug, Subcommand)]
pub enum Mode {
  /// Register a new username/password with the server
  Register(Credentials),
  /// Log in, then enter the instruction loop
  Login(Credentials),
}

#[derive(Debug, ClapArgs)]
pub struct Credentials {
  pub username: String,
  pub password: String,
}
