use authme_client_cli::args::{Cli, Mode};
use clap::Parser;

#[test]
fn parses_register_mode() {
  let cli = Cli::try_parse_from(["authme-client", "register", "alice", "hunter2"]).unwrap();
  match cli.mode {
    Mode::Register(creds) => {
      assert_eq!(creds.username, "alice");
      assert_eq!(creds.password, "hunter2");
    }
    Mode::Login(_) => panic!("expected register mode"),
  }
}

#[test]
fn parses_login_mode() {
  let cli = Cli::try_parse_from(["authme-client", "login", "alice", "hunter2"]).unwrap();
  assert!(matches!(cli.mode, Mode::Login(_)));
}

#[test]
fn rejects_missing_password() {
  assert!(Cli::try_parse_from(["authme-client", "register", "alice"]).is_err());
}

#[test]
fn rejects_unknown_mode() {
  assert!(Cli::try_parse_from(["authme-client", "delete", "alice", "pw"]).is_err());
}
