use assert_cmd::prelude::*;
use std::process::Command;

#[test]
fn help_exits_successfully() {
  let mut cmd = Command::cargo_bin("authme-client").expect("compile bin");
  let assert = cmd.arg("--help").assert();
  assert.success();
}

#[test]
fn missing_subcommand_fails() {
  let mut cmd = Command::cargo_bin("authme-client").expect("compile bin");
  let assert = cmd.assert();
  assert.failure();
}
