use assert_cmd::prelude::*;
use std::process::Command;

#[test]
fn help_exits_successfully() {
  let mut cmd = Command::cargo_bin("authme-server").expect("compile bin");
  let assert = cmd.arg("--help").assert();
  assert.success();
}

#[test]
fn rejects_unknown_flag() {
  let mut cmd = Command::cargo_bin("authme-server").expect("compile bin");
  let assert = cmd.arg("--bogus").assert();
  assert.failure();
}
