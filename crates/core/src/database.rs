//! The in-memory user database and its `username;password;secret` text
//! file codec.

use std::fs;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
  #[error("io: {0}")]
  Io(#[from] std::io::Error),
  #[error("username already registered")]
  UsernameTaken,
  #[error("invalid field: must be non-empty and free of ';' and '\\n'")]
  InvalidField,
  #[error("no user named {0:?}")]
  NoSuchUser(String),
}

type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
  pub username: String,
  pub password: String,
  pub secret: String,
}

/// Strip leading/trailing whitespace, the way the reference's
/// `str_strip` does (it doesn't use `str::trim` -- but the observable
/// result for ASCII whitespace is the same).
pub fn strip(s: &str) -> String {
  s.trim().to_owned()
}

/// A field is valid if it is free of the database-file delimiters
/// (`;`, `\n`); emptiness is allowed only where the caller says so
/// (secrets may be empty, usernames/passwords may not).
pub fn validate_field(s: &str, allow_empty: bool) -> bool {
  if s.is_empty() {
    return allow_empty;
  }
  !s.contains('\n') && !s.contains(';')
}

/// The in-memory, ordered set of user records, with an optional backing
/// file.
#[derive(Debug, Default)]
pub struct Database {
  records: Vec<UserRecord>,
}

impl Database {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn exists(&self, username: &str) -> bool {
    self.records.iter().any(|r| r.username == username)
  }

  /// Register a new user. Strips whitespace from both fields, rejects
  /// duplicates and invalid fields, and appends a record with an empty
  /// secret.
  pub fn register(&mut self, username: &str, password: &str) -> Result<()> {
    if self.exists(username) {
      return Err(DatabaseError::UsernameTaken);
    }

    let username = strip(username);
    let password = strip(password);

    if !validate_field(&username, false) || !validate_field(&password, false) {
      return Err(DatabaseError::InvalidField);
    }

    self.records.push(UserRecord { username, password, secret: String::new() });
    Ok(())
  }

  /// Whether `(username, password)` names an existing record. Compares
  /// the full strings -- not a fixed-width prefix -- in both this and
  /// `register`'s duplicate check, resolving the credential-comparison
  /// asymmetry of the reference implementation.
  pub fn verify_credentials(&self, username: &str, password: &str) -> bool {
    self.records.iter().any(|r| r.username == username && r.password == password)
  }

  /// Read a user's stored secret. `None` if the user doesn't exist.
  pub fn read_secret(&self, username: &str) -> Option<&str> {
    self.records.iter().find(|r| r.username == username).map(|r| r.secret.as_str())
  }

  /// Overwrite a user's secret. Strips whitespace, rejects `;`/`\n`
  /// (empty secrets are allowed -- an empty secret means "unset").
  pub fn write_secret(&mut self, username: &str, secret: &str) -> Result<()> {
    let secret = strip(secret);
    if !validate_field(&secret, true) {
      return Err(DatabaseError::InvalidField);
    }
    let record = self
      .records
      .iter_mut()
      .find(|r| r.username == username)
      .ok_or_else(|| DatabaseError::NoSuchUser(username.to_owned()))?;
    record.secret = secret;
    Ok(())
  }

  /// Load a database from its text-file codec: one record per line,
  /// `username;password;secret\n`. Halts on the first line whose username
  /// or password fails validation, retaining every record parsed before
  /// it. The returned `bool` is `true` when every line parsed cleanly and
  /// `false` when loading halted early -- the caller must treat `false`
  /// as "do not save this database back to `path`", since doing so would
  /// silently truncate the corrupt-on-disk file.
  pub fn load(path: &Path) -> Result<(Self, bool)> {
    let contents = fs::read_to_string(path)?;
    let mut db = Self::new();
    let mut complete = true;

    for line in contents.lines() {
      let mut fields = line.splitn(3, ';');
      let username = fields.next().unwrap_or_default();
      let password = fields.next().unwrap_or_default();
      let secret = fields.next().unwrap_or_default();

      if !validate_field(username, false) || !validate_field(password, false) {
        complete = false;
        break;
      }

      db.records.push(UserRecord {
        username: username.to_owned(),
        password: password.to_owned(),
        secret: secret.to_owned(),
      });
    }

    Ok((db, complete))
  }

  /// Rewrite every record to `path`, in insertion order, one
  /// `username;password;secret` line per record.
  pub fn save(&self, path: &Path) -> Result<()> {
    let mut contents = String::new();
    for record in &self.records {
      contents.push_str(&record.username);
      contents.push(';');
      contents.push_str(&record.password);
      contents.push(';');
      contents.push_str(&record.secret);
      contents.push('\n');
    }
    fs::write(path, contents)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn register_then_verify() {
    let mut db = Database::new();
    db.register("alice", "hunter2").unwrap();
    assert!(db.verify_credentials("alice", "hunter2"));
    assert!(!db.verify_credentials("alice", "wrong"));
  }

  #[test]
  fn duplicate_registration_is_rejected() {
    let mut db = Database::new();
    db.register("alice", "hunter2").unwrap();
    let err = db.register("alice", "other").unwrap_err();
    assert!(matches!(err, DatabaseError::UsernameTaken));
  }

  #[test]
  fn registration_rejects_delimiter_characters() {
    let mut db = Database::new();
    let err = db.register("bob;evil", "pw").unwrap_err();
    assert!(matches!(err, DatabaseError::InvalidField));
  }

  #[test]
  fn write_then_read_secret() {
    let mut db = Database::new();
    db.register("alice", "hunter2").unwrap();
    db.write_secret("alice", "  hunter2-secret  ").unwrap();
    assert_eq!(db.read_secret("alice"), Some("hunter2-secret"));
  }

  #[test]
  fn write_secret_rejects_unknown_user() {
    let mut db = Database::new();
    let err = db.write_secret("ghost", "s").unwrap_err();
    assert!(matches!(err, DatabaseError::NoSuchUser(_)));
  }

  #[test]
  fn credential_comparison_is_full_string_both_ways() {
    // A 40-byte username differing only after byte 32 must not collide
    // with a 32-byte prefix at either registration or verification --
    // the REDESIGN-flagged asymmetry in the reference is resolved by
    // comparing whole strings everywhere.
    let long_name = "a".repeat(40);
    let mut db = Database::new();
    db.register(&long_name, "pw").unwrap();
    assert!(db.verify_credentials(&long_name, "pw"));
    assert!(!db.verify_credentials(&long_name[..32], "pw"));
  }

  #[test]
  fn save_then_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.txt");

    let mut db = Database::new();
    db.register("alice", "pw1").unwrap();
    db.write_secret("alice", "hunter2").unwrap();
    db.register("bob", "pw2").unwrap();
    db.save(&path).unwrap();

    let (loaded, complete) = Database::load(&path).unwrap();
    assert!(complete);
    assert_eq!(loaded.records, db.records);
  }

  #[test]
  fn load_halts_on_invalid_line_but_keeps_prior_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.txt");
    fs::write(&path, "alice;pw1;secret1\n;badpw;secret2\nbob;pw2;\n").unwrap();

    let (loaded, complete) = Database::load(&path).unwrap();
    assert!(!complete);
    assert_eq!(loaded.records.len(), 1);
    assert_eq!(loaded.records[0].username, "alice");
  }
}
