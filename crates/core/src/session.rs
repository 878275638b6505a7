//! In-memory table of live `(username, session_id)` pairs. Append-only
//! during a session's life, non-persistent across server restarts.

/// Live login records. Linear search is fine at this scale: the reference
/// never sees more than a handful of concurrent sessions, and the
/// semaphore protocol already serializes every server-side mutation.
#[derive(Debug, Default)]
pub struct SessionTable {
  sessions: Vec<(String, String)>,
}

impl SessionTable {
  pub fn new() -> Self {
    Self::default()
  }

  /// Whether `(username, session_id)` is a live session.
  pub fn contains(&self, username: &str, session_id: &str) -> bool {
    self
      .sessions
      .iter()
      .any(|(u, s)| u == username && s == session_id)
  }

  /// Record a new live session. A username may hold multiple concurrent
  /// sessions; nothing here enforces single-session login (design note:
  /// the reference doesn't either).
  pub fn insert(&mut self, username: impl Into<String>, session_id: impl Into<String>) {
    self.sessions.push((username.into(), session_id.into()));
  }

  /// Remove the `(username, session_id)` pair if present. Returns `true`
  /// if a record was removed.
  pub fn remove(&mut self, username: &str, session_id: &str) -> bool {
    let before = self.sessions.len();
    self.sessions.retain(|(u, s)| !(u == username && s == session_id));
    self.sessions.len() != before
  }

  pub fn len(&self) -> usize {
    self.sessions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.sessions.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn insert_then_contains() {
    let mut table = SessionTable::new();
    table.insert("alice", "s".repeat(32));
    assert!(table.contains("alice", &"s".repeat(32)));
    assert!(!table.contains("bob", &"s".repeat(32)));
  }

  #[test]
  fn remove_reports_whether_it_found_a_match() {
    let mut table = SessionTable::new();
    table.insert("alice", "sid1");
    assert!(table.remove("alice", "sid1"));
    assert!(!table.remove("alice", "sid1"));
    assert!(table.is_empty());
  }

  #[test]
  fn same_user_can_hold_multiple_sessions() {
    let mut table = SessionTable::new();
    table.insert("alice", "sid1");
    table.insert("alice", "sid2");
    assert_eq!(table.len(), 2);
    assert!(table.remove("alice", "sid1"));
    assert!(table.contains("alice", "sid2"));
  }
}
