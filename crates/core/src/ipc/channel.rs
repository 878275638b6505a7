use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use crate::protocol::{PacketType, ProtocolError, Request, Response, SEM_CLIENT_EXCL, SEM_WAKE_CLIENT, SEM_WAKE_SERVER, SHM_NAME, ServerStatus};

use super::semaphore::{NamedSemaphore, SemError};
use super::shmem::{SharedFrame, ShmemError};

#[derive(Debug, Error)]
pub enum ChannelError {
  #[error("server is not available")]
  ServerUnavailable,
  #[error(transparent)]
  Sem(#[from] SemError),
  #[error(transparent)]
  Shmem(#[from] ShmemError),
  #[error(transparent)]
  Protocol(#[from] ProtocolError),
}

type Result<T> = std::result::Result<T, ChannelError>;

/// Outcome of one call to `Channel::server_serve_one`.
pub enum ServeOutcome {
  /// A request was dispatched and replied to.
  Served,
  /// `IDLE`'s wait on S1 was interrupted by a signal; the caller should
  /// stop serving and run cleanup.
  ShutdownRequested,
}

/// The four named resources (shared frame plus the three semaphores) as a
/// set, so tests can construct an isolated, process-unique set instead of
/// colliding with a real server.
#[derive(Debug, Clone)]
pub struct ChannelNames {
  pub shm_name: String,
  pub sem_wake_server: String,
  pub sem_wake_client: String,
  pub sem_client_excl: String,
}

impl ChannelNames {
  pub fn production() -> Self {
    Self {
      shm_name: SHM_NAME.to_owned(),
      sem_wake_server: SEM_WAKE_SERVER.to_owned(),
      sem_wake_client: SEM_WAKE_CLIENT.to_owned(),
      sem_client_excl: SEM_CLIENT_EXCL.to_owned(),
    }
  }

  /// A name set unique to this process, for test isolation.
  pub fn unique_for_test(tag: &str) -> Self {
    let pid = std::process::id();
    Self {
      shm_name: format!("/authme_test_{tag}_{pid}_shm"),
      sem_wake_server: format!("/authme_test_{tag}_{pid}_s1"),
      sem_wake_client: format!("/authme_test_{tag}_{pid}_s2"),
      sem_client_excl: format!("/authme_test_{tag}_{pid}_s3"),
    }
  }
}

/// Bundles the shared frame and the three semaphores that implement the
/// handoff protocol. Built once by `main` (server or client) and passed
/// down explicitly to the dispatcher or the client driver -- no global
/// mutable state backs the protocol.
pub struct Channel {
  frame: Mutex<SharedFrame>,
  wake_server: NamedSemaphore,
  wake_client: NamedSemaphore,
  client_excl: NamedSemaphore,
}

impl Channel {
  /// Owner path: create the shared memory object and all three
  /// semaphores with their protocol-mandated initial values `(0, 1, 1)`.
  pub fn create(names: &ChannelNames) -> Result<Self> {
    let frame = SharedFrame::create(&names.shm_name)?;
    let wake_server = NamedSemaphore::create(&names.sem_wake_server, 0)?;
    let wake_client = NamedSemaphore::create(&names.sem_wake_client, 1)?;
    let client_excl = NamedSemaphore::create(&names.sem_client_excl, 1)?;
    Ok(Self {
      frame: Mutex::new(frame),
      wake_server,
      wake_client,
      client_excl,
    })
  }

  /// Non-owner path: open the already-existing shared memory object and
  /// semaphores.
  pub fn open(names: &ChannelNames) -> Result<Self> {
    let frame = SharedFrame::open(&names.shm_name)?;
    let wake_server = NamedSemaphore::open(&names.sem_wake_server)?;
    let wake_client = NamedSemaphore::open(&names.sem_wake_client)?;
    let client_excl = NamedSemaphore::open(&names.sem_client_excl)?;
    Ok(Self {
      frame: Mutex::new(frame),
      wake_server,
      wake_client,
      client_excl,
    })
  }

  fn check_online(&self) -> Result<()> {
    let frame = self.frame.lock().unwrap();
    if frame.frame().server_status()? == ServerStatus::Offline {
      return Err(ChannelError::ServerUnavailable);
    }
    Ok(())
  }

  /// Run one client request through ENTER -> ACQUIRE -> WRITE -> HANDOFF
  /// -> READ -> RELEASE. Every blocking wait is preceded by a
  /// `server_status` check; observing `Offline` aborts immediately with
  /// `ChannelError::ServerUnavailable`.
  pub fn client_request(&self, request: &Request) -> Result<Response> {
    self.check_online()?;
    self.client_excl.wait()?; // ENTER
    let result = self.client_request_body(request);
    let _ = self.client_excl.post(); // RELEASE (S3), always
    result
  }

  fn client_request_body(&self, request: &Request) -> Result<Response> {
    self.check_online()?;
    self.wake_client.wait()?; // ACQUIRE

    {
      let mut frame = self.frame.lock().unwrap();
      frame.frame_mut().encode_request(request); // WRITE
    }

    self.check_online()?;
    self.wake_server.post()?; // HANDOFF (post S1)
    self.check_online()?;
    self.wake_client.wait()?; // HANDOFF (wait S2)

    let response = {
      let frame = self.frame.lock().unwrap();
      frame.frame().decode_response(request)? // READ
    };

    self.wake_server.post()?; // RELEASE (S1)
    Ok(response)
  }

  /// Run one server dispatch cycle through IDLE -> DISPATCH -> REPLY ->
  /// DRAIN -> SCRUB. `handler` classifies the decoded request and
  /// produces the reply; it never sees raw frame bytes.
  pub fn server_serve_one<F>(&self, handler: F) -> Result<ServeOutcome>
  where
    F: FnOnce(Request) -> Response,
  {
    match self.wake_server.wait() {
      // IDLE
      Ok(()) => {}
      Err(SemError::Interrupted) => return Ok(ServeOutcome::ShutdownRequested),
      Err(err) => return Err(err.into()),
    }

    let request = {
      let frame = self.frame.lock().unwrap();
      frame.frame().decode_request()? // DISPATCH (read)
    };
    debug!(event = "packet_dispatched", packet_type = ?Self::packet_type_of(&request));
    let response = handler(request); // DISPATCH (process)

    {
      let mut frame = self.frame.lock().unwrap();
      frame.frame_mut().encode_response(&response);
    }
    self.wake_client.post()?; // REPLY

    // DRAIN. Unlike IDLE's wait on S1, a signal here is not treated as an
    // orderly-shutdown path -- the client has already been handed a reply
    // and is expected to release promptly.
    self.wake_server.wait()?;

    {
      let mut frame = self.frame.lock().unwrap();
      frame.frame_mut().scrub(); // SCRUB
    }

    // Re-arm S2 for the next client's ACQUIRE. `client_request_body` waits
    // on S2 twice per request (ACQUIRE, then HANDOFF) but only one of
    // those waits is balanced by REPLY's post above; without this second
    // post S2's value drifts to -1 after every request and the next
    // ACQUIRE blocks forever.
    self.wake_client.post()?;

    Ok(ServeOutcome::Served)
  }

  /// Pre-flight classification of a decoded request's packet type, used
  /// by callers that want to log before dispatch without re-matching the
  /// full `Request` enum.
  pub fn packet_type_of(request: &Request) -> PacketType {
    match request {
      Request::Registration { .. } => PacketType::Registration,
      Request::Login { .. } => PacketType::Login,
      Request::Logout { .. } => PacketType::Logout,
      Request::SecretWrite { .. } => PacketType::SecretWrite,
      Request::SecretRead { .. } => PacketType::SecretRead,
    }
  }
}

/// Releases every named resource on drop: sets `server_status = Offline`,
/// settles S3 so any blocked client wakes and observes it, then unlinks
/// the semaphores and the shared-memory object. Constructed once by the
/// server's `main` and held for the remainder of the process so this runs
/// on every exit path (idiomatic replacement for the reference's
/// `atexit()` registration).
///
/// Holds an owned `Arc<Channel>` rather than a borrow: `ServerState` also
/// holds its own clone of the same `Arc`, and `server::run` needs to
/// mutably borrow the rest of `ServerState` while this guard is alive --
/// a borrowed `&Channel` here would conflict with that.
pub struct ServerCleanup {
  channel: std::sync::Arc<Channel>,
  names: ChannelNames,
}

impl ServerCleanup {
  pub fn new(channel: std::sync::Arc<Channel>, names: ChannelNames) -> Self {
    Self { channel, names }
  }
}

impl Drop for ServerCleanup {
  fn drop(&mut self) {
    {
      let mut frame = self.channel.frame.lock().unwrap();
      frame.frame_mut().set_server_status(ServerStatus::Offline);
    }
    let _ = self.channel.client_excl.settle();
    let _ = NamedSemaphore::unlink(&self.names.sem_wake_server);
    let _ = NamedSemaphore::unlink(&self.names.sem_wake_client);
    let _ = NamedSemaphore::unlink(&self.names.sem_client_excl);
    let _ = SharedFrame::unlink(&self.names.shm_name);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::protocol::RequestStatus;

  #[test]
  fn client_and_server_round_trip_one_request() {
    let names = ChannelNames::unique_for_test("channel_basic");
    let server = std::sync::Arc::new(Channel::create(&names).unwrap());
    let _cleanup = ServerCleanup::new(server.clone(), names.clone());
    let client = Channel::open(&names).unwrap();

    let server_for_thread = server.clone();
    let server_thread = std::thread::spawn(move || {
      server_for_thread
        .server_serve_one(|req| match req {
          Request::Registration { username, .. } => {
            assert_eq!(username, "alice");
            Response::Registration { status: RequestStatus::Success }
          }
          _ => panic!("unexpected request"),
        })
        .unwrap();
    });

    let response = client
      .client_request(&Request::Registration { username: "alice".into(), password: "pw".into() })
      .unwrap();
    assert_eq!(response, Response::Registration { status: RequestStatus::Success });

    server_thread.join().unwrap();
  }

  #[test]
  fn client_and_server_handle_two_requests_in_sequence() {
    // Regression test for S2 drifting negative after one request: a
    // second ACQUIRE must not block forever.
    let names = ChannelNames::unique_for_test("channel_two_requests");
    let server = std::sync::Arc::new(Channel::create(&names).unwrap());
    let _cleanup = ServerCleanup::new(server.clone(), names.clone());
    let client = Channel::open(&names).unwrap();

    let server_for_thread = server.clone();
    let server_thread = std::thread::spawn(move || {
      for _ in 0..2 {
        server_for_thread
          .server_serve_one(|req| match req {
            Request::Registration { .. } => Response::Registration { status: RequestStatus::Success },
            Request::Login { username, .. } => {
              Response::Login { status: RequestStatus::Success, session_id: username }
            }
            _ => panic!("unexpected request"),
          })
          .unwrap();
      }
    });

    let first = client
      .client_request(&Request::Registration { username: "alice".into(), password: "pw".into() })
      .unwrap();
    assert_eq!(first, Response::Registration { status: RequestStatus::Success });

    let second = client
      .client_request(&Request::Login { username: "alice".into(), password: "pw".into() })
      .unwrap();
    assert_eq!(second, Response::Login { status: RequestStatus::Success, session_id: "alice".into() });

    server_thread.join().unwrap();
  }

  #[test]
  fn client_sees_offline_before_blocking() {
    let names = ChannelNames::unique_for_test("channel_offline");
    let server = std::sync::Arc::new(Channel::create(&names).unwrap());
    let _cleanup = ServerCleanup::new(server.clone(), names.clone());
    {
      let mut frame = server.frame.lock().unwrap();
      frame.frame_mut().set_server_status(ServerStatus::Offline);
    }

    let client = Channel::open(&names).unwrap();
    let err = client
      .client_request(&Request::Login { username: "alice".into(), password: "pw".into() })
      .unwrap_err();
    assert!(matches!(err, ChannelError::ServerUnavailable));
  }
}
