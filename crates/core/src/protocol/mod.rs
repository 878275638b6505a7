//! Wire protocol: the fixed-size shared-memory frame and the packet types
//! layered on top of it. Nothing in this module touches `mmap` or
//! semaphores directly -- see `crate::ipc` for that.

mod frame;

pub use frame::{Frame, ProtocolError, Request, Response};

/// Maximum length of a username, excluding the terminator.
pub const MAX_USERNAME_LEN: usize = 32;
/// Maximum length of a password, excluding the terminator.
pub const MAX_PASSWORD_LEN: usize = 32;
/// Maximum length of a secret, excluding the terminator.
pub const MAX_SECRET_LEN: usize = 128;
/// Fixed length of a session id, excluding the terminator.
pub const SESSION_ID_LEN: usize = 32;

/// Name of the shared-memory object backing the frame.
pub const SHM_NAME: &str = "authme_auth";
/// Semaphore posted by a client when a packet is ready for the server.
pub const SEM_WAKE_SERVER: &str = "authme_server1";
/// Semaphore posted by the server when a reply is ready for the client.
pub const SEM_WAKE_CLIENT: &str = "authme_server2";
/// Binary gate serializing concurrent clients.
pub const SEM_CLIENT_EXCL: &str = "authme_client1";

/// Current status of the server, as observed through the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServerStatus {
  Online = 0,
  Offline = 1,
}

impl TryFrom<u8> for ServerStatus {
  type Error = ProtocolError;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0 => Ok(Self::Online),
      1 => Ok(Self::Offline),
      other => Err(ProtocolError::UnknownServerStatus(other)),
    }
  }
}

/// Verdict of the most recently served request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestStatus {
  Success = 0,
  Error = 1,
}

impl TryFrom<u8> for RequestStatus {
  type Error = ProtocolError;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0 => Ok(Self::Success),
      1 => Ok(Self::Error),
      other => Err(ProtocolError::UnknownRequestStatus(other)),
    }
  }
}

/// Discriminant of the packet currently held in the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
  Registration = 0,
  Login = 1,
  Logout = 2,
  SecretWrite = 3,
  SecretRead = 4,
}

impl TryFrom<u8> for PacketType {
  type Error = ProtocolError;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0 => Ok(Self::Registration),
      1 => Ok(Self::Login),
      2 => Ok(Self::Logout),
      3 => Ok(Self::SecretWrite),
      4 => Ok(Self::SecretRead),
      other => Err(ProtocolError::UnknownPacketType(other)),
    }
  }
}
