use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use super::{
  MAX_PASSWORD_LEN, MAX_SECRET_LEN, MAX_USERNAME_LEN, PacketType, RequestStatus, SESSION_ID_LEN,
  ServerStatus,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
  #[error("unknown server status byte: {0}")]
  UnknownServerStatus(u8),
  #[error("unknown request status byte: {0}")]
  UnknownRequestStatus(u8),
  #[error("unknown packet type byte: {0}")]
  UnknownPacketType(u8),
}

/// The fixed-size shared-memory message slot. Every byte not explicitly
/// written is zero; unused fields for a given `packet_type` are left at
/// their zeroed default.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Frame {
  server_status: u8,
  request_status: u8,
  packet_type: u8,
  username: [u8; MAX_USERNAME_LEN + 1],
  password: [u8; MAX_PASSWORD_LEN + 1],
  session_id: [u8; SESSION_ID_LEN + 1],
  secret: [u8; MAX_SECRET_LEN + 1],
}

/// A decoded client request, built from a `Frame` snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
  Registration { username: String, password: String },
  Login { username: String, password: String },
  Logout { session_id: String, username: String },
  SecretWrite { session_id: String, username: String, secret: String },
  SecretRead { session_id: String, username: String },
}

/// A decoded server reply, ready to be written back into the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
  Registration { status: RequestStatus },
  Login { status: RequestStatus, session_id: String },
  Logout { status: RequestStatus },
  SecretWrite { status: RequestStatus },
  SecretRead { status: RequestStatus, secret: String },
}

/// Read a bounded string field. Never trusts the writer to have terminated
/// it: scans at most `N` bytes for a NUL, lossy-decoding whatever is found;
/// if no NUL appears within the slot, the whole slot is treated as data.
fn read_field<const N: usize>(buf: &[u8; N]) -> String {
  let len = buf.iter().position(|&b| b == 0).unwrap_or(N);
  String::from_utf8_lossy(&buf[..len]).into_owned()
}

/// Write a bounded string field: zero-fill first, copy at most `N - 1`
/// bytes of `s`, then force a terminator at index `N - 1` regardless of
/// whether `s` fit.
fn write_field<const N: usize>(buf: &mut [u8; N], s: &str) {
  buf.fill(0);
  let bytes = s.as_bytes();
  let cap = N - 1;
  let n = bytes.len().min(cap);
  buf[..n].copy_from_slice(&bytes[..n]);
  buf[cap] = 0;
}

impl Frame {
  /// A freshly-scrubbed frame: `server_status = Online`, every other byte
  /// zero.
  pub fn fresh() -> Self {
    let mut frame = Self::zeroed();
    frame.server_status = ServerStatus::Online as u8;
    frame
  }

  /// Zero the entire frame and restore `server_status = Online` (the SCRUB
  /// step of the server's per-request state machine).
  pub fn scrub(&mut self) {
    *self = Self::fresh();
  }

  pub fn server_status(&self) -> Result<ServerStatus, ProtocolError> {
    ServerStatus::try_from(self.server_status)
  }

  pub fn set_server_status(&mut self, status: ServerStatus) {
    self.server_status = status as u8;
  }

  pub fn request_status(&self) -> Result<RequestStatus, ProtocolError> {
    RequestStatus::try_from(self.request_status)
  }

  pub fn packet_type(&self) -> Result<PacketType, ProtocolError> {
    PacketType::try_from(self.packet_type)
  }

  /// Fill the frame with a client request, preserving `server_status`.
  pub fn encode_request(&mut self, request: &Request) {
    match request {
      Request::Registration { username, password } => {
        self.packet_type = PacketType::Registration as u8;
        write_field(&mut self.username, username);
        write_field(&mut self.password, password);
      }
      Request::Login { username, password } => {
        self.packet_type = PacketType::Login as u8;
        write_field(&mut self.username, username);
        write_field(&mut self.password, password);
      }
      Request::Logout { session_id, username } => {
        self.packet_type = PacketType::Logout as u8;
        write_field(&mut self.session_id, session_id);
        write_field(&mut self.username, username);
      }
      Request::SecretWrite { session_id, username, secret } => {
        self.packet_type = PacketType::SecretWrite as u8;
        write_field(&mut self.session_id, session_id);
        write_field(&mut self.username, username);
        write_field(&mut self.secret, secret);
      }
      Request::SecretRead { session_id, username } => {
        self.packet_type = PacketType::SecretRead as u8;
        write_field(&mut self.session_id, session_id);
        write_field(&mut self.username, username);
      }
    }
  }

  /// Decode the frame's current `packet_type` and fields into a `Request`.
  pub fn decode_request(&self) -> Result<Request, ProtocolError> {
    Ok(match self.packet_type()? {
      PacketType::Registration => Request::Registration {
        username: read_field(&self.username),
        password: read_field(&self.password),
      },
      PacketType::Login => Request::Login {
        username: read_field(&self.username),
        password: read_field(&self.password),
      },
      PacketType::Logout => Request::Logout {
        session_id: read_field(&self.session_id),
        username: read_field(&self.username),
      },
      PacketType::SecretWrite => Request::SecretWrite {
        session_id: read_field(&self.session_id),
        username: read_field(&self.username),
        secret: read_field(&self.secret),
      },
      PacketType::SecretRead => Request::SecretRead {
        session_id: read_field(&self.session_id),
        username: read_field(&self.username),
      },
    })
  }

  /// Write a server reply's verdict and fields, preserving `server_status`.
  pub fn encode_response(&mut self, response: &Response) {
    match response {
      Response::Registration { status } => {
        self.request_status = *status as u8;
      }
      Response::Login { status, session_id } => {
        self.request_status = *status as u8;
        write_field(&mut self.session_id, session_id);
      }
      Response::Logout { status } => {
        self.request_status = *status as u8;
      }
      Response::SecretWrite { status } => {
        self.request_status = *status as u8;
      }
      Response::SecretRead { status, secret } => {
        self.request_status = *status as u8;
        write_field(&mut self.secret, secret);
      }
    }
  }

  /// Decode the frame's reply fields for the given request's packet type.
  /// The caller (the channel) already knows which request it sent, so no
  /// re-dispatch on `packet_type` is required.
  pub fn decode_response(&self, for_request: &Request) -> Result<Response, ProtocolError> {
    let status = self.request_status()?;
    Ok(match for_request {
      Request::Registration { .. } => Response::Registration { status },
      Request::Login { .. } => Response::Login { status, session_id: read_field(&self.session_id) },
      Request::Logout { .. } => Response::Logout { status },
      Request::SecretWrite { .. } => Response::SecretWrite { status },
      Request::SecretRead { .. } => Response::SecretRead { status, secret: read_field(&self.secret) },
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fresh_frame_is_online_and_zeroed() {
    let frame = Frame::fresh();
    assert_eq!(frame.server_status().unwrap(), ServerStatus::Online);
    assert_eq!(frame.username, [0u8; MAX_USERNAME_LEN + 1]);
  }

  #[test]
  fn round_trips_registration() {
    let mut frame = Frame::fresh();
    let req = Request::Registration {
      username: "alice".into(),
      password: "hunter2".into(),
    };
    frame.encode_request(&req);
    assert_eq!(frame.decode_request().unwrap(), req);
  }

  #[test]
  fn round_trips_login_response() {
    let mut frame = Frame::fresh();
    let req = Request::Login { username: "alice".into(), password: "hunter2".into() };
    let resp = Response::Login {
      status: RequestStatus::Success,
      session_id: "a".repeat(SESSION_ID_LEN),
    };
    frame.encode_response(&resp);
    assert_eq!(frame.decode_response(&req).unwrap(), resp);
  }

  #[test]
  fn write_field_truncates_and_terminates() {
    let mut buf = [0xffu8; 5];
    write_field(&mut buf, "abcdefgh");
    assert_eq!(&buf, b"abcd\0");
  }

  #[test]
  fn read_field_treats_full_buffer_as_data_when_unterminated() {
    let buf = *b"abcde";
    assert_eq!(read_field(&buf), "abcde");
  }

  #[test]
  fn scrub_clears_everything_but_resets_online() {
    let mut frame = Frame::fresh();
    frame.encode_request(&Request::Registration { username: "alice".into(), password: "pw".into() });
    frame.set_server_status(ServerStatus::Offline);
    frame.scrub();
    assert_eq!(frame.server_status().unwrap(), ServerStatus::Online);
    assert_eq!(frame.username, [0u8; MAX_USERNAME_LEN + 1]);
  }
}
