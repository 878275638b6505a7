//! Top-level error type composing every module's error enum.

use thiserror::Error;

use crate::database::DatabaseError;
use crate::ipc::{ChannelError, SemError, ShmemError};
use crate::protocol::ProtocolError;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Shmem(#[from] ShmemError),
  #[error(transparent)]
  Sem(#[from] SemError),
  #[error(transparent)]
  Channel(#[from] ChannelError),
  #[error(transparent)]
  Database(#[from] DatabaseError),
  #[error(transparent)]
  Protocol(#[from] ProtocolError),
  #[error("config: {0}")]
  Config(#[from] crate::config::ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
