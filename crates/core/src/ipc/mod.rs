//! IPC primitives: the shared-memory mapping, named semaphores, and the
//! `Channel` handoff protocol built on top of them.

pub mod channel;
pub mod semaphore;
pub mod shmem;

pub use channel::{Channel, ChannelError, ChannelNames, ServeOutcome, ServerCleanup};
pub use semaphore::{NamedSemaphore, SemError};
pub use shmem::{ShmemError, SharedFrame};
