//! Core library for authme: the shared-memory wire protocol, the IPC
//! primitives built on it, the session table and user database, and the
//! server's dispatch loop.
//!
//! The server and client binaries talk exclusively through a fixed-size
//! POSIX shared-memory frame plus three named semaphores -- there is no
//! network transport anywhere in this crate. See `protocol` for the frame
//! layout, `ipc` for the shared-memory and semaphore wrappers plus the
//! rendezvous protocol built on top of them, `session` and `database` for
//! server-side state, and `server` for the dispatch loop that ties it all
//! together.

pub mod config;
pub mod database;
pub mod error;
pub mod ipc;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod session;
pub mod signal;
