use std::ffi::CString;
use std::mem::size_of;
use std::os::fd::{FromRawFd, OwnedFd};
use std::ptr::NonNull;

use nix::sys::mman::{MapFlags, ProtFlags, mmap, munmap};
use nix::unistd::ftruncate;
use thiserror::Error;

use crate::protocol::Frame;

#[derive(Debug, Error)]
pub enum ShmemError {
  #[error("invalid shared memory name {0:?}")]
  InvalidName(String),
  #[error("shm_open failed: {0}")]
  Open(#[source] std::io::Error),
  #[error("ftruncate failed: {0}")]
  Truncate(#[source] nix::Error),
  #[error("mmap failed: {0}")]
  Map(#[source] nix::Error),
  #[error("munmap failed: {0}")]
  Unmap(#[source] nix::Error),
  #[error("shm_unlink failed: {0}")]
  Unlink(#[source] std::io::Error),
}

type Result<T> = std::result::Result<T, ShmemError>;

/// A `Frame`-sized POSIX shared-memory mapping.
///
/// `SharedFrame::create` is the owner path (server): it creates the shared
/// memory object, sizes it, and maps it. `SharedFrame::open` is the
/// non-owner path (clients): it maps an already-existing object. Only the
/// owner is expected to call `unlink`.
pub struct SharedFrame {
  fd: OwnedFd,
  ptr: NonNull<Frame>,
}

// Safety: the mapping is valid shared memory for as long as `SharedFrame`
// lives; concurrent access across processes is coordinated entirely by the
// semaphore protocol in `crate::ipc::channel`, not by Rust's aliasing rules.
unsafe impl Send for SharedFrame {}
unsafe impl Sync for SharedFrame {}

impl SharedFrame {
  /// Create and size the shared-memory object, then map it. Fails if an
  /// object with this name already exists (`O_EXCL`).
  pub fn create(name: &str) -> Result<Self> {
    let fd = shm_open(name, libc::O_CREAT | libc::O_EXCL | libc::O_RDWR, 0o640)?;
    ftruncate(&fd, size_of::<Frame>() as i64).map_err(ShmemError::Truncate)?;
    let ptr = map(&fd)?;
    Ok(Self { fd, ptr })
  }

  /// Open an existing shared-memory object and map it.
  pub fn open(name: &str) -> Result<Self> {
    let fd = shm_open(name, libc::O_RDWR, 0o640)?;
    let ptr = map(&fd)?;
    Ok(Self { fd, ptr })
  }

  /// Unlink the backing shared-memory object. Only the owning server
  /// should call this; clients never unlink.
  pub fn unlink(name: &str) -> Result<()> {
    let cname = name_to_cstring(name)?;
    let rc = unsafe { libc::shm_unlink(cname.as_ptr()) };
    if rc != 0 {
      return Err(ShmemError::Unlink(std::io::Error::last_os_error()));
    }
    Ok(())
  }

  pub fn frame(&self) -> &Frame {
    // Safety: `ptr` is a valid, live mapping for the lifetime of `self`.
    unsafe { self.ptr.as_ref() }
  }

  pub fn frame_mut(&mut self) -> &mut Frame {
    // Safety: `ptr` is a valid, live mapping for the lifetime of `self`;
    // `&mut self` guarantees exclusive Rust-side access.
    unsafe { self.ptr.as_mut() }
  }
}

impl Drop for SharedFrame {
  fn drop(&mut self) {
    // Safety: `ptr` was obtained from `mmap` with a length of
    // `size_of::<Frame>()` and has not been unmapped yet.
    let _ = unsafe { munmap(self.ptr.cast(), size_of::<Frame>()) };
  }
}

fn name_to_cstring(name: &str) -> Result<CString> {
  CString::new(name).map_err(|_| ShmemError::InvalidName(name.to_owned()))
}

fn shm_open(name: &str, flags: i32, mode: libc::mode_t) -> Result<OwnedFd> {
  let cname = name_to_cstring(name)?;
  let fd = unsafe { libc::shm_open(cname.as_ptr(), flags, mode as libc::c_uint) };
  if fd < 0 {
    return Err(ShmemError::Open(std::io::Error::last_os_error()));
  }
  // Safety: `shm_open` returned a valid, owned file descriptor.
  Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn map(fd: &OwnedFd) -> Result<NonNull<Frame>> {
  // Safety: `fd` refers to an object at least `size_of::<Frame>()` bytes
  // long (guaranteed by `create`'s `ftruncate` or by a peer having already
  // sized it before this process calls `open`).
  let ptr = unsafe {
    mmap(
      None,
      std::num::NonZeroUsize::new(size_of::<Frame>()).expect("Frame is non-zero sized"),
      ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
      MapFlags::MAP_SHARED,
      fd,
      0,
    )
    .map_err(ShmemError::Map)?
  };
  Ok(ptr.cast())
}
