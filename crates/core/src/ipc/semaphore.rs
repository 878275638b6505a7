use std::ffi::CString;
use std::ptr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SemError {
  #[error("invalid semaphore name {0:?}")]
  InvalidName(String),
  #[error("sem_open failed: {0}")]
  Open(#[source] std::io::Error),
  #[error("sem_post failed: {0}")]
  Post(#[source] std::io::Error),
  #[error("sem_getvalue failed: {0}")]
  GetValue(#[source] std::io::Error),
  #[error("sem_close failed: {0}")]
  Close(#[source] std::io::Error),
  #[error("sem_unlink failed: {0}")]
  Unlink(#[source] std::io::Error),
  /// `sem_wait` returned `EINTR`: a signal arrived while blocked. Distinct
  /// from other errors so callers can implement the server's "interruptible
  /// wait on S1 means shutdown" rule.
  #[error("wait interrupted by signal")]
  Interrupted,
  #[error("sem_wait failed: {0}")]
  Wait(#[source] std::io::Error),
}

type Result<T> = std::result::Result<T, SemError>;

/// A named POSIX counting semaphore.
pub struct NamedSemaphore {
  sem: *mut libc::sem_t,
}

// Safety: `sem_t` is designed for cross-process/cross-thread use; all
// operations go through the POSIX API which is internally synchronized.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
  /// Create a named semaphore with the given initial value. Fails if a
  /// semaphore with this name already exists (`O_EXCL`).
  pub fn create(name: &str, initial: u32) -> Result<Self> {
    let cname = name_to_cstring(name)?;
    let sem = unsafe {
      libc::sem_open(
        cname.as_ptr(),
        libc::O_CREAT | libc::O_EXCL,
        0o640 as libc::c_uint,
        initial as libc::c_uint,
      )
    };
    if sem == libc::SEM_FAILED {
      return Err(SemError::Open(std::io::Error::last_os_error()));
    }
    Ok(Self { sem })
  }

  /// Open an existing named semaphore.
  pub fn open(name: &str) -> Result<Self> {
    let cname = name_to_cstring(name)?;
    let sem = unsafe { libc::sem_open(cname.as_ptr(), 0) };
    if sem == libc::SEM_FAILED {
      return Err(SemError::Open(std::io::Error::last_os_error()));
    }
    Ok(Self { sem })
  }

  /// Block until the semaphore's value is positive, then decrement it.
  /// Returns `Err(SemError::Interrupted)` if a signal interrupts the wait
  /// (`EINTR`) rather than treating it as a generic failure.
  pub fn wait(&self) -> Result<()> {
    let rc = unsafe { libc::sem_wait(self.sem) };
    if rc == 0 {
      return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.kind() == std::io::ErrorKind::Interrupted {
      return Err(SemError::Interrupted);
    }
    Err(SemError::Wait(err))
  }

  /// Non-blocking wait: decrement and return `Ok(true)` if positive,
  /// `Ok(false)` if the semaphore was already zero.
  pub fn try_wait(&self) -> Result<bool> {
    let rc = unsafe { libc::sem_trywait(self.sem) };
    if rc == 0 {
      return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    if err.kind() == std::io::ErrorKind::WouldBlock {
      return Ok(false);
    }
    Err(SemError::Wait(err))
  }

  /// Increment the semaphore's value, waking one waiter if any.
  pub fn post(&self) -> Result<()> {
    let rc = unsafe { libc::sem_post(self.sem) };
    if rc != 0 {
      return Err(SemError::Post(std::io::Error::last_os_error()));
    }
    Ok(())
  }

  pub fn get_value(&self) -> Result<i32> {
    let mut value: libc::c_int = 0;
    let rc = unsafe { libc::sem_getvalue(self.sem, &mut value) };
    if rc != 0 {
      return Err(SemError::GetValue(std::io::Error::last_os_error()));
    }
    Ok(value)
  }

  /// Post as many times as needed for the value to become `>= 1`,
  /// guaranteeing at least one blocked waiter will wake.
  pub fn settle(&self) -> Result<()> {
    let mut value = self.get_value()?;
    while value < 1 {
      self.post()?;
      value += 1;
    }
    Ok(())
  }

  pub fn close(&self) -> Result<()> {
    let rc = unsafe { libc::sem_close(self.sem) };
    if rc != 0 {
      return Err(SemError::Close(std::io::Error::last_os_error()));
    }
    Ok(())
  }

  pub fn unlink(name: &str) -> Result<()> {
    let cname = name_to_cstring(name)?;
    let rc = unsafe { libc::sem_unlink(cname.as_ptr()) };
    if rc != 0 {
      return Err(SemError::Unlink(std::io::Error::last_os_error()));
    }
    Ok(())
  }
}

impl Drop for NamedSemaphore {
  fn drop(&mut self) {
    if !self.sem.is_null() && self.sem != libc::SEM_FAILED {
      let _ = unsafe { libc::sem_close(self.sem) };
    }
    self.sem = ptr::null_mut();
  }
}

fn name_to_cstring(name: &str) -> Result<CString> {
  CString::new(name).map_err(|_| SemError::InvalidName(name.to_owned()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn unique_name(tag: &str) -> String {
    format!("/authme_test_{tag}_{}", std::process::id())
  }

  #[test]
  fn create_wait_post_round_trip() {
    let name = unique_name("sem1");
    let sem = NamedSemaphore::create(&name, 1).unwrap();
    assert_eq!(sem.get_value().unwrap(), 1);
    sem.wait().unwrap();
    assert_eq!(sem.get_value().unwrap(), 0);
    sem.post().unwrap();
    assert_eq!(sem.get_value().unwrap(), 1);
    NamedSemaphore::unlink(&name).unwrap();
  }

  #[test]
  fn settle_brings_value_to_at_least_one() {
    let name = unique_name("sem2");
    let sem = NamedSemaphore::create(&name, 0).unwrap();
    assert_eq!(sem.get_value().unwrap(), 0);
    sem.settle().unwrap();
    assert!(sem.get_value().unwrap() >= 1);
    NamedSemaphore::unlink(&name).unwrap();
  }

  #[test]
  fn try_wait_does_not_block_on_zero() {
    let name = unique_name("sem3");
    let sem = NamedSemaphore::create(&name, 0).unwrap();
    assert!(!sem.try_wait().unwrap());
    NamedSemaphore::unlink(&name).unwrap();
  }
}
