// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! NamedSemaphore - POSIX named counting semaphore.
//!
//! Wraps sem_open/sem_wait/sem_post. Acquire and release are atomic across
//! processes; `value` is a snapshot that may be stale by the time it is
//! returned.

use std::ptr::NonNull;

use nix::errno::Errno;

use crate::error::{SemaphoreError, ShmError};
use crate::types::ObjectName;

/// Permissions for newly created semaphores (owner read/write).
const SEMAPHORE_MODE: libc::c_uint = 0o600;

/// Handle to a named semaphore.
///
/// Every handle opened with the same name, in any process, refers to the
/// same counter. Dropping the handle closes it; the name stays until
/// [`NamedSemaphore::unlink`] is called.
pub struct NamedSemaphore {
    name: ObjectName,
    sem: NonNull<libc::sem_t>,
}

// SAFETY: POSIX semaphores may be used from any thread.
unsafe impl Send for NamedSemaphore {}

// SAFETY: every operation on sem_t is thread-safe.
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Create the semaphore with `initial` units, or attach to it if it
    /// already exists. An existing semaphore keeps its current count.
    pub fn open(name: &ObjectName, initial: u32) -> Result<Self, SemaphoreError> {
        // SAFETY: the name is a valid NUL-terminated string; mode and value
        // are passed as c_uint as sem_open's variadic arguments require.
        let sem = unsafe {
            libc::sem_open(
                name.as_c_str().as_ptr(),
                libc::O_CREAT,
                SEMAPHORE_MODE,
                initial as libc::c_uint,
            )
        };

        if sem == libc::SEM_FAILED {
            return Err(SemaphoreError::OpenFailed {
                name: name.to_string(),
                reason: format!("sem_open failed: {}", Errno::last()),
            });
        }

        let sem = NonNull::new(sem).ok_or_else(|| SemaphoreError::OpenFailed {
            name: name.to_string(),
            reason: "sem_open returned null".to_string(),
        })?;

        tracing::debug!(name = %name, initial = initial, "Opened semaphore");

        Ok(Self {
            name: name.clone(),
            sem,
        })
    }

    /// Get the semaphore name.
    pub fn name(&self) -> &ObjectName {
        &self.name
    }

    /// Take one unit, blocking until one is available.
    pub fn acquire(&self) -> Result<(), SemaphoreError> {
        loop {
            // SAFETY: sem is a live handle returned by sem_open
            if unsafe { libc::sem_wait(self.sem.as_ptr()) } == 0 {
                tracing::trace!(name = %self.name, "Acquired semaphore");
                return Ok(());
            }
            match Errno::last() {
                Errno::EINTR => continue,
                errno => {
                    return Err(SemaphoreError::AcquireFailed {
                        name: self.name.to_string(),
                        reason: format!("sem_wait failed: {}", errno),
                    })
                }
            }
        }
    }

    /// Take one unit if one is available right now.
    ///
    /// Returns `Ok(false)` instead of blocking.
    pub fn try_acquire(&self) -> Result<bool, SemaphoreError> {
        loop {
            // SAFETY: sem is a live handle returned by sem_open
            if unsafe { libc::sem_trywait(self.sem.as_ptr()) } == 0 {
                tracing::trace!(name = %self.name, "Acquired semaphore without waiting");
                return Ok(true);
            }
            match Errno::last() {
                Errno::EAGAIN => return Ok(false),
                Errno::EINTR => continue,
                errno => {
                    return Err(SemaphoreError::AcquireFailed {
                        name: self.name.to_string(),
                        reason: format!("sem_trywait failed: {}", errno),
                    })
                }
            }
        }
    }

    /// Return one unit.
    pub fn release(&self) -> Result<(), SemaphoreError> {
        // SAFETY: sem is a live handle returned by sem_open
        if unsafe { libc::sem_post(self.sem.as_ptr()) } < 0 {
            return Err(SemaphoreError::ReleaseFailed {
                name: self.name.to_string(),
                reason: format!("sem_post failed: {}", Errno::last()),
            });
        }
        tracing::trace!(name = %self.name, "Released semaphore");
        Ok(())
    }

    /// Best-effort snapshot of the current count.
    ///
    /// Not atomic with respect to acquire/release by other processes. Do not
    /// make a decision on it unless something else keeps the count from
    /// moving in the direction that matters.
    pub fn value(&self) -> Result<u32, SemaphoreError> {
        let mut value: libc::c_int = 0;
        // SAFETY: sem is a live handle and value points to writable storage
        if unsafe { libc::sem_getvalue(self.sem.as_ptr(), &mut value) } < 0 {
            return Err(SemaphoreError::ValueFailed {
                name: self.name.to_string(),
                reason: format!("sem_getvalue failed: {}", Errno::last()),
            });
        }
        // Some platforms report waiters as a negative count.
        Ok(value.max(0) as u32)
    }

    /// Remove a semaphore name from the namespace.
    ///
    /// Open handles keep working until they are closed.
    ///
    /// # Errors
    /// Returns ShmError::ResourceAlreadyGone if no semaphore has that name.
    pub fn unlink(name: &ObjectName) -> Result<(), ShmError> {
        // SAFETY: the name is a valid NUL-terminated string
        if unsafe { libc::sem_unlink(name.as_c_str().as_ptr()) } == 0 {
            tracing::debug!(name = %name, "Unlinked semaphore");
            return Ok(());
        }

        match Errno::last() {
            Errno::ENOENT => Err(ShmError::ResourceAlreadyGone {
                name: name.to_string(),
            }),
            errno => Err(ShmError::UnlinkFailed {
                name: name.to_string(),
                reason: format!("sem_unlink failed: {}", errno),
            }),
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        // SAFETY: sem was returned by sem_open and is closed exactly once
        if unsafe { libc::sem_close(self.sem.as_ptr()) } < 0 {
            tracing::error!(
                name = %self.name,
                error = %Errno::last(),
                "Failed to close semaphore"
            );
        }
    }
}
