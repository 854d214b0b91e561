// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Mapping - POSIX shared memory object mapped into this process.
//!
//! Thin wrapper over shm_open, ftruncate and mmap. Owns the mapping and
//! unmaps it on drop. Removing the name from the namespace is a separate,
//! explicit call.

use std::mem::MaybeUninit;
use std::ptr::NonNull;

use nix::errno::Errno;

use crate::error::ShmError;
use crate::types::ObjectName;

/// Permissions for newly created objects (owner read/write).
const OBJECT_MODE: libc::mode_t = 0o600;

/// A shared memory object mapped read/write into this process.
///
/// Two mappings created with the same name refer to the same bytes, whether
/// they live in one process or in several.
pub struct Mapping {
    /// Name of the shared memory object.
    name: ObjectName,
    /// Pointer to the mapped memory.
    ptr: NonNull<u8>,
    /// Length of the mapping in bytes.
    len: usize,
    /// Whether this call created the object rather than attaching.
    created: bool,
}

// SAFETY: Mapping owns its mapping; the pointer stays valid until drop.
unsafe impl Send for Mapping {}

// SAFETY: Mapping hands out only raw pointers. Callers synchronize access.
unsafe impl Sync for Mapping {}

impl Mapping {
    /// Create the named object, or attach to it if it already exists, and
    /// map exactly `len` bytes of it.
    ///
    /// An existing object smaller than `len` is grown; newly added bytes read
    /// as zero. An existing larger object is left at its size and only the
    /// first `len` bytes are mapped.
    ///
    /// # Errors
    /// Returns ShmError if the object cannot be opened, sized or mapped.
    pub fn create_or_attach(name: &ObjectName, len: usize) -> Result<Self, ShmError> {
        if len == 0 {
            return Err(ShmError::CreateFailed {
                name: name.to_string(),
                reason: "Length must be greater than 0".to_string(),
            });
        }

        let (fd, created) = Self::open_fd(name)?;

        let result = Self::size_and_map(name, fd, len);

        // The mapping keeps the object alive; the descriptor is no longer needed.
        // SAFETY: fd was returned by shm_open and is closed exactly once.
        unsafe { libc::close(fd) };

        let ptr = match result {
            Ok(ptr) => ptr,
            Err(e) => {
                // Leave no half-made object behind in the namespace.
                if created {
                    if let Err(unlink) = Self::unlink(name) {
                        tracing::warn!(
                            name = %name,
                            error = %unlink,
                            "Failed to remove unsized object"
                        );
                    }
                }
                return Err(e);
            }
        };

        Ok(Self {
            name: name.clone(),
            ptr,
            len,
            created,
        })
    }

    /// Open the object exclusively first so creation can be told apart from
    /// attaching, then fall back to a plain open.
    fn open_fd(name: &ObjectName) -> Result<(libc::c_int, bool), ShmError> {
        let c_name = name.as_c_str();

        loop {
            // SAFETY: c_name is a valid NUL-terminated string
            let fd = unsafe {
                libc::shm_open(
                    c_name.as_ptr(),
                    libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                    OBJECT_MODE,
                )
            };
            if fd >= 0 {
                return Ok((fd, true));
            }

            match Errno::last() {
                Errno::EEXIST => {}
                Errno::EINTR => continue,
                errno => {
                    return Err(ShmError::CreateFailed {
                        name: name.to_string(),
                        reason: format!("shm_open failed: {}", errno),
                    })
                }
            }

            // SAFETY: c_name is a valid NUL-terminated string
            let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };
            if fd >= 0 {
                return Ok((fd, false));
            }

            match Errno::last() {
                // Unlinked between the two calls; try creating again.
                Errno::ENOENT | Errno::EINTR => continue,
                errno => {
                    return Err(ShmError::CreateFailed {
                        name: name.to_string(),
                        reason: format!("shm_open failed: {}", errno),
                    })
                }
            }
        }
    }

    fn size_and_map(
        name: &ObjectName,
        fd: libc::c_int,
        len: usize,
    ) -> Result<NonNull<u8>, ShmError> {
        let mut stat = MaybeUninit::<libc::stat>::uninit();
        // SAFETY: fd is valid and stat points to writable storage
        if unsafe { libc::fstat(fd, stat.as_mut_ptr()) } < 0 {
            return Err(ShmError::CreateFailed {
                name: name.to_string(),
                reason: format!("fstat failed: {}", Errno::last()),
            });
        }
        // SAFETY: fstat succeeded and initialized the struct
        let current = unsafe { stat.assume_init() }.st_size;
        let wanted = libc::off_t::try_from(len).map_err(|_| ShmError::CreateFailed {
            name: name.to_string(),
            reason: format!("Length {} exceeds the largest object size", len),
        })?;

        if current < wanted {
            // SAFETY: fd is a valid shared memory descriptor
            if unsafe { libc::ftruncate(fd, wanted) } < 0 {
                return Err(ShmError::CreateFailed {
                    name: name.to_string(),
                    reason: format!("ftruncate failed: {}", Errno::last()),
                });
            }
        }

        // SAFETY: fd is valid, len is non-zero and the object is at least len bytes
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };

        if ptr == libc::MAP_FAILED {
            return Err(ShmError::MapFailed {
                name: name.to_string(),
                reason: format!("mmap failed: {}", Errno::last()),
            });
        }

        NonNull::new(ptr as *mut u8).ok_or_else(|| ShmError::MapFailed {
            name: name.to_string(),
            reason: "mmap returned null".to_string(),
        })
    }

    /// Remove a shared memory object from the namespace.
    ///
    /// Processes that already mapped it keep their mapping.
    ///
    /// # Errors
    /// Returns ShmError::ResourceAlreadyGone if no object has that name.
    pub fn unlink(name: &ObjectName) -> Result<(), ShmError> {
        // SAFETY: the name is a valid NUL-terminated string
        if unsafe { libc::shm_unlink(name.as_c_str().as_ptr()) } == 0 {
            tracing::debug!(name = %name, "Unlinked shared memory object");
            return Ok(());
        }

        match Errno::last() {
            Errno::ENOENT => Err(ShmError::ResourceAlreadyGone {
                name: name.to_string(),
            }),
            errno => Err(ShmError::UnlinkFailed {
                name: name.to_string(),
                reason: format!("shm_unlink failed: {}", errno),
            }),
        }
    }

    /// Flush the mapping to the backing object.
    pub fn flush(&self) -> Result<(), ShmError> {
        // SAFETY: ptr and len describe a live mapping
        let result =
            unsafe { libc::msync(self.ptr.as_ptr() as *mut libc::c_void, self.len, libc::MS_SYNC) };
        if result < 0 {
            return Err(ShmError::FlushFailed {
                name: self.name.to_string(),
                reason: format!("msync failed: {}", Errno::last()),
            });
        }
        Ok(())
    }

    /// Get the name of the shared memory object.
    pub fn name(&self) -> &ObjectName {
        &self.name
    }

    /// Get the number of bytes mapped. Never zero.
    pub fn size(&self) -> usize {
        self.len
    }

    /// Check if this call created the object rather than attaching to it.
    pub fn created(&self) -> bool {
        self.created
    }

    /// Get a raw pointer to the mapped memory.
    ///
    /// Other processes may write through the same object at any time.
    /// Callers must synchronize access.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        // SAFETY: ptr and len were set by a successful mmap
        let result = unsafe { libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.len) };
        if result < 0 {
            tracing::error!(
                name = %self.name,
                error = %Errno::last(),
                "Failed to unmap shared memory"
            );
        }
    }
}
