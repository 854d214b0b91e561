// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Region - named fixed-capacity byte buffer with a cursor.
//!
//! This is the unguarded layer. Nothing here stops two processes from
//! writing the same bytes at once; the lock types in [`crate::lock`] build
//! access discipline on top of it.

use std::io;

use crate::error::{swallow_gone, ShareError, ShareResult, ShmError};
use crate::shm::Mapping;
use crate::types::{Capacity, ObjectName, Ownership};

/// A named shared memory region with file-like cursor access.
///
/// The cursor is local to this handle. Contents are shared with every other
/// handle mapped under the same name.
pub struct Region {
    name: ObjectName,
    capacity: usize,
    cursor: usize,
    ownership: Ownership,
    /// `None` once the region has been torn down.
    mapping: Option<Mapping>,
}

impl Region {
    /// Create the named region or attach to an existing one.
    ///
    /// Idempotent: any number of handles, in any number of processes, may
    /// call this with the same name and capacity.
    pub fn create_or_attach(
        name: &str,
        capacity: Capacity,
        ownership: Ownership,
    ) -> ShareResult<Self> {
        let name = ObjectName::new(name)?;
        Self::open(&name, capacity, ownership)
    }

    /// Same as [`Region::create_or_attach`] for an already validated name.
    pub fn open(name: &ObjectName, capacity: Capacity, ownership: Ownership) -> ShareResult<Self> {
        let mapping = Mapping::create_or_attach(name, capacity.bytes())?;
        if mapping.created() {
            tracing::debug!(name = %name, capacity = %capacity, "Created region");
        } else {
            tracing::debug!(name = %name, capacity = %capacity, "Attached to region");
        }

        Ok(Self {
            name: name.clone(),
            capacity: capacity.bytes(),
            cursor: 0,
            ownership,
            mapping: Some(mapping),
        })
    }

    /// Get the region name.
    pub fn name(&self) -> &ObjectName {
        &self.name
    }

    /// Get the fixed capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the cursor position.
    pub fn tell(&self) -> usize {
        self.cursor
    }

    /// Get the ownership this handle was constructed with.
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Check if the region has been torn down.
    pub fn is_closed(&self) -> bool {
        self.mapping.is_none()
    }

    /// Bytes between the cursor and the end of the region.
    pub fn remaining(&self) -> usize {
        self.capacity - self.cursor
    }

    fn mapping(&self) -> ShareResult<&Mapping> {
        self.mapping.as_ref().ok_or_else(|| {
            ShmError::Closed {
                name: self.name.to_string(),
            }
            .into()
        })
    }

    /// Read-only view of the whole region.
    fn view(&self) -> ShareResult<&[u8]> {
        let mapping = self.mapping()?;
        // SAFETY: the mapping is `size()` bytes long and lives as long as
        // `self`. Other processes may change the bytes concurrently; callers
        // that need a stable view hold one of the locks.
        Ok(unsafe { std::slice::from_raw_parts(mapping.as_ptr(), mapping.size()) })
    }

    /// Mutable view of the whole region.
    fn view_mut(&mut self) -> ShareResult<&mut [u8]> {
        let mapping = self.mapping()?;
        // SAFETY: as in `view`; `&mut self` rules out aliasing within this handle.
        Ok(unsafe { std::slice::from_raw_parts_mut(mapping.as_ptr(), mapping.size()) })
    }

    /// Move the cursor to an absolute position in `[0, capacity]`.
    pub fn seek(&mut self, pos: usize) -> ShareResult<()> {
        if pos > self.capacity {
            return Err(ShareError::InvalidOffset {
                name: self.name.to_string(),
                offset: pos,
                capacity: self.capacity,
            });
        }
        self.cursor = pos;
        Ok(())
    }

    /// Read up to `len` bytes from the cursor and advance it.
    ///
    /// Near the end of the region fewer bytes are returned; at the end the
    /// result is empty.
    pub fn read(&mut self, len: usize) -> ShareResult<Vec<u8>> {
        let start = self.cursor;
        let end = start + len.min(self.remaining());
        let data = self.view()?[start..end].to_vec();
        self.cursor = end;
        Ok(data)
    }

    /// Read into `buf` from the cursor, returning the number of bytes copied.
    pub fn read_into(&mut self, buf: &mut [u8]) -> ShareResult<usize> {
        let start = self.cursor;
        let count = buf.len().min(self.remaining());
        buf[..count].copy_from_slice(&self.view()?[start..start + count]);
        self.cursor += count;
        Ok(count)
    }

    /// Read everything from the cursor to the end of the region.
    pub fn read_to_end(&mut self) -> ShareResult<Vec<u8>> {
        self.read(self.remaining())
    }

    /// Read a single byte, or `None` at the end of the region.
    pub fn read_byte(&mut self) -> ShareResult<Option<u8>> {
        if self.remaining() == 0 {
            return Ok(None);
        }
        let byte = self.view()?[self.cursor];
        self.cursor += 1;
        Ok(Some(byte))
    }

    /// Read up to and including the next `\n`, or to the end of the region.
    pub fn read_line(&mut self) -> ShareResult<Vec<u8>> {
        let start = self.cursor;
        let end = match self.view()?[start..].iter().position(|&b| b == b'\n') {
            Some(offset) => start + offset + 1,
            None => self.capacity,
        };
        let line = self.view()?[start..end].to_vec();
        self.cursor = end;
        Ok(line)
    }

    /// Lowest offset at or after `start` where `needle` begins.
    pub fn find(&self, needle: &[u8], start: usize) -> ShareResult<Option<usize>> {
        let haystack = self.view()?;
        if start > self.capacity {
            return Ok(None);
        }
        if needle.is_empty() {
            return Ok(Some(start));
        }
        Ok(haystack[start..]
            .windows(needle.len())
            .position(|w| w == needle)
            .map(|offset| start + offset))
    }

    /// Highest offset at or after `start` where `needle` begins.
    pub fn rfind(&self, needle: &[u8], start: usize) -> ShareResult<Option<usize>> {
        let haystack = self.view()?;
        if start > self.capacity {
            return Ok(None);
        }
        if needle.is_empty() {
            return Ok(Some(self.capacity));
        }
        Ok(haystack[start..]
            .windows(needle.len())
            .rposition(|w| w == needle)
            .map(|offset| start + offset))
    }

    /// Write `data` at the cursor and advance it.
    ///
    /// # Errors
    /// Returns ShareError::CapacityExceeded if the write would cross the end
    /// of the region. Nothing is written and the cursor does not move.
    pub fn write(&mut self, data: &[u8]) -> ShareResult<usize> {
        let available = self.remaining();
        if data.len() > available {
            return Err(ShareError::CapacityExceeded {
                name: self.name.to_string(),
                requested: data.len(),
                available,
            });
        }
        let start = self.cursor;
        self.view_mut()?[start..start + data.len()].copy_from_slice(data);
        self.cursor += data.len();
        Ok(data.len())
    }

    /// Write a single byte at the cursor and advance it.
    pub fn write_byte(&mut self, byte: u8) -> ShareResult<()> {
        self.write(&[byte]).map(|_| ())
    }

    /// Copy `count` bytes from `src` to `dest` inside the region. The ranges
    /// may overlap. The cursor does not move.
    pub fn copy_within(&mut self, dest: usize, src: usize, count: usize) -> ShareResult<()> {
        let capacity = self.capacity;
        for offset in [src, dest] {
            if offset.checked_add(count).map_or(true, |end| end > capacity) {
                return Err(ShareError::InvalidOffset {
                    name: self.name.to_string(),
                    offset,
                    capacity,
                });
            }
        }
        self.view_mut()?.copy_within(src..src + count, dest);
        Ok(())
    }

    /// Flush written bytes to the backing object.
    pub fn flush(&self) -> ShareResult<()> {
        self.mapping()?.flush()?;
        Ok(())
    }

    /// Release the local mapping and, if `unlink` is set, remove the name
    /// from the OS namespace.
    ///
    /// Safe to call repeatedly and from several processes: an object that
    /// is already gone is not an error.
    pub fn teardown(&mut self, unlink: bool) -> ShareResult<()> {
        if self.mapping.take().is_some() {
            tracing::debug!(name = %self.name, "Released region mapping");
        }
        if unlink {
            swallow_gone(Mapping::unlink(&self.name))?;
        }
        Ok(())
    }
}

impl io::Read for Region {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_into(buf).map_err(io::Error::other)
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        // An explicit teardown already decided about unlinking.
        if self.mapping.is_none() {
            return;
        }
        if let Err(e) = self.teardown(self.ownership.is_owner()) {
            tracing::error!(name = %self.name, error = %e, "Failed to tear down region");
        }
    }
}
