// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! GuardedRegion - region access gated by lock state.
//!
//! Implemented by the lock handles and by their scope guards. Read-family
//! operations require a hold that permits reading, write-family operations
//! one that permits writing. Anything else fails before the region is
//! touched. Cursor movement is never gated.

use crate::error::{ShareError, ShareResult};
use crate::shm::Region;
use crate::types::ObjectName;

mod private {
    /// Proof that the caller is inside this crate.
    pub struct Token;

    pub trait Sealed {}
}

pub(crate) use private::{Sealed, Token};

/// Access to a guarded region. Sealed; implemented only by this crate's
/// lock handles and scopes.
pub trait GuardedRegion: private::Sealed {
    #[doc(hidden)]
    fn region_ref(&self, _: private::Token) -> &Region;

    #[doc(hidden)]
    fn region_mut(&mut self, _: private::Token) -> &mut Region;

    /// Check if guarded reads are allowed right now.
    fn read_permitted(&self) -> bool;

    /// Check if guarded writes are allowed right now.
    fn write_permitted(&self) -> bool;

    /// Get the region name.
    fn name(&self) -> &ObjectName {
        self.region_ref(Token).name()
    }

    /// Get the region capacity in bytes.
    fn capacity(&self) -> usize {
        self.region_ref(Token).capacity()
    }

    /// Get the cursor position.
    fn tell(&self) -> usize {
        self.region_ref(Token).tell()
    }

    /// Move the cursor. Not gated: the cursor is local to this handle.
    fn seek(&mut self, pos: usize) -> ShareResult<()> {
        self.region_mut(Token).seek(pos)
    }

    /// Fail with `ReadAccess` unless reads are permitted.
    fn ensure_read(&self) -> ShareResult<()> {
        if self.read_permitted() {
            Ok(())
        } else {
            Err(ShareError::ReadAccess {
                name: self.name().to_string(),
            })
        }
    }

    /// Fail with `WriteAccess` unless writes are permitted.
    fn ensure_write(&self) -> ShareResult<()> {
        if self.write_permitted() {
            Ok(())
        } else {
            Err(ShareError::WriteAccess {
                name: self.name().to_string(),
            })
        }
    }

    fn read(&mut self, len: usize) -> ShareResult<Vec<u8>> {
        self.ensure_read()?;
        self.region_mut(Token).read(len)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> ShareResult<usize> {
        self.ensure_read()?;
        self.region_mut(Token).read_into(buf)
    }

    fn read_to_end(&mut self) -> ShareResult<Vec<u8>> {
        self.ensure_read()?;
        self.region_mut(Token).read_to_end()
    }

    fn read_byte(&mut self) -> ShareResult<Option<u8>> {
        self.ensure_read()?;
        self.region_mut(Token).read_byte()
    }

    fn read_line(&mut self) -> ShareResult<Vec<u8>> {
        self.ensure_read()?;
        self.region_mut(Token).read_line()
    }

    fn find(&self, needle: &[u8], start: usize) -> ShareResult<Option<usize>> {
        self.ensure_read()?;
        self.region_ref(Token).find(needle, start)
    }

    fn rfind(&self, needle: &[u8], start: usize) -> ShareResult<Option<usize>> {
        self.ensure_read()?;
        self.region_ref(Token).rfind(needle, start)
    }

    /// Write at the cursor. A write that does not fit fails with
    /// `CapacityExceeded` and leaves the region unchanged.
    fn write(&mut self, data: &[u8]) -> ShareResult<usize> {
        self.ensure_write()?;
        self.region_mut(Token).write(data)
    }

    fn write_byte(&mut self, byte: u8) -> ShareResult<()> {
        self.ensure_write()?;
        self.region_mut(Token).write_byte(byte)
    }

    fn copy_within(&mut self, dest: usize, src: usize, count: usize) -> ShareResult<()> {
        self.ensure_write()?;
        self.region_mut(Token).copy_within(dest, src, count)
    }

    fn flush(&mut self) -> ShareResult<()> {
        self.ensure_write()?;
        self.region_ref(Token).flush()
    }
}
