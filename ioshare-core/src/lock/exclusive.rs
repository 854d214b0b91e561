// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! ExclusiveLock - one holder at a time.
//!
//! A region plus one binary semaphore carrying the region's own name, so
//! handles in different processes that name the same region share the
//! lock.
//!
//! ```no_run
//! use ioshare_core::{Capacity, ExclusiveLock, GuardedRegion, Ownership};
//!
//! # fn main() -> ioshare_core::ShareResult<()> {
//! let mut shm = ExclusiveLock::create_or_attach("/my_share", Capacity::new(15)?, Ownership::Owner)?;
//! assert!(shm.write(b"denied").is_err());
//!
//! let mut scope = shm.lock()?;
//! scope.write(b"Hello, World!!!")?;
//! # Ok(())
//! # }
//! ```

use std::io;

use crate::error::{first_error, swallow_gone, ShareResult};
use crate::lock::guarded::{GuardedRegion, Sealed, Token};
use crate::shm::{Mapping, Region};
use crate::sync::{ExclusiveHold, LockPhase, LockState, NamedSemaphore};
use crate::types::{Capacity, ObjectName, Ownership};

/// A region whose reads and writes require holding a cross-process mutex.
pub struct ExclusiveLock {
    region: Region,
    semaphore: NamedSemaphore,
    state: LockState<ExclusiveHold>,
    ownership: Ownership,
    torn_down: bool,
}

impl ExclusiveLock {
    /// Create or attach to the named region and its lock.
    pub fn create_or_attach(
        name: &str,
        capacity: Capacity,
        ownership: Ownership,
    ) -> ShareResult<Self> {
        let name = ObjectName::new(name)?;
        Self::open(&name, capacity, ownership)
    }

    /// Same as [`ExclusiveLock::create_or_attach`] for a validated name.
    pub fn open(name: &ObjectName, capacity: Capacity, ownership: Ownership) -> ShareResult<Self> {
        let region = Region::open(name, capacity, ownership)?;
        let semaphore = NamedSemaphore::open(name, 1)?;

        Ok(Self {
            region,
            semaphore,
            state: LockState::default(),
            ownership,
            torn_down: false,
        })
    }

    /// Arm the next [`enter_scope`](Self::enter_scope) to acquire the lock.
    /// Does not block; arming twice is the same as arming once.
    pub fn request_lock(&mut self) -> &mut Self {
        self.state.arm(ExclusiveHold, self.region.name());
        self
    }

    /// Enter a scope.
    ///
    /// If armed, blocks until the semaphore is acquired. If not armed, the
    /// scope is an unsafe passthrough: nothing is acquired and every guarded
    /// read or write inside it fails. It exists for administrative work
    /// such as repositioning the cursor.
    pub fn enter_scope(&mut self) -> ShareResult<ExclusiveScope<'_>> {
        let hold = self.state.enter(self.region.name());

        if hold.is_some() {
            if let Err(e) = self.semaphore.acquire() {
                self.state.exit(self.region.name());
                return Err(e.into());
            }
        }

        Ok(ExclusiveScope {
            lock: self,
            acquired: hold.is_some(),
            open: true,
        })
    }

    /// Request the lock and enter a scope holding it.
    pub fn lock(&mut self) -> ShareResult<ExclusiveScope<'_>> {
        self.request_lock();
        self.enter_scope()
    }

    /// Get the current lock phase of this handle.
    pub fn phase(&self) -> LockPhase<ExclusiveHold> {
        self.state.phase()
    }

    /// Get the ownership this handle was constructed with.
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Release the mapping and, if `unlink` is set, remove the region and
    /// its semaphore from the namespace. Repeatable.
    ///
    /// Every removal is attempted even if an earlier one fails; the first
    /// failure is returned.
    pub fn teardown(&mut self, unlink: bool) -> ShareResult<()> {
        self.torn_down = true;
        let region = self.region.teardown(unlink);
        let semaphore = if unlink {
            swallow_gone(NamedSemaphore::unlink(self.region.name()))
        } else {
            Ok(())
        };
        first_error([region, semaphore])
    }

    /// Remove a region and its lock semaphore by name. Objects that are
    /// already gone are skipped.
    pub fn unlink(name: &ObjectName) -> ShareResult<()> {
        first_error([
            swallow_gone(Mapping::unlink(name)),
            swallow_gone(NamedSemaphore::unlink(name)),
        ])
    }

    /// Leave the scope: disarm first, then return the semaphore if this
    /// scope took it.
    fn release(&mut self, acquired: bool) -> ShareResult<()> {
        self.state.exit(self.region.name());
        if acquired {
            self.semaphore.release()?;
        }
        Ok(())
    }
}

impl Sealed for ExclusiveLock {}

impl GuardedRegion for ExclusiveLock {
    fn region_ref(&self, _: Token) -> &Region {
        &self.region
    }

    fn region_mut(&mut self, _: Token) -> &mut Region {
        &mut self.region
    }

    fn read_permitted(&self) -> bool {
        self.state.permits_read()
    }

    fn write_permitted(&self) -> bool {
        self.state.permits_write()
    }
}

impl Drop for ExclusiveLock {
    fn drop(&mut self) {
        if self.torn_down || !self.ownership.is_owner() {
            return;
        }
        if let Err(e) = swallow_gone(NamedSemaphore::unlink(self.region.name())) {
            tracing::error!(name = %self.region.name(), error = %e, "Failed to unlink lock semaphore");
        }
    }
}

/// Proof that an [`ExclusiveLock`] scope is active.
///
/// Dropping the scope (or calling [`exit`](Self::exit)) releases the
/// semaphore if this scope acquired it, on every exit path.
pub struct ExclusiveScope<'a> {
    lock: &'a mut ExclusiveLock,
    acquired: bool,
    open: bool,
}

impl ExclusiveScope<'_> {
    /// Check if this scope holds the semaphore (false for passthrough).
    pub fn is_locked(&self) -> bool {
        self.acquired
    }

    /// Leave the scope, reporting a failed release instead of logging it.
    pub fn exit(mut self) -> ShareResult<()> {
        self.finish()
    }

    fn finish(&mut self) -> ShareResult<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.lock.release(self.acquired)
    }
}

impl Sealed for ExclusiveScope<'_> {}

impl GuardedRegion for ExclusiveScope<'_> {
    fn region_ref(&self, _: Token) -> &Region {
        &self.lock.region
    }

    fn region_mut(&mut self, _: Token) -> &mut Region {
        &mut self.lock.region
    }

    fn read_permitted(&self) -> bool {
        self.open && self.lock.state.permits_read()
    }

    fn write_permitted(&self) -> bool {
        self.open && self.lock.state.permits_write()
    }
}

impl io::Read for ExclusiveScope<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        GuardedRegion::read_into(self, buf).map_err(io::Error::other)
    }
}

impl Drop for ExclusiveScope<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            tracing::error!(name = %self.lock.region.name(), error = %e, "Failed to release exclusive lock");
        }
    }
}
