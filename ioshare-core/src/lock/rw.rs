// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! ReaderWriterLock - many readers or one writer.
//!
//! Two named semaphores per region:
//! - `<name>_write`: binary writer mutex, initial 1.
//! - `<name>_read`: reader admission, initial `max_readers`.
//!
//! Readers pass through the writer mutex to take an admission unit, so a
//! writer holding the mutex stops new readers at the door. The writer then
//! waits for the admission count to climb back to `max_readers`. While the
//! writer holds the mutex the count can only rise, so once the full count
//! is observed no reader is inside. The wait sleeps on a release doorbell
//! (`<name>_rwctl`) rung by every read release.

use crate::error::{first_error, swallow_gone, SemaphoreError, ShareResult};
use crate::lock::guarded::{GuardedRegion, Sealed, Token};
use crate::shm::{Mapping, Region};
use crate::sync::{LockPhase, LockState, NamedSemaphore, ReleaseNotifier, RwHold};
use crate::types::{Capacity, MaxReaders, ObjectName, Ownership};

const WRITE_SUFFIX: &str = "_write";
const READ_SUFFIX: &str = "_read";
const NOTIFY_SUFFIX: &str = "_rwctl";

/// Names of every object backing one reader/writer region.
struct RwNames {
    write: ObjectName,
    read: ObjectName,
    notify: ObjectName,
}

impl RwNames {
    fn derive(name: &ObjectName) -> ShareResult<Self> {
        Ok(Self {
            write: name.derive(WRITE_SUFFIX)?,
            read: name.derive(READ_SUFFIX)?,
            notify: name.derive(NOTIFY_SUFFIX)?,
        })
    }

    fn unlink(&self) -> ShareResult<()> {
        first_error([
            swallow_gone(NamedSemaphore::unlink(&self.write)),
            swallow_gone(NamedSemaphore::unlink(&self.read)),
            swallow_gone(ReleaseNotifier::unlink(&self.notify)),
        ])
    }
}

/// A region guarded by multi-reader/single-writer admission.
///
/// Every participant must open the region with the same `max_readers`;
/// the admission semaphore is created with whichever value comes first.
pub struct ReaderWriterLock {
    region: Region,
    names: RwNames,
    write_mutex: NamedSemaphore,
    read_admission: NamedSemaphore,
    notifier: ReleaseNotifier,
    max_readers: MaxReaders,
    state: LockState<RwHold>,
    ownership: Ownership,
    torn_down: bool,
}

impl ReaderWriterLock {
    /// Create or attach to the named region and its semaphores.
    pub fn create_or_attach(
        name: &str,
        capacity: Capacity,
        max_readers: MaxReaders,
        ownership: Ownership,
    ) -> ShareResult<Self> {
        let name = ObjectName::new(name)?;
        Self::open(&name, capacity, max_readers, ownership)
    }

    /// Same as [`ReaderWriterLock::create_or_attach`] for a validated name.
    pub fn open(
        name: &ObjectName,
        capacity: Capacity,
        max_readers: MaxReaders,
        ownership: Ownership,
    ) -> ShareResult<Self> {
        let names = RwNames::derive(name)?;
        let region = Region::open(name, capacity, ownership)?;
        let write_mutex = NamedSemaphore::open(&names.write, 1)?;
        let read_admission = NamedSemaphore::open(&names.read, max_readers.value())?;
        let notifier = ReleaseNotifier::open(&names.notify)?;

        let admitted = read_admission.value()?;
        if admitted > max_readers.value() {
            tracing::warn!(
                name = %name,
                admitted = admitted,
                max_readers = max_readers.value(),
                "Reader admission count exceeds max_readers; participants disagree on the limit"
            );
        }

        Ok(Self {
            region,
            names,
            write_mutex,
            read_admission,
            notifier,
            max_readers,
            state: LockState::default(),
            ownership,
            torn_down: false,
        })
    }

    /// Get the reader limit this handle was opened with.
    pub fn max_readers(&self) -> MaxReaders {
        self.max_readers
    }

    /// Best-effort snapshot of free reader slots.
    pub fn available_readers(&self) -> ShareResult<u32> {
        Ok(self.read_admission.value()?)
    }

    /// Arm the next scope entry to take a read hold.
    pub fn request_read(&mut self) -> &mut Self {
        self.state.arm(RwHold::Read, self.region.name());
        self
    }

    /// Arm the next scope entry to take the write hold.
    pub fn request_write(&mut self) -> &mut Self {
        self.state.arm(RwHold::Write, self.region.name());
        self
    }

    /// Enter a scope, acquiring whatever hold was requested.
    ///
    /// Without a request the scope is an unsafe passthrough that permits no
    /// guarded reads or writes.
    pub fn enter_scope(&mut self) -> ShareResult<RwScope<'_>> {
        let hold = self.state.enter(self.region.name());

        let acquired = match hold {
            Some(RwHold::Write) => self.acquire_write(),
            Some(RwHold::Read) => self.acquire_read(),
            None => Ok(()),
        };
        if let Err(e) = acquired {
            self.state.exit(self.region.name());
            return Err(e);
        }

        Ok(RwScope {
            lock: self,
            hold,
            open: true,
        })
    }

    /// Request a read hold and enter a scope holding it.
    pub fn read_lock(&mut self) -> ShareResult<RwScope<'_>> {
        self.request_read();
        self.enter_scope()
    }

    /// Request the write hold and enter a scope holding it.
    pub fn write_lock(&mut self) -> ShareResult<RwScope<'_>> {
        self.request_write();
        self.enter_scope()
    }

    /// Get the current lock phase of this handle.
    pub fn phase(&self) -> LockPhase<RwHold> {
        self.state.phase()
    }

    fn acquire_write(&self) -> ShareResult<()> {
        self.write_mutex.acquire()?;

        let max = self.max_readers.value();
        let drained = self
            .notifier
            .wait_until(|| Ok::<bool, SemaphoreError>(self.read_admission.value()? >= max));

        if let Err(e) = drained {
            self.release_mutex_after_failure();
            return Err(e.into());
        }

        tracing::trace!(name = %self.region.name(), "Write hold acquired");
        Ok(())
    }

    fn acquire_read(&self) -> ShareResult<()> {
        self.write_mutex.acquire()?;
        let admitted = self.read_admission.acquire();
        let released = self.write_mutex.release();
        admitted?;
        released?;

        tracing::trace!(name = %self.region.name(), "Read hold acquired");
        Ok(())
    }

    fn release_mutex_after_failure(&self) {
        if let Err(e) = self.write_mutex.release() {
            tracing::error!(name = %self.region.name(), error = %e, "Failed to release writer mutex");
        }
    }

    fn release(&mut self, hold: Option<RwHold>) -> ShareResult<()> {
        self.state.exit(self.region.name());
        match hold {
            Some(RwHold::Write) => self.write_mutex.release()?,
            Some(RwHold::Read) => {
                self.read_admission.release()?;
                self.notifier.notify();
            }
            None => {}
        }
        Ok(())
    }

    /// Release the mapping and, if `unlink` is set, remove the region and
    /// every derived object from the namespace. Repeatable.
    pub fn teardown(&mut self, unlink: bool) -> ShareResult<()> {
        self.torn_down = true;
        let region = self.region.teardown(unlink);
        let names = if unlink { self.names.unlink() } else { Ok(()) };
        first_error([region, names])
    }

    /// Remove a region and its reader/writer objects by name.
    pub fn unlink(name: &ObjectName) -> ShareResult<()> {
        let names = RwNames::derive(name)?;
        first_error([swallow_gone(Mapping::unlink(name)), names.unlink()])
    }
}

impl Sealed for ReaderWriterLock {}

impl GuardedRegion for ReaderWriterLock {
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

impl Drop for ReaderWriterLock {
    fn drop(&mut self) {
        if self.torn_down || !self.ownership.is_owner() {
            return;
        }
        if let Err(e) = self.names.unlink() {
            tracing::error!(name = %self.region.name(), error = %e, "Failed to unlink reader/writer objects");
        }
    }
}

/// Proof that a [`ReaderWriterLock`] scope is active.
///
/// A read hold permits read-family operations only, the write hold
/// write-family operations only. Dropping the scope releases the hold.
pub struct RwScope<'a> {
    lock: &'a mut ReaderWriterLock,
    hold: Option<RwHold>,
    open: bool,
}

impl RwScope<'_> {
    /// Get the hold this scope acquired, `None` for passthrough.
    pub fn hold(&self) -> Option<RwHold> {
        self.hold
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
        self.lock.release(self.hold)
    }
}

impl Sealed for RwScope<'_> {}

impl GuardedRegion for RwScope<'_> {
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

impl Drop for RwScope<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            tracing::error!(name = %self.lock.region.name(), error = %e, "Failed to release reader/writer hold");
        }
    }
}
