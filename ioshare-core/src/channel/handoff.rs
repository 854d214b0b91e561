// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Single-slot producer/consumer handoff over an exclusive region.
//!
//! The slot is the region from offset 0. A binary-ish "ready" semaphore
//! (`<name>_ready`, initial 0) counts published items: produce posts it
//! only when it reads 0, consume waits on it. The slot itself is always
//! read and written under the region's exclusive lock.

use std::fmt;
use std::io;
use std::str::FromStr;

use crate::channel::codec::{Codec, FrameCodec};
use crate::error::{first_error, swallow_gone, ShareError, ShareResult};
use crate::lock::{ExclusiveLock, GuardedRegion};
use crate::sync::NamedSemaphore;
use crate::types::{Capacity, ObjectName, Ownership};

const READY_SUFFIX: &str = "_ready";

/// Which side of the handoff a channel handle plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    /// Publishes items with [`Channel::produce`].
    Producer,
    /// Takes items with [`Channel::consume`] or [`Channel::try_consume`].
    Consumer,
}

impl ChannelMode {
    /// Get the lowercase mode name used in messages and on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            ChannelMode::Producer => "producer",
            ChannelMode::Consumer => "consumer",
        }
    }

}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChannelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "producer" | "put" => Ok(ChannelMode::Producer),
            "consumer" | "get" => Ok(ChannelMode::Consumer),
            other => Err(format!(
                "unknown channel mode '{}', expected producer or consumer",
                other
            )),
        }
    }
}

/// A one-item mailbox between processes.
///
/// The producer overwrites the slot on every `produce`; if the consumer has
/// not picked up the previous item it is replaced, and the ready count
/// stays at one. Each handle is fixed to one mode at construction.
pub struct Channel<C: Codec = FrameCodec> {
    lock: ExclusiveLock,
    ready: NamedSemaphore,
    mode: ChannelMode,
    codec: C,
    ownership: Ownership,
    torn_down: bool,
}

impl Channel<FrameCodec> {
    /// Open a raw-bytes channel.
    pub fn create_or_attach(
        name: &str,
        capacity: Capacity,
        mode: ChannelMode,
        ownership: Ownership,
    ) -> ShareResult<Self> {
        let name = ObjectName::new(name)?;
        Self::with_codec(&name, capacity, mode, ownership, FrameCodec)
    }
}

impl<C: Codec> Channel<C> {
    /// Open a channel that moves items through `codec`.
    pub fn with_codec(
        name: &ObjectName,
        capacity: Capacity,
        mode: ChannelMode,
        ownership: Ownership,
        codec: C,
    ) -> ShareResult<Self> {
        let ready_name = name.derive(READY_SUFFIX)?;
        let lock = ExclusiveLock::open(name, capacity, ownership)?;
        let ready = NamedSemaphore::open(&ready_name, 0)?;

        tracing::debug!(name = %name, mode = %mode, "Channel opened");

        Ok(Self {
            lock,
            ready,
            mode,
            codec,
            ownership,
            torn_down: false,
        })
    }

    /// Get the name of the slot region.
    pub fn name(&self) -> &ObjectName {
        self.lock.name()
    }

    /// Get the slot size in bytes, frame header included.
    pub fn capacity(&self) -> usize {
        self.lock.capacity()
    }

    /// Get the side this handle was opened as.
    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    /// Check if an item is waiting. Best effort.
    pub fn is_ready(&self) -> ShareResult<bool> {
        Ok(self.ready.value()? > 0)
    }

    /// Publish an item into the slot.
    ///
    /// Encoding happens before the lock is taken, so an item that does not
    /// fit fails with `CapacityExceeded` and leaves the slot untouched.
    pub fn produce(&mut self, item: &C::Item) -> ShareResult<()> {
        self.ensure_mode(ChannelMode::Producer, "produce")?;
        let frame = self.codec.encode(item)?;

        {
            let mut scope = self.lock.lock()?;
            scope.seek(0)?;
            scope.write(&frame)?;
            scope.exit()?;
        }

        if self.ready.value()? == 0 {
            self.ready.release()?;
        }

        tracing::trace!(name = %self.lock.name(), bytes = frame.len(), "Item produced");
        Ok(())
    }

    /// Wait for an item and take it.
    pub fn consume(&mut self) -> ShareResult<C::Item> {
        self.ensure_mode(ChannelMode::Consumer, "consume")?;
        self.ready.acquire()?;
        self.take_slot()
    }

    /// Take an item if one is ready, without waiting.
    pub fn try_consume(&mut self) -> ShareResult<Option<C::Item>> {
        self.ensure_mode(ChannelMode::Consumer, "consume")?;
        if !self.ready.try_acquire()? {
            return Ok(None);
        }
        self.take_slot().map(Some)
    }

    fn take_slot(&mut self) -> ShareResult<C::Item> {
        let mut scope = self.lock.lock()?;
        scope.seek(0)?;
        let item = self.codec.decode(&mut scope as &mut dyn io::Read)?;
        scope.exit()?;

        tracing::trace!(name = %self.lock.name(), "Item consumed");
        Ok(item)
    }

    fn ensure_mode(&self, expected: ChannelMode, operation: &'static str) -> ShareResult<()> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(ShareError::ModeViolation {
                operation,
                mode: self.mode,
            })
        }
    }

    /// Release the mapping and, if `unlink` is set, remove the region, its
    /// lock and the ready semaphore. Repeatable.
    pub fn teardown(&mut self, unlink: bool) -> ShareResult<()> {
        self.torn_down = true;
        let lock = self.lock.teardown(unlink);
        let ready = if unlink {
            swallow_gone(NamedSemaphore::unlink(self.ready.name()))
        } else {
            Ok(())
        };
        first_error([lock, ready])
    }

    /// Remove a channel's objects by name.
    pub fn unlink(name: &ObjectName) -> ShareResult<()> {
        let ready_name = name.derive(READY_SUFFIX)?;
        first_error([
            ExclusiveLock::unlink(name),
            swallow_gone(NamedSemaphore::unlink(&ready_name)),
        ])
    }
}

impl<C: Codec> Drop for Channel<C> {
    fn drop(&mut self) {
        if self.torn_down || !self.ownership.is_owner() {
            return;
        }
        if let Err(e) = swallow_gone(NamedSemaphore::unlink(self.ready.name())) {
            tracing::error!(name = %self.ready.name(), error = %e, "Failed to unlink ready semaphore");
        }
    }
}
