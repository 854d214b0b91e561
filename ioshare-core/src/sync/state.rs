// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Per-handle lock state.
//!
//! Two flags per handle: "the next scope entry should acquire" (armed) and
//! "currently inside a scope". Guarded operations proceed only when both
//! are set for the hold they need.
//!
//! Lifecycle: Idle → Armed → Held → Idle, or Idle → Passthrough → Idle
//! when a scope is entered without arming first.

use std::fmt;

use crate::types::ObjectName;

/// A kind of hold a lock handle can arm and acquire.
pub trait HoldKind: Copy + Eq + fmt::Debug + fmt::Display {
    /// Check if this hold permits guarded reads.
    fn permits_read(&self) -> bool;

    /// Check if this hold permits guarded writes.
    fn permits_write(&self) -> bool;
}

/// The single binary semaphore of an exclusive lock. Permits both reads
/// and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusiveHold;

impl HoldKind for ExclusiveHold {
    fn permits_read(&self) -> bool {
        true
    }

    fn permits_write(&self) -> bool {
        true
    }
}

impl fmt::Display for ExclusiveHold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Exclusive")
    }
}

/// What a reader/writer scope holds once its acquisition succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RwHold {
    /// One unit of reader admission.
    Read,
    /// The writer mutex with no readers outstanding.
    Write,
}

impl RwHold {
    /// Get the hold name for logs and errors.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Read => "Read",
            Self::Write => "Write",
        }
    }
}

impl HoldKind for RwHold {
    fn permits_read(&self) -> bool {
        matches!(self, Self::Read)
    }

    fn permits_write(&self) -> bool {
        matches!(self, Self::Write)
    }
}

impl fmt::Display for RwHold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Observable phase of a lock handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPhase<H> {
    /// Not armed, not in a scope.
    Idle,
    /// A lock was requested; the next scope entry acquires it.
    Armed(H),
    /// Inside a scope holding the lock.
    Held(H),
    /// Inside a scope entered without a request. Nothing is held and no
    /// guarded operation is permitted.
    Passthrough,
}

impl<H> LockPhase<H> {
    /// Get the phase name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Armed(_) => "Armed",
            Self::Held(_) => "Held",
            Self::Passthrough => "Passthrough",
        }
    }
}

impl<H: fmt::Display> fmt::Display for LockPhase<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Armed(hold) | Self::Held(hold) => write!(f, "{}({})", self.name(), hold),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// The two flags guarding one lock handle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LockState<H> {
    in_scope: bool,
    armed: Option<H>,
}

impl<H> Default for LockState<H> {
    fn default() -> Self {
        Self {
            in_scope: false,
            armed: None,
        }
    }
}

impl<H: HoldKind> LockState<H> {
    /// Arm the next scope entry. A later request replaces an earlier one.
    pub(crate) fn arm(&mut self, hold: H, name: &ObjectName) {
        let from = self.phase();
        self.armed = Some(hold);
        tracing::trace!(name = %name, from = %from, to = %self.phase(), "Lock state transition");
    }

    /// Mark the scope active and return the hold to acquire, if armed.
    pub(crate) fn enter(&mut self, name: &ObjectName) -> Option<H> {
        let from = self.phase();
        self.in_scope = true;
        tracing::trace!(name = %name, from = %from, to = %self.phase(), "Lock state transition");
        self.armed
    }

    /// Leave the scope and disarm.
    pub(crate) fn exit(&mut self, name: &ObjectName) {
        let from = self.phase();
        self.in_scope = false;
        self.armed = None;
        tracing::trace!(name = %name, from = %from, to = %self.phase(), "Lock state transition");
    }

    /// Both flags set and the armed hold allows reading.
    pub(crate) fn permits_read(&self) -> bool {
        self.in_scope && self.armed.is_some_and(|hold| hold.permits_read())
    }

    /// Both flags set and the armed hold allows writing.
    pub(crate) fn permits_write(&self) -> bool {
        self.in_scope && self.armed.is_some_and(|hold| hold.permits_write())
    }

    pub(crate) fn phase(&self) -> LockPhase<H> {
        match (self.in_scope, self.armed) {
            (false, None) => LockPhase::Idle,
            (false, Some(hold)) => LockPhase::Armed(hold),
            (true, Some(hold)) => LockPhase::Held(hold),
            (true, None) => LockPhase::Passthrough,
        }
    }
}
