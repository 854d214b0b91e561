// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Cross-process synchronization primitives.
//!
//! Named semaphores, the release doorbell used by reader/writer locks,
//! and the per-handle lock state machine.

mod notifier;
mod semaphore;
mod state;

pub use notifier::ReleaseNotifier;
pub use semaphore::NamedSemaphore;
pub use state::{ExclusiveHold, HoldKind, LockPhase, RwHold};

pub(crate) use state::LockState;
