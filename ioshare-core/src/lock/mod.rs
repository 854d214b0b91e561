// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Guarded access to regions.
//!
//! Read and write capability comes from holding a scope returned by a lock
//! acquisition. The lock handles themselves also implement
//! [`GuardedRegion`], and every read or write through them fails, because
//! a handle with a live scope is mutably borrowed by it.

mod exclusive;
mod guarded;
mod rw;

pub use exclusive::{ExclusiveLock, ExclusiveScope};
pub use guarded::GuardedRegion;
pub use rw::{ReaderWriterLock, RwScope};
