// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! ioshare Core Library
//!
//! Named POSIX shared memory for cooperating processes. Provides raw
//! regions, regions guarded by an exclusive lock or a reader/writer lock,
//! single-slot producer/consumer channels, and YAML configuration of the
//! regions a deployment shares.

pub mod channel;
pub mod config;
pub mod error;
pub mod lock;
pub mod shm;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use channel::{Channel, ChannelMode, Codec, FrameCodec, JsonCodec};
pub use config::{Config, ConfigLoader, Defaults, RegionConfig};
pub use error::{
    CodecError, HardValidationError, SemaphoreError, ShareError, ShareResult, ShmError,
};
pub use lock::{ExclusiveLock, ExclusiveScope, GuardedRegion, ReaderWriterLock, RwScope};
pub use shm::Region;
pub use sync::{ExclusiveHold, HoldKind, LockPhase, RwHold};
pub use types::{Capacity, MaxReaders, ObjectName, Ownership};
