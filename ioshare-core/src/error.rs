// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Custom error types for ioshare.
//!
//! Every failure is an explicit enum variant. Callers distinguish
//! "out of capacity" from "no lock held" by matching on the variant,
//! never on the rendered message.

use std::path::PathBuf;

use thiserror::Error;

use crate::channel::ChannelMode;

/// Top-level error type for every guarded shared memory operation.
#[derive(Debug, Error)]
pub enum ShareError {
    // =========================================================================
    // Access Discipline - Surfaced Synchronously, Never Retried
    // =========================================================================
    #[error("Read from memory without lock is not permitted: {name}")]
    ReadAccess { name: String },

    #[error("Write to memory without lock is not permitted: {name}")]
    WriteAccess { name: String },

    #[error(
        "Out of shared memory in {name}: {requested} bytes requested, {available} available. Try increasing the size"
    )]
    CapacityExceeded {
        name: String,
        requested: usize,
        available: usize,
    },

    #[error("Offset {offset} is outside region {name} (capacity {capacity})")]
    InvalidOffset {
        name: String,
        offset: usize,
        capacity: usize,
    },

    #[error("Operation '{operation}' is not allowed on a channel in {mode} mode")]
    ModeViolation {
        operation: &'static str,
        mode: ChannelMode,
    },

    // =========================================================================
    // Input Validation - Names, Sizes, Configuration
    // =========================================================================
    #[error("Hard validation error: {0}")]
    HardValidation(#[from] HardValidationError),

    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    // =========================================================================
    // OS Primitives
    // =========================================================================
    #[error("Shared memory error: {0}")]
    SharedMemory(#[from] ShmError),

    #[error("Semaphore error: {0}")]
    Semaphore(#[from] SemaphoreError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("IO error: {context} - {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid input rejected before any OS object is touched.
#[derive(Debug, Error)]
pub enum HardValidationError {
    #[error("Invalid object name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid size '{value}': {reason}")]
    InvalidSize { value: String, reason: String },

    #[error("Reader limit out of bounds: {value} (min: 1, max: {max})")]
    ReaderLimitOutOfBounds { value: u64, max: u32 },

    #[error("Invalid field value: {field} = {value} - {reason}")]
    InvalidFieldValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Duplicate region name: {name}")]
    DuplicateRegionName { name: String },

    #[error("Schema validation failed: {message}")]
    SchemaValidation { message: String },
}

/// Named shared object failures (memory objects and semaphore names).
#[derive(Debug, Error)]
pub enum ShmError {
    #[error("Failed to create or attach shared memory: {name} - {reason}")]
    CreateFailed { name: String, reason: String },

    #[error("Failed to map shared memory {name}: {reason}")]
    MapFailed { name: String, reason: String },

    #[error("Failed to flush shared memory {name}: {reason}")]
    FlushFailed { name: String, reason: String },

    #[error("Failed to unlink {name}: {reason}")]
    UnlinkFailed { name: String, reason: String },

    /// The named object was already removed from the namespace.
    /// Teardown paths swallow this.
    #[error("Named object already removed: {name}")]
    ResourceAlreadyGone { name: String },

    #[error("Region {name} has been torn down")]
    Closed { name: String },
}

/// Named semaphore failures.
#[derive(Debug, Error)]
pub enum SemaphoreError {
    #[error("Failed to open semaphore {name}: {reason}")]
    OpenFailed { name: String, reason: String },

    #[error("Failed to acquire semaphore {name}: {reason}")]
    AcquireFailed { name: String, reason: String },

    #[error("Failed to release semaphore {name}: {reason}")]
    ReleaseFailed { name: String, reason: String },

    #[error("Failed to read value of semaphore {name}: {reason}")]
    ValueFailed { name: String, reason: String },
}

/// Payload encoding and decoding failures.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid frame magic: expected {expected:#010x}, got {actual:#010x}")]
    BadMagic { expected: u32, actual: u32 },

    #[error("Payload checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("Payload too large for frame: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Truncated frame: {reason}")]
    Truncated { reason: String },

    #[error("Frame read failed: {0}")]
    Read(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using ShareError.
pub type ShareResult<T> = Result<T, ShareError>;

/// Treat "already removed" from an unlink as success.
///
/// Teardown runs from several processes in no particular order, so a
/// missing name only means someone else got there first.
pub(crate) fn swallow_gone(result: Result<(), ShmError>) -> ShareResult<()> {
    match result {
        Ok(()) => Ok(()),
        Err(ShmError::ResourceAlreadyGone { name }) => {
            tracing::debug!(name = %name, "Named object already removed");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Fold the results of independent cleanup steps, keeping the first error.
///
/// Every step has already run by the time its result is passed in; later
/// failures are logged so none goes unreported.
pub(crate) fn first_error<I>(results: I) -> ShareResult<()>
where
    I: IntoIterator<Item = ShareResult<()>>,
{
    let mut first = Ok(());
    for result in results {
        if let Err(e) = result {
            if first.is_ok() {
                first = Err(e);
            } else {
                tracing::warn!(error = %e, "Additional cleanup failure");
            }
        }
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_error_display() {
        let err = ShareError::CapacityExceeded {
            name: "/r1".to_string(),
            requested: 16,
            available: 15,
        };
        let msg = err.to_string();
        assert!(msg.contains("/r1"));
        assert!(msg.contains("16"));
        assert!(msg.contains("15"));
    }

    #[test]
    fn test_error_chain() {
        let shm_err = ShmError::ResourceAlreadyGone {
            name: "/gone".to_string(),
        };
        let share_err: ShareError = shm_err.into();
        assert!(matches!(
            share_err,
            ShareError::SharedMemory(ShmError::ResourceAlreadyGone { .. })
        ));
    }

    #[test]
    fn test_swallow_gone() {
        let gone = Err(ShmError::ResourceAlreadyGone {
            name: "/gone".to_string(),
        });
        assert!(swallow_gone(gone).is_ok());

        let failed = Err(ShmError::UnlinkFailed {
            name: "/busy".to_string(),
            reason: "EACCES".to_string(),
        });
        assert!(swallow_gone(failed).is_err());
    }

    #[test]
    fn test_first_error_keeps_earliest() {
        assert!(first_error([Ok(()), Ok(())]).is_ok());

        let result = first_error([
            Ok(()),
            swallow_gone(Err(ShmError::UnlinkFailed {
                name: "/region".to_string(),
                reason: "EACCES".to_string(),
            })),
            swallow_gone(Err(ShmError::UnlinkFailed {
                name: "/region_write".to_string(),
                reason: "EACCES".to_string(),
            })),
        ]);
        match result {
            Err(ShareError::SharedMemory(ShmError::UnlinkFailed { name, .. })) => {
                assert_eq!(name, "/region")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_mode_violation_names_mode() {
        let err = ShareError::ModeViolation {
            operation: "produce",
            mode: ChannelMode::Consumer,
        };
        assert!(err.to_string().contains("consumer"));
        assert!(err.to_string().contains("produce"));
    }
}
