// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Newtype wrappers for validated inputs.
//!
//! Object names, capacities and reader limits are validated once at
//! construction. Everything downstream can rely on them being well formed.

use std::ffi::CString;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HardValidationError;

/// Longest accepted name including the leading slash. Leaves room for the
/// `sem.` prefix Linux adds and for derived suffixes such as `_write`.
const MAX_NAME_LEN: usize = 240;

/// Upper bound on reader admission, the POSIX minimum for `SEM_VALUE_MAX`.
const MAX_READERS_LIMIT: u32 = 32_767;

/// Default reader admission count.
const DEFAULT_MAX_READERS: u32 = 1000;

/// Validated name of a POSIX shared memory object or semaphore.
///
/// Always starts with exactly one `/`; a missing slash is added. Names
/// containing a second `/`, a NUL byte, or nothing after the slash are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectName {
    name: String,
    c_name: CString,
}

impl ObjectName {
    /// Create a new ObjectName with validation.
    pub fn new(name: impl Into<String>) -> Result<Self, HardValidationError> {
        let raw = name.into();
        let name = if raw.starts_with('/') {
            raw.clone()
        } else {
            format!("/{}", raw)
        };

        let invalid = |reason: &str| HardValidationError::InvalidName {
            name: raw.clone(),
            reason: reason.to_string(),
        };

        if name.len() <= 1 {
            return Err(invalid("Name cannot be empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(invalid(&format!(
                "Name too long: {} chars (max {})",
                name.len(),
                MAX_NAME_LEN
            )));
        }
        if name[1..].contains('/') {
            return Err(invalid("Name may only contain a leading slash"));
        }

        let c_name = CString::new(name.as_str()).map_err(|_| invalid("Name contains a NUL byte"))?;

        Ok(Self { name, c_name })
    }

    /// Name of an object derived from this one, e.g. `/r1` -> `/r1_write`.
    pub fn derive(&self, suffix: &str) -> Result<Self, HardValidationError> {
        Self::new(format!("{}{}", self.name, suffix))
    }

    /// Get the name including its leading slash.
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Get the NUL-terminated form passed to libc.
    pub fn as_c_str(&self) -> &std::ffi::CStr {
        &self.c_name
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl TryFrom<String> for ObjectName {
    type Error = HardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ObjectName {
    type Error = HardValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectName> for String {
    fn from(name: ObjectName) -> Self {
        name.name
    }
}

/// Size accepted from configuration: a plain byte count or a size string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawSize {
    Bytes(u64),
    Text(String),
}

/// Validated region capacity in bytes. Never zero.
///
/// Parses from a decimal byte count (`"15"`) or a count with a binary unit
/// suffix: `K` (2^10), `M` (2^20) or `G` (2^30), e.g. `"5M"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSize", into = "u64")]
pub struct Capacity(usize);

impl Capacity {
    /// Create a new Capacity with validation.
    pub fn new(bytes: usize) -> Result<Self, HardValidationError> {
        if bytes == 0 {
            return Err(HardValidationError::InvalidSize {
                value: "0".to_string(),
                reason: "Capacity must be greater than 0".to_string(),
            });
        }
        Ok(Self(bytes))
    }

    /// Get the capacity in bytes.
    pub fn bytes(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: [(usize, &str); 3] = [(1 << 30, "G"), (1 << 20, "M"), (1 << 10, "K")];
        for (factor, suffix) in UNITS {
            if self.0 % factor == 0 {
                return write!(f, "{}{}", self.0 / factor, suffix);
            }
        }
        write!(f, "{}", self.0)
    }
}

impl FromStr for Capacity {
    type Err = HardValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = |reason: &str| HardValidationError::InvalidSize {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let (digits, multiplier) = match text.chars().last() {
            Some('K') | Some('k') => (&text[..text.len() - 1], 1u64 << 10),
            Some('M') | Some('m') => (&text[..text.len() - 1], 1u64 << 20),
            Some('G') | Some('g') => (&text[..text.len() - 1], 1u64 << 30),
            Some(_) => (text, 1u64),
            None => return Err(invalid("Size cannot be empty")),
        };

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("Expected a decimal integer with optional K/M/G suffix"));
        }

        let count: u64 = digits.parse().map_err(|_| invalid("Number out of range"))?;
        let bytes = count
            .checked_mul(multiplier)
            .and_then(|b| usize::try_from(b).ok())
            .ok_or_else(|| invalid("Size overflows the address space"))?;

        Self::new(bytes).map_err(|_| invalid("Capacity must be greater than 0"))
    }
}

impl TryFrom<RawSize> for Capacity {
    type Error = HardValidationError;

    fn try_from(value: RawSize) -> Result<Self, Self::Error> {
        match value {
            RawSize::Bytes(bytes) => {
                let bytes = usize::try_from(bytes).map_err(|_| HardValidationError::InvalidSize {
                    value: bytes.to_string(),
                    reason: "Size overflows the address space".to_string(),
                })?;
                Self::new(bytes)
            }
            RawSize::Text(text) => text.parse(),
        }
    }
}

impl TryFrom<usize> for Capacity {
    type Error = HardValidationError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Capacity> for u64 {
    fn from(capacity: Capacity) -> Self {
        capacity.0 as u64
    }
}

/// Validated number of concurrent readers admitted by a reader/writer lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u32")]
pub struct MaxReaders(u32);

impl MaxReaders {
    /// Create a new MaxReaders with bounds validation.
    pub fn new(value: u32) -> Result<Self, HardValidationError> {
        if value == 0 || value > MAX_READERS_LIMIT {
            return Err(HardValidationError::ReaderLimitOutOfBounds {
                value: value as u64,
                max: MAX_READERS_LIMIT,
            });
        }
        Ok(Self(value))
    }

    /// Get the inner value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Default for MaxReaders {
    fn default() -> Self {
        Self(DEFAULT_MAX_READERS)
    }
}

impl fmt::Display for MaxReaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for MaxReaders {
    type Error = HardValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        let narrowed = u32::try_from(value).map_err(|_| HardValidationError::ReaderLimitOutOfBounds {
            value,
            max: MAX_READERS_LIMIT,
        })?;
        Self::new(narrowed)
    }
}

impl From<MaxReaders> for u32 {
    fn from(readers: MaxReaders) -> Self {
        readers.0
    }
}

/// Which handle removes named objects from the OS namespace on drop.
///
/// Named objects are global; unlinking from one process affects every other
/// process attached to the same name. Exactly one participant should be
/// constructed as `Owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
    /// Unlink every named object when the handle is dropped.
    Owner,
    /// Leave named objects in place for other processes.
    #[default]
    Attached,
}

impl Ownership {
    /// Build from a boolean "is owner" flag.
    pub fn from_flag(owner: bool) -> Self {
        if owner {
            Self::Owner
        } else {
            Self::Attached
        }
    }

    /// Check if this handle is responsible for unlinking.
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }
}
