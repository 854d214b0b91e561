// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Shared Memory module.
//!
//! POSIX shared memory objects (`Mapping`) and the cursor-based `Region`
//! built on them. No access control lives here.

mod mapping;
mod region;

pub use mapping::Mapping;
pub use region::Region;
