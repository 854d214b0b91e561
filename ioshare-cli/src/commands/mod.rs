// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! CLI command modules.

pub mod channel;
pub mod pingpong;
pub mod read;
pub mod target;
pub mod unlink;
pub mod validate;
pub mod write;
