// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Producer/consumer channels built on exclusive regions.

pub mod codec;
mod handoff;

pub use codec::{Codec, FrameCodec, JsonCodec};
pub use handoff::{Channel, ChannelMode};
