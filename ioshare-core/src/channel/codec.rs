// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Payload codecs for channels.
//!
//! A channel only moves bytes; a codec decides what they mean. Codec output
//! must be self-delimiting because the slot is read back from offset 0 with
//! whatever bytes follow it.
//!
//! Frame layout (little endian):
//!
//! | offset | size | field               |
//! |--------|------|---------------------|
//! | 0      | 4    | magic `0x4853_4F49` |
//! | 4      | 4    | payload length      |
//! | 8      | 4    | CRC32 of payload    |
//! | 12     | n    | payload             |

use std::io::{self, Read};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;

/// Frame magic, "IOSH" read as little-endian bytes.
pub const FRAME_MAGIC: u32 = 0x4853_4F49;

/// Header size in bytes (magic + length + checksum).
pub const FRAME_HEADER_SIZE: usize = 12;

/// Largest payload a frame can describe.
pub const MAX_FRAME_PAYLOAD: usize = u32::MAX as usize;

/// Turns items into bytes and back.
pub trait Codec {
    /// The value moved through the channel.
    type Item;

    /// Serialize an item into one self-delimiting buffer.
    fn encode(&self, item: &Self::Item) -> Result<Vec<u8>, CodecError>;

    /// Deserialize one item from the start of `reader`.
    fn decode(&self, reader: &mut dyn Read) -> Result<Self::Item, CodecError>;
}

/// Wrap `payload` in a checksummed frame.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(CodecError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_FRAME_PAYLOAD,
        });
    }

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&FRAME_MAGIC.to_le_bytes());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Read one frame and return its verified payload.
pub fn decode_frame(reader: &mut dyn Read) -> Result<Vec<u8>, CodecError> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    reader.read_exact(&mut header).map_err(|e| truncated_or(e, "header"))?;

    let word = |i: usize| u32::from_le_bytes([header[i], header[i + 1], header[i + 2], header[i + 3]]);
    let magic = word(0);
    let length = word(4) as usize;
    let expected = word(8);

    if magic != FRAME_MAGIC {
        return Err(CodecError::BadMagic {
            expected: FRAME_MAGIC,
            actual: magic,
        });
    }

    // Grow as bytes arrive instead of trusting the length up front.
    let mut payload = Vec::new();
    reader.take(length as u64).read_to_end(&mut payload)?;
    if payload.len() != length {
        return Err(CodecError::Truncated {
            reason: format!("expected {} payload bytes, found {}", length, payload.len()),
        });
    }

    let actual = crc32fast::hash(&payload);
    if actual != expected {
        return Err(CodecError::ChecksumMismatch { expected, actual });
    }

    Ok(payload)
}

fn truncated_or(e: io::Error, what: &str) -> CodecError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        CodecError::Truncated {
            reason: format!("region ends inside the frame {}", what),
        }
    } else {
        CodecError::Read(e)
    }
}

/// Raw bytes in a checksummed frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl Codec for FrameCodec {
    type Item = Vec<u8>;

    fn encode(&self, item: &Vec<u8>) -> Result<Vec<u8>, CodecError> {
        encode_frame(item)
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<Vec<u8>, CodecError> {
        decode_frame(reader)
    }
}

/// Any serde type as JSON inside a checksummed frame.
#[derive(Debug)]
pub struct JsonCodec<T> {
    _item: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self { _item: PhantomData }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> Codec for JsonCodec<T> {
    type Item = T;

    fn encode(&self, item: &T) -> Result<Vec<u8>, CodecError> {
        encode_frame(&serde_json::to_vec(item)?)
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<T, CodecError> {
        let payload = decode_frame(reader)?;
        Ok(serde_json::from_slice(&payload)?)
    }
}
