// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `ioshare produce` / `ioshare consume` commands - Channel endpoints.

use std::fs::OpenOptions;
use std::io::Write;

use ioshare_core::{Capacity, Channel, ChannelMode, FrameCodec};

use super::target::{resolve, Target};

fn open(target: &Target, mode: ChannelMode) -> ioshare_core::ShareResult<Channel<FrameCodec>> {
    Channel::with_codec(
        &target.name,
        target.capacity,
        mode,
        target.ownership,
        FrameCodec,
    )
}

pub fn produce(
    config_path: &str,
    name: &str,
    message: Option<String>,
    file: Option<String>,
    size: Option<Capacity>,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload = match (message, file) {
        (Some(message), _) => message.into_bytes(),
        (None, Some(path)) => std::fs::read(&path)?,
        (None, None) => return Err("either --message or --file is required".into()),
    };

    let target = resolve(config_path, name, size)?;
    let mut channel = open(&target, ChannelMode::Producer)?;
    channel.produce(&payload)?;

    tracing::info!(name = %target.name, bytes = payload.len(), "Produced item");
    Ok(())
}

pub fn consume(
    config_path: &str,
    name: &str,
    size: Option<Capacity>,
    count: usize,
    out: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = resolve(config_path, name, size)?;
    let mut channel = open(&target, ChannelMode::Consumer)?;

    let separate_lines = out.is_none();
    let mut sink: Box<dyn Write> = match &out {
        Some(path) => Box::new(OpenOptions::new().create(true).append(true).open(path)?),
        None => Box::new(std::io::stdout().lock()),
    };

    for received in 1..=count {
        let item = channel.consume()?;
        tracing::debug!(name = %target.name, bytes = item.len(), received = received, "Consumed item");

        sink.write_all(&item)?;
        if separate_lines {
            sink.write_all(b"\n")?;
        }
        sink.flush()?;
    }

    tracing::info!(name = %target.name, count = count, "Consume finished");
    Ok(())
}
