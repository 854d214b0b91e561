// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `ioshare write` command - Write bytes into a region.
//!
//! Takes the exclusive lock by default, or the reader/writer write hold
//! with `--shared`. Only a `--shared` write keeps `read --shared` readers
//! out; the two lock kinds use separate semaphores.

use ioshare_core::{Capacity, ExclusiveLock, GuardedRegion, ReaderWriterLock, Region, ShareResult};

use super::target::resolve;

pub fn execute(
    config_path: &str,
    name: &str,
    data: &[u8],
    size: Option<Capacity>,
    offset: usize,
    raw: bool,
    shared: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = resolve(config_path, name, size)?;
    tracing::info!(
        name = %target.name,
        bytes = data.len(),
        offset = offset,
        raw = raw,
        shared = shared,
        "Writing region"
    );

    let written = if raw {
        let mut region = Region::open(&target.name, target.capacity, target.ownership)?;
        region.seek(offset)?;
        let written = region.write(data)?;
        region.flush()?;
        written
    } else if shared {
        let mut shm = ReaderWriterLock::open(
            &target.name,
            target.capacity,
            target.max_readers,
            target.ownership,
        )?;
        let mut scope = shm.write_lock()?;
        let written = write_at(&mut scope, offset, data)?;
        scope.exit()?;
        written
    } else {
        let mut shm = ExclusiveLock::open(&target.name, target.capacity, target.ownership)?;
        let mut scope = shm.lock()?;
        let written = write_at(&mut scope, offset, data)?;
        scope.exit()?;
        written
    };

    println!(
        "✓ Wrote {} bytes to {} at offset {}",
        written, target.name, offset
    );
    Ok(())
}

fn write_at(region: &mut impl GuardedRegion, offset: usize, data: &[u8]) -> ShareResult<usize> {
    region.seek(offset)?;
    let written = region.write(data)?;
    region.flush()?;
    Ok(written)
}
