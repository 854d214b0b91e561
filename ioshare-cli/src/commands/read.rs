// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `ioshare read` command - Print bytes from a region.
//!
//! Takes the exclusive lock by default, or a shared read hold with
//! `--shared` so several readers can run at once. A shared read is only
//! kept out by `write --shared`, never by an exclusive-lock write.

use std::io::Write;

use ioshare_core::{Capacity, ExclusiveLock, GuardedRegion, ReaderWriterLock, ShareResult};

use super::target::resolve;

pub fn execute(
    config_path: &str,
    name: &str,
    size: Option<Capacity>,
    offset: usize,
    len: Option<usize>,
    line: bool,
    shared: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = resolve(config_path, name, size)?;
    tracing::debug!(name = %target.name, offset = offset, shared = shared, "Reading region");

    let data = if shared {
        let mut shm = ReaderWriterLock::open(
            &target.name,
            target.capacity,
            target.max_readers,
            target.ownership,
        )?;
        let mut scope = shm.read_lock()?;
        let data = read_from(&mut scope, offset, len, line)?;
        scope.exit()?;
        data
    } else {
        let mut shm = ExclusiveLock::open(&target.name, target.capacity, target.ownership)?;
        let mut scope = shm.lock()?;
        let data = read_from(&mut scope, offset, len, line)?;
        scope.exit()?;
        data
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&data)?;
    if !data.ends_with(b"\n") {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}

fn read_from(
    region: &mut impl GuardedRegion,
    offset: usize,
    len: Option<usize>,
    line: bool,
) -> ShareResult<Vec<u8>> {
    region.seek(offset)?;
    if line {
        return region.read_line();
    }
    match len {
        Some(len) => region.read(len),
        None => {
            let mut data = region.read_to_end()?;
            // Unwritten space is zero filled.
            while data.last() == Some(&0) {
                data.pop();
            }
            Ok(data)
        }
    }
}
