// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `ioshare unlink` command - Remove a region's objects from the namespace.

use ioshare_core::{Channel, FrameCodec, ObjectName, ReaderWriterLock};

pub fn execute(name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let name = ObjectName::new(name)?;
    tracing::info!(name = %name, "Unlinking region");

    // Objects that were never created are skipped.
    Channel::<FrameCodec>::unlink(&name)?;
    ReaderWriterLock::unlink(&name)?;

    println!("✓ Removed {} and its semaphores", name);
    Ok(())
}
