// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! `ioshare validate` command - Validate configuration file.

use ioshare_core::ConfigLoader;

pub fn execute(file: &str) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(file = %file, "Validating configuration");

    match ConfigLoader::load_file(file) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Defaults:");
            println!("  Max Readers: {}", config.defaults.max_readers);
            println!("  Owner:       {}", config.defaults.ownership.is_owner());
            println!();
            println!("Regions ({}):", config.regions.len());
            for region in &config.regions {
                println!(
                    "  - {} (size: {}, max_readers: {}, owner: {})",
                    region.name,
                    region.capacity,
                    region.max_readers,
                    region.ownership.is_owner()
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed:");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    }
}
