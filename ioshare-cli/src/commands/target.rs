// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Resolve a region name to everything needed to open it.
//!
//! `--size` wins; otherwise the region must be listed in the configuration
//! file. Reader limits and ownership always come from the configuration
//! when the region is listed there.

use std::path::Path;

use ioshare_core::{Capacity, ConfigLoader, MaxReaders, ObjectName, Ownership, RegionConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("No size known for region '{name}': pass --size or list it in {config}")]
    UnknownSize { name: String, config: String },
}

/// A region ready to be opened.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: ObjectName,
    pub capacity: Capacity,
    pub max_readers: MaxReaders,
    pub ownership: Ownership,
}

/// Resolve `name`, failing if no size is known.
pub fn resolve(
    config_path: &str,
    name: &str,
    size: Option<Capacity>,
) -> Result<Target, Box<dyn std::error::Error>> {
    resolve_or(config_path, name, size, None)
}

/// Resolve `name`, using `fallback` when neither `--size` nor the
/// configuration gives a size.
pub fn resolve_or(
    config_path: &str,
    name: &str,
    size: Option<Capacity>,
    fallback: Option<Capacity>,
) -> Result<Target, Box<dyn std::error::Error>> {
    let name = ObjectName::new(name)?;
    let configured = configured_region(config_path, &name)?;

    let capacity = size
        .or_else(|| configured.as_ref().map(|r| r.capacity))
        .or(fallback)
        .ok_or_else(|| TargetError::UnknownSize {
            name: name.to_string(),
            config: config_path.to_string(),
        })?;

    let target = match configured {
        Some(region) => Target {
            name,
            capacity,
            max_readers: region.max_readers,
            ownership: region.ownership,
        },
        None => Target {
            name,
            capacity,
            max_readers: MaxReaders::default(),
            ownership: Ownership::Attached,
        },
    };

    tracing::debug!(
        name = %target.name,
        capacity = %target.capacity,
        max_readers = %target.max_readers,
        ownership = ?target.ownership,
        "Resolved region"
    );
    Ok(target)
}

/// Look the region up in the configuration file. A missing file is not an
/// error; an invalid one is.
fn configured_region(
    config_path: &str,
    name: &ObjectName,
) -> Result<Option<RegionConfig>, Box<dyn std::error::Error>> {
    if !Path::new(config_path).exists() {
        tracing::debug!(config = %config_path, "No configuration file, using command-line values");
        return Ok(None);
    }

    let config = ConfigLoader::load_file(config_path)?;
    Ok(config.region(name.as_str()).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_size_flag_without_config() {
        let target = resolve("/nonexistent/ioshare.yaml", "r1", Some(Capacity::new(15).unwrap()))
            .unwrap();
        assert_eq!(target.name.as_str(), "/r1");
        assert_eq!(target.capacity.bytes(), 15);
        assert_eq!(target.ownership, Ownership::Attached);
    }

    #[test]
    fn test_missing_size() {
        assert!(resolve("/nonexistent/ioshare.yaml", "r1", None).is_err());
        let target = resolve_or(
            "/nonexistent/ioshare.yaml",
            "r1",
            None,
            Some(Capacity::new(64).unwrap()),
        )
        .unwrap();
        assert_eq!(target.capacity.bytes(), 64);
    }

    #[test]
    fn test_config_supplies_size() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "regions:\n  - name: /frames\n    size: 2K\n    max_readers: 3").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let target = resolve(&path, "frames", None).unwrap();
        assert_eq!(target.capacity.bytes(), 2048);
        assert_eq!(target.max_readers.value(), 3);

        let target = resolve(&path, "frames", Some(Capacity::new(10).unwrap())).unwrap();
        assert_eq!(target.capacity.bytes(), 10);
        assert_eq!(target.max_readers.value(), 3);

        assert!(resolve(&path, "unlisted", None).is_err());
    }
}
