// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! YAML configuration parser with strict schema validation.
//!
//! Describes the named regions a deployment shares, so every process agrees
//! on sizes and reader limits. Any invalid field results in a
//! HardValidationError before a single OS object is touched.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::{HardValidationError, ShareError, ShareResult};
use crate::types::{Capacity, MaxReaders, ObjectName, Ownership, RawSize};

/// Raw region entry as parsed from YAML (before validation).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRegionConfig {
    name: String,
    size: RawSize,
    #[serde(default)]
    max_readers: Option<u64>,
    #[serde(default)]
    owner: Option<bool>,
}

/// Raw defaults block.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDefaults {
    #[serde(default = "default_max_readers")]
    max_readers: u64,
    #[serde(default)]
    owner: bool,
}

fn default_max_readers() -> u64 {
    MaxReaders::default().value() as u64
}

impl Default for RawDefaults {
    fn default() -> Self {
        Self {
            max_readers: default_max_readers(),
            owner: false,
        }
    }
}

/// Raw root configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    defaults: RawDefaults,
    regions: Vec<RawRegionConfig>,
}

/// Values applied to regions that do not set their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Defaults {
    pub max_readers: MaxReaders,
    pub ownership: Ownership,
}

/// Validated region configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionConfig {
    pub name: ObjectName,
    pub capacity: Capacity,
    pub max_readers: MaxReaders,
    pub ownership: Ownership,
}

/// Complete validated configuration.
#[derive(Debug)]
pub struct Config {
    pub defaults: Defaults,
    pub regions: Vec<RegionConfig>,
}

impl Config {
    /// Look up a region by name. The leading `/` is optional.
    pub fn region(&self, name: &str) -> Option<&RegionConfig> {
        let wanted = ObjectName::new(name).ok()?;
        self.regions.iter().find(|r| r.name == wanted)
    }
}

/// Configuration loader with strict validation.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate configuration from a YAML file.
    /// Returns HardValidationError for any invalid fields.
    pub fn load_file(path: impl AsRef<Path>) -> ShareResult<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ShareError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ShareError::Io {
            context: "reading config file",
            source: e,
        })?;

        Self::load_string(&content)
    }

    /// Load and validate configuration from a YAML string.
    pub fn load_string(content: &str) -> ShareResult<Config> {
        let raw: RawConfig =
            serde_yaml::from_str(content).map_err(|e| ShareError::ConfigParse {
                message: format!("YAML parse error: {}", e),
            })?;

        Self::validate(raw)
    }

    fn validate(raw: RawConfig) -> ShareResult<Config> {
        let defaults = Self::validate_defaults(raw.defaults)?;

        if raw.regions.is_empty() {
            return Err(HardValidationError::SchemaValidation {
                message: "At least one region must be defined".to_string(),
            }
            .into());
        }

        let mut regions = Vec::with_capacity(raw.regions.len());
        let mut seen = HashSet::new();

        for (index, raw_region) in raw.regions.into_iter().enumerate() {
            let region = Self::validate_region(raw_region, index, &defaults)?;

            if !seen.insert(region.name.clone()) {
                return Err(HardValidationError::DuplicateRegionName {
                    name: region.name.to_string(),
                }
                .into());
            }

            regions.push(region);
        }

        tracing::debug!(regions = regions.len(), "Configuration validated");
        Ok(Config { defaults, regions })
    }

    fn validate_defaults(raw: RawDefaults) -> ShareResult<Defaults> {
        let max_readers = MaxReaders::try_from(raw.max_readers).map_err(|e| {
            HardValidationError::InvalidFieldValue {
                field: "defaults.max_readers",
                value: raw.max_readers.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Defaults {
            max_readers,
            ownership: Ownership::from_flag(raw.owner),
        })
    }

    fn validate_region(
        raw: RawRegionConfig,
        index: usize,
        defaults: &Defaults,
    ) -> ShareResult<RegionConfig> {
        let name = ObjectName::new(raw.name.as_str()).map_err(|e| {
            HardValidationError::InvalidFieldValue {
                field: "name",
                value: format!("'{}' in region at index {}", raw.name, index),
                reason: e.to_string(),
            }
        })?;

        let capacity = Capacity::try_from(raw.size).map_err(|e| {
            HardValidationError::InvalidFieldValue {
                field: "size",
                value: format!("region {}", name),
                reason: e.to_string(),
            }
        })?;

        let max_readers = match raw.max_readers {
            Some(value) => MaxReaders::try_from(value).map_err(|e| {
                HardValidationError::InvalidFieldValue {
                    field: "max_readers",
                    value: format!("{} in region {}", value, name),
                    reason: e.to_string(),
                }
            })?,
            None => defaults.max_readers,
        };

        let ownership = raw
            .owner
            .map(Ownership::from_flag)
            .unwrap_or(defaults.ownership);

        Ok(RegionConfig {
            name,
            capacity,
            max_readers,
            ownership,
        })
    }
}
