// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Kernel configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "nefcore.toml";

/// Kernel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Segment count for curved primitives that do not set one
    pub default_resolution: u32,
    /// Evaluate independent sibling subtrees on the rayon pool
    pub parallel: bool,
    /// Short-circuit Booleans on operands with disjoint bounding volumes
    pub bbox_fast_path: bool,
    /// Abort any operation whose result would exceed this many convex cells
    pub max_cells: Option<usize>,
    /// Warn before a Minkowski sum with more cell pairs than this
    pub minkowski_warn_pairs: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            default_resolution: 32,
            parallel: true,
            bbox_fast_path: true,
            max_cells: None,
            minkowski_warn_pairs: 10_000,
        }
    }
}

impl KernelConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: KernelConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `nefcore.toml` if present, then apply `NEFCORE_*` overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// [`KernelConfig::load`]).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("NEFCORE_RESOLUTION") {
            self.default_resolution = value
                .parse()
                .with_context(|| format!("Invalid NEFCORE_RESOLUTION: {value}"))?;
        }

        if let Some(value) = lookup("NEFCORE_PARALLEL") {
            self.parallel = value
                .parse()
                .with_context(|| format!("Invalid NEFCORE_PARALLEL: {value}"))?;
        }

        if let Some(value) = lookup("NEFCORE_BBOX_FAST_PATH") {
            self.bbox_fast_path = value
                .parse()
                .with_context(|| format!("Invalid NEFCORE_BBOX_FAST_PATH: {value}"))?;
        }

        if let Some(value) = lookup("NEFCORE_MAX_CELLS") {
            self.max_cells = if value.is_empty() || value == "none" {
                None
            } else {
                Some(
                    value
                        .parse()
                        .with_context(|| format!("Invalid NEFCORE_MAX_CELLS: {value}"))?,
                )
            };
        }

        if let Some(value) = lookup("NEFCORE_MINKOWSKI_WARN_PAIRS") {
            self.minkowski_warn_pairs = value
                .parse()
                .with_context(|| format!("Invalid NEFCORE_MINKOWSKI_WARN_PAIRS: {value}"))?;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nefcore.toml");

        let config = KernelConfig {
            default_resolution: 12,
            max_cells: Some(500),
            ..KernelConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = KernelConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: KernelConfig = toml::from_str("parallel = false").unwrap();
        assert!(!config.parallel);
        assert_eq!(config.default_resolution, 32);
        assert!(config.bbox_fast_path);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("NEFCORE_BBOX_FAST_PATH", "false"),
            ("NEFCORE_MAX_CELLS", "64"),
        ]
        .into_iter()
        .collect();

        let mut config = KernelConfig::default();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert!(!config.bbox_fast_path);
        assert_eq!(config.max_cells, Some(64));

        let bad: HashMap<&str, &str> = [("NEFCORE_RESOLUTION", "lots")].into_iter().collect();
        assert!(config
            .apply_env(|key| bad.get(key).map(|v| v.to_string()))
            .is_err());
    }
}
