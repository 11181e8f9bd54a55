//! Configuration file handling for chanmap.
//!
//! This crate provides configuration loading from `.chanmap.toml` files
//! with support for merging and conversion into the runtime
//! [`EngineOptions`] used by the rule engine and the views.
//!
//! # Example
//!
//! ```
//! use chanmap_config::{Config, load_config};
//! use std::path::Path;
//!
//! // Load config from a directory (looks for .chanmap.toml)
//! let config = load_config(Path::new(".")).expect("load config");
//! let options = config.engine_options().expect("options");
//! assert!(options.min_progressive_percentage >= 1);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chanmap_types::EngineOptions;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Default configuration file name
pub const CONFIG_FILE: &str = ".chanmap.toml";

/// Get the config file path for a directory
pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// Complete chanmap configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub progressive: ProgressiveConfig,
    #[serde(default)]
    pub branches: BranchConfig,
    #[serde(default)]
    pub available: AvailableConfig,
    #[serde(default)]
    pub commit: CommitConfig,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert into the options consumed by the rule engine and the views.
    pub fn engine_options(&self) -> Result<EngineOptions> {
        let min = self.progressive.min_percentage;
        if !(1..=100).contains(&min) {
            bail!("progressive.min_percentage must be within 1..=100, got {min}");
        }

        Ok(EngineOptions {
            min_progressive_percentage: min,
            branch_lifetime: to_delta(self.branches.lifetime, "branches.lifetime")?,
            recent_window: to_delta(self.available.recent_window, "available.recent_window")?,
        })
    }

    /// Merge this config with another (other takes precedence)
    pub fn merge(&self, other: &Config) -> Config {
        let defaults = Config::default();
        Config {
            progressive: ProgressiveConfig {
                min_percentage: if other.progressive != defaults.progressive {
                    other.progressive.min_percentage
                } else {
                    self.progressive.min_percentage
                },
            },
            branches: BranchConfig {
                lifetime: if other.branches != defaults.branches {
                    other.branches.lifetime
                } else {
                    self.branches.lifetime
                },
            },
            available: AvailableConfig {
                recent_window: if other.available.recent_window != defaults.available.recent_window
                {
                    other.available.recent_window
                } else {
                    self.available.recent_window
                },
                default_filter: if other.available.default_filter
                    != defaults.available.default_filter
                {
                    other.available.default_filter
                } else {
                    self.available.default_filter
                },
            },
            commit: CommitConfig {
                endpoint: other.commit.endpoint.clone().or(self.commit.endpoint.clone()),
                snap: other.commit.snap.clone().or(self.commit.snap.clone()),
                timeout: if other.commit.timeout != defaults.commit.timeout {
                    other.commit.timeout
                } else {
                    self.commit.timeout
                },
            },
        }
    }
}

fn to_delta(duration: Duration, key: &str) -> Result<TimeDelta> {
    TimeDelta::from_std(duration).with_context(|| format!("{key} is out of range"))
}

/// Progressive release configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressiveConfig {
    /// Lowest percentage a fresh progressive release may use
    #[serde(default = "default_min_percentage")]
    pub min_percentage: u8,
}

fn default_min_percentage() -> u8 {
    1
}

impl Default for ProgressiveConfig {
    fn default() -> Self {
        Self {
            min_percentage: default_min_percentage(),
        }
    }
}

/// Branch visibility configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchConfig {
    #[serde(default = "default_branch_lifetime", with = "humantime_serde")]
    pub lifetime: Duration,
}

fn default_branch_lifetime() -> Duration {
    Duration::from_secs(30 * 24 * 60 * 60)
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            lifetime: default_branch_lifetime(),
        }
    }
}

/// Filter preset for the available-revisions list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailableFilterSetting {
    #[default]
    Recent,
    Unreleased,
    All,
}

/// Available-revisions list configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableConfig {
    #[serde(default = "default_recent_window", with = "humantime_serde")]
    pub recent_window: Duration,
    #[serde(default)]
    pub default_filter: AvailableFilterSetting,
}

fn default_recent_window() -> Duration {
    Duration::from_secs(7 * 24 * 60 * 60)
}

impl Default for AvailableConfig {
    fn default() -> Self {
        Self {
            recent_window: default_recent_window(),
            default_filter: AvailableFilterSetting::default(),
        }
    }
}

/// Commit transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitConfig {
    /// Base URL of the publisher API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Snap name the releases belong to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap: Option<String>,
    #[serde(default = "default_commit_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_commit_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            snap: None,
            timeout: default_commit_timeout(),
        }
    }
}

/// Load configuration from a directory
pub fn load_config(dir: &Path) -> Result<Config> {
    load_config_from_file(&config_path(dir))
}

/// Load configuration from a specific file path
pub fn load_config_from_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Save configuration to a file
pub fn save_config(dir: &Path, config: &Config) -> Result<()> {
    let path = config_path(dir);

    let content = toml::to_string_pretty(config).context("failed to serialize config to TOML")?;

    std::fs::write(&path, content)
        .with_context(|| format!("failed to write config file: {}", path.display()))?;

    Ok(())
}

/// Find configuration file by walking up the directory tree
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.exists())
}
