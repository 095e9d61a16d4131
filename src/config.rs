//! Simulation configuration.
//!
//! Every section has defaults matching the reference machine: 64 realtime and
//! 960 user memory blocks of 1 MiB, a 1024-block disk of 8 KiB blocks, one
//! scanner, two printers, one modem and two storage devices.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::kernel::AgingPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub realtime_blocks: usize,
    pub user_blocks: usize,
    pub block_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            realtime_blocks: 64,
            user_blocks: 960,
            block_size: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    pub blocks: usize,
    pub block_size: usize,
    /// Root directory for file contents when the directory-backed storage is used.
    pub base_dir: PathBuf,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            blocks: 1024,
            block_size: 8192,
            base_dir: PathBuf::from("drives/sda1"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub scanners: usize,
    pub printers: usize,
    pub modems: usize,
    pub storage_devices: usize,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            scanners: 1,
            printers: 2,
            modems: 1,
            storage_devices: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Age credit added per aging pass.
    pub aging: u32,
    /// A process is promoted once its age is strictly greater than this.
    pub max_process_age: u32,
    pub aging_policy: AgingPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            aging: 1,
            max_process_age: 2,
            aging_policy: AgingPolicy::default(),
        }
    }
}

/// Which subsystems the tick loop drives. Memory is always on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Subsystems {
    pub resources: bool,
    pub queue: bool,
    pub filesystem: bool,
}

impl Subsystems {
    pub const MEMORY_ONLY: Subsystems = Subsystems {
        resources: false,
        queue: false,
        filesystem: false,
    };

    pub const SCHEDULING: Subsystems = Subsystems {
        resources: true,
        queue: true,
        filesystem: false,
    };

    pub const ALL: Subsystems = Subsystems {
        resources: true,
        queue: true,
        filesystem: true,
    };
}

impl Default for Subsystems {
    fn default() -> Self {
        Subsystems::ALL
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub memory: MemoryConfig,
    pub disk: DiskConfig,
    pub resources: ResourceConfig,
    pub scheduler: SchedulerConfig,
    pub subsystems: Subsystems,
    pub max_ticks: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory: MemoryConfig::default(),
            disk: DiskConfig::default(),
            resources: ResourceConfig::default(),
            scheduler: SchedulerConfig::default(),
            subsystems: Subsystems::default(),
            max_ticks: 10_000,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Config, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Config::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_empty_toml_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_config_partial_sections_keep_defaults() {
        let config = Config::from_toml(
            r#"
            max_ticks = 50

            [memory]
            realtime_blocks = 8

            [scheduler]
            max_process_age = 5
            aging_policy = "waiting"

            [subsystems]
            filesystem = false
            "#,
        )
        .unwrap();

        assert_eq!(config.max_ticks, 50);
        assert_eq!(config.memory.realtime_blocks, 8);
        assert_eq!(config.memory.user_blocks, 960);
        assert_eq!(config.scheduler.max_process_age, 5);
        assert_eq!(config.scheduler.aging, 1);
        assert_eq!(config.scheduler.aging_policy, AgingPolicy::Waiting);
        assert_eq!(config.subsystems, Subsystems::SCHEDULING);
    }

    #[test]
    fn test_config_rejects_unknown_policy() {
        let result = Config::from_toml("[scheduler]\naging_policy = \"sometimes\"\n");

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_missing_file_reports_path() {
        let path = Path::new("does/not/exist.toml");

        match Config::from_file(path) {
            Err(ConfigError::Read { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
