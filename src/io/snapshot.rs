use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use super::{BlockStore, Storage};

use crate::error::SnapshotError;

/// One registered path and the block run it occupies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub path: String,
    pub start: usize,
    pub length: usize,
}

/// Persistable copy of a block store's path map. Block owners are not kept;
/// restored runs belong to no process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSnapshot {
    #[serde(default)]
    pub runs: Vec<RunRecord>,
}

impl PathSnapshot {
    pub fn from_toml(text: &str) -> Result<PathSnapshot, SnapshotError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String, SnapshotError> {
        Ok(toml::to_string(self)?)
    }

    pub fn load(path: &Path) -> Result<PathSnapshot, SnapshotError> {
        let text = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        PathSnapshot::from_toml(&text)
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        fs::write(path, self.to_toml()?).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl<S: Storage> BlockStore<S> {
    pub fn snapshot(&self) -> PathSnapshot {
        PathSnapshot {
            runs: self
                .paths()
                .map(|(path, run)| RunRecord {
                    path: path.to_string(),
                    start: run.start,
                    length: run.len(),
                })
                .collect(),
        }
    }

    /// Seeds this store with every run in `snapshot`. Stops at the first
    /// invalid run; runs seeded before it stay in place.
    pub fn restore(&mut self, snapshot: &PathSnapshot) -> Result<(), SnapshotError> {
        for record in &snapshot.runs {
            self.load_preexisting_block_run(&record.path, record.start, record.length)?;
        }
        info!("restored {} paths from snapshot", snapshot.runs.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemStorage;
    use crate::kernel::process_control_block::test_record;
    use crate::kernel::{Pid, Process};
    use tempfile::NamedTempFile;

    #[test]
    fn test_snapshot_restores_runs_into_fresh_store() {
        let owner = Process::new(Pid(0), &test_record(0, 3, 1));
        let mut disk = BlockStore::new(8, 4, MemStorage::new());
        disk.create_or_update(b"abcdefgh", "a", &owner).unwrap();
        disk.create_or_update(b"xyz", "dir/b", &owner).unwrap();

        let text = disk.snapshot().to_toml().unwrap();
        let mut restored = BlockStore::new(8, 4, MemStorage::new());
        restored.restore(&PathSnapshot::from_toml(&text).unwrap()).unwrap();

        assert_eq!(restored.run_for("a"), Some(0..2));
        assert_eq!(restored.run_for("dir/b"), Some(2..3));
        assert_eq!(restored.get_available_blocks(), 5);
        assert_eq!(restored.utilization_map(), disk.utilization_map());
    }

    #[test]
    fn test_snapshot_parses_hand_written_runs() {
        let snapshot = PathSnapshot::from_toml(
            r#"
            [[runs]]
            path = "boot.img"
            start = 0
            length = 2
            "#,
        )
        .unwrap();

        assert_eq!(
            snapshot.runs,
            vec![RunRecord { path: "boot.img".to_string(), start: 0, length: 2 }]
        );
        assert_eq!(PathSnapshot::from_toml("").unwrap(), PathSnapshot::default());
    }

    #[test]
    fn test_snapshot_overlapping_runs_are_rejected() {
        let snapshot = PathSnapshot {
            runs: vec![
                RunRecord { path: "a".to_string(), start: 0, length: 3 },
                RunRecord { path: "b".to_string(), start: 2, length: 1 },
            ],
        };
        let mut disk = BlockStore::new(4, 4, MemStorage::new());

        let result = disk.restore(&snapshot);

        assert!(matches!(result, Err(SnapshotError::InvalidRun { start: 2, .. })));
        assert_eq!(disk.run_for("a"), Some(0..3));
        assert_eq!(disk.run_for("b"), None);
    }

    #[test]
    fn test_snapshot_save_then_load() {
        let file = NamedTempFile::new().unwrap();
        let snapshot = PathSnapshot {
            runs: vec![RunRecord { path: "f".to_string(), start: 1, length: 1 }],
        };

        snapshot.save(file.path()).unwrap();
        let loaded = PathSnapshot::load(file.path()).unwrap();

        assert_eq!(loaded, snapshot);
    }
}
