use std::collections::BTreeMap;
use std::ops::Range;

use log::{debug, error, warn};

use super::Storage;

use crate::error::{DiskError, SnapshotError};
use crate::kernel::memory::scan_for_run;
use crate::kernel::{Process, ProcessHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskBlock {
    pub id: usize,
    pub size_bytes: usize,
    pub owner: Option<ProcessHandle>,
    pub path: Option<String>,
}

impl DiskBlock {
    pub fn is_free(&self) -> bool {
        self.owner.is_none() && self.path.is_none()
    }

    fn clear(&mut self) {
        self.owner = None;
        self.path = None;
    }
}

/// Fixed pool of disk blocks with a path to block-run map.
///
/// Each registered path owns one index-contiguous run. File contents are
/// kept by the `Storage` collaborator.
#[derive(Debug)]
pub struct BlockStore<S: Storage> {
    blocks: Vec<DiskBlock>,
    block_size: usize,
    available: usize,
    paths: BTreeMap<String, Range<usize>>,
    storage: S,
}

impl<S: Storage> BlockStore<S> {
    pub fn new(total_blocks: usize, block_size: usize, storage: S) -> BlockStore<S> {
        assert!(block_size > 0, "disk block size must be positive");

        BlockStore {
            blocks: (0..total_blocks)
                .map(|id| DiskBlock { id, size_bytes: block_size, owner: None, path: None })
                .collect(),
            block_size,
            available: total_blocks,
            paths: BTreeMap::new(),
            storage,
        }
    }

    /// Blocks needed to hold `byte_length` bytes. Every file takes at least one.
    pub fn blocks_needed(&self, byte_length: usize) -> usize {
        byte_length.div_ceil(self.block_size).max(1)
    }

    /// Finds a contiguous free run large enough for `byte_length` bytes.
    ///
    /// # Panics
    /// If a full scan disagrees with the free-block counter.
    pub fn find_free_run(&self, byte_length: usize) -> Result<Range<usize>, DiskError> {
        self.find_run_of(self.blocks_needed(byte_length))
    }

    fn find_run_of(&self, needed: usize) -> Result<Range<usize>, DiskError> {
        if needed > self.available {
            return Err(DiskError::CapacityExceeded {
                requested: needed,
                available: self.available,
            });
        }

        match scan_for_run(self.blocks.iter().map(DiskBlock::is_free), needed) {
            Ok(run) => Ok(run),
            Err(miss) if miss.free_seen != self.available => panic!(
                "disk accounting says {} blocks are free but {} were found",
                self.available, miss.free_seen
            ),
            Err(_) => Err(DiskError::FragmentationFailure { requested: needed }),
        }
    }

    fn mark(&mut self, run: Range<usize>, path: &str, owner: Option<ProcessHandle>) {
        for block in &mut self.blocks[run.clone()] {
            block.owner = owner;
            block.path = Some(path.to_string());
        }
        self.available -= run.len();
    }

    fn unmark(&mut self, run: Range<usize>) {
        for block in &mut self.blocks[run.clone()] {
            block.clear();
        }
        self.available += run.len();
    }

    fn check_fits_disk(&self, needed: usize, path: &str) -> Result<(), DiskError> {
        if needed > self.blocks.len() {
            warn!("{} needs {} blocks, disk holds {}", path, needed, self.blocks.len());
            return Err(DiskError::CapacityExceeded {
                requested: needed,
                available: self.available,
            });
        }
        Ok(())
    }

    /// Writes `bytes` at `path` and gives the path a fresh run owned by `owner`.
    ///
    /// An existing run for `path` is released first and put back if the
    /// write fails, so a failed call leaves the store as it was.
    pub fn create_or_update(&mut self, bytes: &[u8], path: &str, owner: &Process) -> Result<Range<usize>, DiskError> {
        let needed = self.blocks_needed(bytes.len());
        self.check_fits_disk(needed, path)?;
        self.write_run(needed, bytes, path, owner)
    }

    /// Gives `path` a zero-filled file of `block_count` blocks owned by `owner`.
    ///
    /// The count is checked against the disk size before any bytes are built.
    pub fn reserve(&mut self, block_count: usize, path: &str, owner: &Process) -> Result<Range<usize>, DiskError> {
        let needed = block_count.max(1);
        self.check_fits_disk(needed, path)?;

        let bytes = vec![0; needed * self.block_size];
        self.write_run(needed, &bytes, path, owner)
    }

    fn write_run(&mut self, needed: usize, bytes: &[u8], path: &str, owner: &Process) -> Result<Range<usize>, DiskError> {
        let previous = self.paths.remove(path).map(|run| {
            let saved = self.blocks[run.clone()].to_vec();
            self.unmark(run.clone());
            (run, saved)
        });

        let result = self.find_run_of(needed).and_then(|run| {
            self.mark(run.clone(), path, Some(owner.handle()));
            match self.storage.write(path, bytes) {
                Ok(()) => Ok(run),
                Err(source) => {
                    error!("failed to store {}: {}", path, source);
                    self.unmark(run);
                    Err(DiskError::Storage { path: path.to_string(), source })
                }
            }
        });

        match &result {
            Ok(run) => {
                debug!("{} stored in blocks {:?} for {}", path, run, owner.get_pid());
                self.paths.insert(path.to_string(), run.clone());
            }
            Err(err) => {
                warn!("{} not written: {}", path, err);
                if let Some((run, saved)) = previous {
                    self.blocks[run.clone()].clone_from_slice(&saved);
                    self.available -= run.len();
                    self.paths.insert(path.to_string(), run);
                }
            }
        }

        result
    }

    /// Stored bytes for `path`, or `None` if nothing can be read there.
    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        match self.storage.read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                error!("failed to read {}: {}", path, err);
                None
            }
        }
    }

    /// Removes `path` and frees its run.
    ///
    /// Refused when the run's owner is more privileged than `requester`. The
    /// owner's priority is the one recorded when the file was written; a later
    /// promotion of the owner does not raise the file's privilege.
    /// An unregistered path only has stray stored bytes removed.
    pub fn delete(&mut self, path: &str, requester: &Process) -> Result<(), DiskError> {
        let run = self.paths.get(path).cloned();

        if let Some(run) = &run {
            let owner = self.blocks.get(run.start).and_then(|block| block.owner);
            if let Some(owner) = owner {
                if !requester.get_priority().is_at_least_as_privileged_as(owner.priority) {
                    warn!("{} may not delete {} owned by {}", requester.get_pid(), path, owner.pid);
                    return Err(DiskError::PermissionDenied {
                        path: path.to_string(),
                        requester: requester.get_pid(),
                        requester_priority: requester.get_priority(),
                        owner_priority: owner.priority,
                    });
                }
            }
        }

        self.storage.remove(path).map_err(|source| DiskError::Storage {
            path: path.to_string(),
            source,
        })?;

        if let Some(run) = run {
            debug!("{} deleted, freeing blocks {:?}", path, run);
            self.unmark(run);
            self.paths.remove(path);
        }

        Ok(())
    }

    /// Marks `start..start + length` as holding `path` with no owning process.
    /// Used when seeding the store from a snapshot.
    pub fn load_preexisting_block_run(&mut self, path: &str, start: usize, length: usize) -> Result<(), SnapshotError> {
        let end = start.checked_add(length).filter(|end| length > 0 && *end <= self.blocks.len());
        let run = match end {
            Some(end) if self.blocks[start..end].iter().all(DiskBlock::is_free) && !self.paths.contains_key(path) => {
                start..end
            }
            _ => {
                return Err(SnapshotError::InvalidRun {
                    path: path.to_string(),
                    start,
                    length,
                })
            }
        };

        self.mark(run.clone(), path, None);
        self.paths.insert(path.to_string(), run);
        Ok(())
    }

    pub fn run_for(&self, path: &str) -> Option<Range<usize>> {
        self.paths.get(path).cloned()
    }

    /// Registered paths and their runs, in path order.
    pub fn paths(&self) -> impl Iterator<Item = (&str, Range<usize>)> {
        self.paths.iter().map(|(path, run)| (path.as_str(), run.clone()))
    }

    /// One entry per block: the path occupying it, if any.
    pub fn utilization_map(&self) -> Vec<Option<&str>> {
        self.blocks.iter().map(|block| block.path.as_deref()).collect()
    }

    pub fn blocks(&self) -> &[DiskBlock] {
        &self.blocks
    }

    pub fn get_available_blocks(&self) -> usize {
        self.available
    }

    pub fn get_total_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn get_block_size(&self) -> usize {
        self.block_size
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}
