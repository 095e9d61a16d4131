use std::collections::BTreeMap;
use std::ops::Range;

use log::{debug, warn};

use super::{Bucket, Pid, Process, ProcessHandle};

use crate::config::MemoryConfig;
use crate::error::AllocError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBlock {
    pub id: usize,
    pub size_bytes: usize,
    pub owner: Option<ProcessHandle>,
}

impl MemoryBlock {
    pub fn is_free(&self) -> bool {
        self.owner.is_none()
    }
}

/// Outcome of a failed contiguous-run scan.
pub(crate) struct ScanMiss {
    pub free_seen: usize,
}

/// Walks `free_flags` in index order looking for `needed` consecutive free
/// entries. Any occupied entry restarts the run at the next index.
pub(crate) fn scan_for_run<I>(free_flags: I, needed: usize) -> Result<Range<usize>, ScanMiss>
where
    I: IntoIterator<Item = bool>,
{
    if needed == 0 {
        return Ok(0..0);
    }

    let mut run_start = 0;
    let mut run_len = 0;
    let mut free_seen = 0;

    for (idx, is_free) in free_flags.into_iter().enumerate() {
        if is_free {
            if run_len == 0 {
                run_start = idx;
            }
            run_len += 1;
            free_seen += 1;
        } else {
            run_len = 0;
        }

        if run_len == needed {
            return Ok(run_start..run_start + run_len);
        }
    }

    Err(ScanMiss { free_seen })
}

#[derive(Debug)]
struct BucketPool {
    blocks: Vec<MemoryBlock>,
    available: usize,
}

impl BucketPool {
    fn new(count: usize, block_size: usize) -> BucketPool {
        BucketPool {
            blocks: (0..count)
                .map(|id| MemoryBlock { id, size_bytes: block_size, owner: None })
                .collect(),
            available: count,
        }
    }
}

/// Fixed pool of memory blocks split into a realtime and a user bucket.
#[derive(Debug)]
pub struct MemoryAllocator {
    buckets: BTreeMap<Bucket, BucketPool>,
    block_size: usize,
}

impl MemoryAllocator {
    pub fn new<I>(block_counts: I, block_size: usize) -> MemoryAllocator
    where
        I: IntoIterator<Item = (Bucket, usize)>,
    {
        let mut buckets: BTreeMap<Bucket, BucketPool> = block_counts
            .into_iter()
            .map(|(bucket, count)| (bucket, BucketPool::new(count, block_size)))
            .collect();

        for bucket in [Bucket::Realtime, Bucket::User] {
            buckets.entry(bucket).or_insert_with(|| BucketPool::new(0, block_size));
        }

        MemoryAllocator { buckets, block_size }
    }

    pub fn from_config(config: &MemoryConfig) -> MemoryAllocator {
        MemoryAllocator::new(
            [
                (Bucket::Realtime, config.realtime_blocks),
                (Bucket::User, config.user_blocks),
            ],
            config.block_size,
        )
    }

    fn pool(&self, bucket: Bucket) -> &BucketPool {
        &self.buckets[&bucket]
    }

    fn pool_mut(&mut self, bucket: Bucket) -> &mut BucketPool {
        self.buckets
            .get_mut(&bucket)
            .unwrap_or_else(|| panic!("memory bucket {} missing", bucket))
    }

    /// Finds `count` index-contiguous free blocks in the bucket for `class`
    /// (a `Bucket` or a `Priority`) without reserving them.
    ///
    /// # Panics
    /// If a full scan disagrees with the bucket's available counter.
    pub fn find_free_run(&self, count: usize, class: impl Into<Bucket>) -> Result<Range<usize>, AllocError> {
        let bucket = class.into();
        let pool = self.pool(bucket);

        if count > pool.available {
            return Err(AllocError::CapacityExceeded {
                bucket,
                requested: count,
                available: pool.available,
            });
        }

        match scan_for_run(pool.blocks.iter().map(MemoryBlock::is_free), count) {
            Ok(run) => Ok(run),
            Err(miss) if miss.free_seen != pool.available => panic!(
                "memory bucket {} accounting says {} blocks are free but {} were found",
                bucket, pool.available, miss.free_seen
            ),
            Err(_) => Err(AllocError::FragmentationFailure { bucket, requested: count }),
        }
    }

    /// Reserves `count` blocks in the process's bucket. Nothing changes on failure.
    pub fn assign(&mut self, count: usize, process: &Process) -> Result<Range<usize>, AllocError> {
        let bucket = process.get_priority().bucket();

        let run = match self.find_free_run(count, bucket) {
            Ok(run) => run,
            Err(err) => {
                warn!("memory for {} not assigned: {}", process.get_pid(), err);
                return Err(err);
            }
        };

        let owner = process.handle();
        let pool = self.pool_mut(bucket);
        for block in &mut pool.blocks[run.clone()] {
            block.owner = Some(owner);
        }
        pool.available -= run.len();

        debug!("assigned {} blocks {:?} in {} bucket to {}", run.len(), run, bucket, owner.pid);
        Ok(run)
    }

    /// Frees every block owned by `pid` in either bucket. Returns the count freed.
    pub fn release(&mut self, pid: Pid) -> usize {
        let mut freed = 0;

        for pool in self.buckets.values_mut() {
            let mut freed_here = 0;
            for block in pool.blocks.iter_mut() {
                if block.owner.map(|owner| owner.pid) == Some(pid) {
                    block.owner = None;
                    freed_here += 1;
                }
            }
            pool.available += freed_here;
            freed += freed_here;
        }

        if freed > 0 {
            debug!("released {} memory blocks held by {}", freed, pid);
        }
        freed
    }

    pub fn get_available_blocks(&self, bucket: Bucket) -> usize {
        self.pool(bucket).available
    }

    pub fn get_total_blocks(&self, bucket: Bucket) -> usize {
        self.pool(bucket).blocks.len()
    }

    pub fn get_block_size(&self) -> usize {
        self.block_size
    }

    pub fn blocks(&self, bucket: Bucket) -> &[MemoryBlock] {
        &self.pool(bucket).blocks
    }

    /// Available counts for every bucket, realtime first.
    pub fn availability(&self) -> Vec<(Bucket, usize)> {
        self.buckets
            .iter()
            .map(|(bucket, pool)| (*bucket, pool.available))
            .collect()
    }
}
