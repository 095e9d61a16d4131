use std::collections::VecDeque;

use log::{info, warn};

use super::{MemoryAllocator, Pid, Process, ProcessRecord};

use crate::error::AllocError;

/// Result of loading a batch of admission records.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: Vec<Pid>,
    pub skipped: Vec<(Pid, AllocError)>,
}

/// Holds loaded processes until their arrival tick.
#[derive(Debug, Default)]
pub struct LongTermScheduler {
    pending: VecDeque<Process>,
    next_pid: usize,
}

impl LongTermScheduler {
    pub fn new() -> LongTermScheduler {
        LongTermScheduler::default()
    }

    /// Assigns pids in record order and reserves each process's memory.
    /// A process whose memory cannot be reserved is skipped; later records
    /// are still loaded.
    pub fn load(&mut self, records: &[ProcessRecord], memory: &mut MemoryAllocator) -> LoadReport {
        let mut report = LoadReport::default();

        for record in records {
            let pid = Pid(self.next_pid);
            self.next_pid += 1;

            let process = Process::new(pid, record);
            match memory.assign(process.get_memory_blocks_requested(), &process) {
                Ok(_) => {
                    report.loaded.push(pid);
                    self.pending.push_back(process);
                }
                Err(err) => {
                    warn!("failed to spawn {}: {}", pid, err);
                    report.skipped.push((pid, err));
                }
            }
        }

        self.pending
            .make_contiguous()
            .sort_by_key(|process| process.get_arrival_tick());

        info!("loaded {} processes, skipped {}", report.loaded.len(), report.skipped.len());
        report
    }

    /// Removes and returns every pending process that has arrived by `tick`,
    /// in arrival then load order.
    pub fn step(&mut self, tick: u64) -> Vec<Process> {
        let mut arrived = Vec::new();

        while self
            .pending
            .front()
            .is_some_and(|process| process.get_arrival_tick() <= tick)
        {
            if let Some(process) = self.pending.pop_front() {
                arrived.push(process);
            }
        }

        arrived
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Process> {
        self.pending.iter()
    }
}
