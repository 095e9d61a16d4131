use log::{debug, info, warn};

use super::*;

use crate::config::Config;
use crate::io::{BlockStore, Storage};

/// What happened during one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub admitted: Vec<Pid>,
    pub ran: Option<Pid>,
    pub completed: Option<Pid>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    /// Completed processes with the tick they finished on.
    pub completed: Vec<(Pid, u64)>,
    /// Processes still pending or queued when the loop stopped.
    pub unfinished: Vec<Pid>,
}

/// Read-only projection of every manager's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub clock: u64,
    pub memory: Vec<(Bucket, usize)>,
    pub disk: Vec<Option<String>>,
    pub resources: Vec<(ResourceKind, Vec<bool>)>,
    pub queues: Vec<(Priority, Vec<Pid>)>,
    pub running: Option<Pid>,
}

/// Path of the scratch file holding a process's disk request.
pub fn scratch_path(pid: Pid) -> String {
    format!("proc/{}.swap", pid)
}

/// Owns every manager and advances the simulation one tick at a time.
///
/// Memory is always consulted at load time. The other subsystems are
/// switched by `config.subsystems`.
pub struct Driver<S: Storage> {
    config: Config,
    clock: u64,
    memory: MemoryAllocator,
    resources: ResourcePool,
    disk: BlockStore<S>,
    lts: LongTermScheduler,
    sts: Scheduler,
    completed: Vec<(Pid, u64)>,
}

impl<S: Storage> Driver<S> {
    pub fn new(config: Config, storage: S) -> Driver<S> {
        Driver {
            memory: MemoryAllocator::from_config(&config.memory),
            resources: ResourcePool::from_config(&config.resources),
            disk: BlockStore::new(config.disk.blocks, config.disk.block_size, storage),
            sts: Scheduler::new(&config.scheduler),
            lts: LongTermScheduler::new(),
            clock: 0,
            completed: Vec::new(),
            config,
        }
    }

    pub fn load(&mut self, records: &[ProcessRecord]) -> LoadReport {
        self.lts.load(records, &mut self.memory)
    }

    /// True once nothing is left to admit or run.
    pub fn is_idle(&self) -> bool {
        !self.config.subsystems.queue || (!self.lts.has_pending() && self.sts.is_empty())
    }

    pub fn step(&mut self) -> TickReport {
        let mut report = TickReport {
            tick: self.clock,
            ..TickReport::default()
        };

        if self.config.subsystems.queue {
            for process in self.lts.step(self.clock) {
                report.admitted.push(process.get_pid());
                self.admit(process);
            }

            report.ran = self.sts.active_process().map(Process::get_pid);
            if let Some(process) = self.sts.run_tick() {
                report.completed = Some(process.get_pid());
                self.retire(&process);
            }
        }

        debug!("tick {}: ran {:?}", self.clock, report.ran);
        self.clock += 1;
        report
    }

    /// Steps until idle or until `max_ticks` is reached.
    pub fn run(&mut self) -> RunSummary {
        while !self.is_idle() && self.clock < self.config.max_ticks {
            self.step();
        }

        let mut unfinished: Vec<Pid> = self.lts.pending().map(Process::get_pid).collect();
        unfinished.extend(self.sts.queue_contents().into_iter().flat_map(|(_, pids)| pids));

        if !unfinished.is_empty() {
            warn!("stopped at tick {} with {} unfinished processes", self.clock, unfinished.len());
        }

        RunSummary {
            ticks: self.clock,
            completed: self.completed.clone(),
            unfinished,
        }
    }

    fn admit(&mut self, process: Process) {
        let mut wants_storage = process.get_disk_blocks_requested() > 0;

        if self.config.subsystems.filesystem && wants_storage {
            let path = scratch_path(process.get_pid());
            if let Err(err) = self.disk.reserve(process.get_disk_blocks_requested(), &path, &process) {
                warn!("{} admitted without scratch file: {}", process.get_pid(), err);
                wants_storage = false;
            }
        }

        if self.config.subsystems.resources {
            self.acquire_peripherals(&process, wants_storage);
        }

        info!("{} admitted at tick {} with priority {}", process.get_pid(), self.clock, process.get_priority());
        self.sts.admit(process);
    }

    fn acquire_peripherals(&mut self, process: &Process, wants_storage: bool) {
        let requests = [
            (process.printer, ResourceKind::Printer),
            (process.scanner, ResourceKind::Scanner),
            (process.modem, ResourceKind::Modem),
            (wants_storage, ResourceKind::StorageDevice),
        ];

        for (_, kind) in requests.into_iter().filter(|(wanted, _)| *wanted) {
            let Some(unit) = self.resources.acquire(kind) else {
                warn!("no {} available for {}", kind, process.get_pid());
                continue;
            };

            if let Err(err) = self.resources.allocate(unit, process) {
                debug!("{} runs without {}: {}", process.get_pid(), kind, err);
            }
        }
    }

    /// Returns everything a completed process held.
    fn retire(&mut self, process: &Process) {
        let pid = process.get_pid();

        self.memory.release(pid);

        if self.config.subsystems.resources {
            self.resources.release_all(pid);
        }

        if self.config.subsystems.filesystem {
            let path = scratch_path(pid);
            if self.disk.run_for(&path).is_some() {
                if let Err(err) = self.disk.delete(&path, process) {
                    warn!("scratch file of {} not removed: {}", pid, err);
                }
            }
        }

        self.completed.push((pid, self.clock));
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            clock: self.clock,
            memory: self.memory.availability(),
            disk: self
                .disk
                .utilization_map()
                .into_iter()
                .map(|path| path.map(str::to_string))
                .collect(),
            resources: self.resources.availability(),
            queues: self.sts.queue_contents(),
            running: self.sts.active_process().map(Process::get_pid),
        }
    }

    pub fn get_clock(&self) -> u64 {
        self.clock
    }

    pub fn memory(&self) -> &MemoryAllocator {
        &self.memory
    }

    pub fn resources(&self) -> &ResourcePool {
        &self.resources
    }

    pub fn disk(&self) -> &BlockStore<S> {
        &self.disk
    }

    pub fn disk_mut(&mut self) -> &mut BlockStore<S> {
        &mut self.disk
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.sts
    }
}
