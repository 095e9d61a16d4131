use std::collections::VecDeque;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{Pid, Priority, Process};

use crate::config::SchedulerConfig;

/// Decides which queued processes earn age credit on an aging pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgingPolicy {
    /// Ages a process while its arrival tick is still ahead of the
    /// scheduler's cpu time (`arrival_tick > cpu_time`).
    #[default]
    NotYetArrived,
    /// Ages a process once it has arrived and is sitting in a queue
    /// (`arrival_tick <= cpu_time`).
    Waiting,
}

impl AgingPolicy {
    pub fn should_age(self, process: &Process, cpu_time: u64) -> bool {
        match self {
            AgingPolicy::NotYetArrived => process.get_arrival_tick() > cpu_time,
            AgingPolicy::Waiting => process.get_arrival_tick() <= cpu_time,
        }
    }
}

/// Multilevel feedback queue: one FIFO per priority level, 0 served first.
#[derive(Debug)]
pub struct Scheduler {
    queues: [VecDeque<Process>; Priority::LEVELS],
    cpu_time: u64,
    aging: u32,
    max_process_age: u32,
    aging_policy: AgingPolicy,
}

impl Scheduler {
    pub fn new(config: &SchedulerConfig) -> Scheduler {
        Scheduler {
            queues: Default::default(),
            cpu_time: 0,
            aging: config.aging,
            max_process_age: config.max_process_age,
            aging_policy: config.aging_policy,
        }
    }

    /// Appends to the queue matching the process's current priority.
    pub fn admit(&mut self, process: Process) {
        debug!("admitting {} at priority {}", process.get_pid(), process.get_priority());
        self.queues[process.get_priority().level()].push_back(process);
    }

    fn active_slot(&self) -> Option<(usize, Pid)> {
        self.queues
            .iter()
            .enumerate()
            .find_map(|(level, queue)| queue.front().map(|process| (level, process.get_pid())))
    }

    /// Head of the highest-priority non-empty queue.
    pub fn active_process(&self) -> Option<&Process> {
        self.queues.iter().find_map(|queue| queue.front())
    }

    /// Runs the active process for one tick. Returns it if it completed.
    pub fn run_tick(&mut self) -> Option<Process> {
        let (level, pid) = self.active_slot()?;

        self.queues[level][0].execute_tick();
        self.age_processes(pid);

        let completed = match self.position(level, pid) {
            Some(pos) if self.queues[level][pos].is_complete() => self.queues[level].remove(pos),
            _ => None,
        };

        if let Some(process) = &completed {
            info!("{} completed at cpu time {}", process.get_pid(), self.cpu_time);
        }

        self.cpu_time += 1;
        completed
    }

    /// One aging pass over every queued process except `active`, from the
    /// lowest priority queue up. Each process is visited once per pass.
    fn age_processes(&mut self, active: Pid) {
        let visits: Vec<(usize, Pid)> = (0..Priority::LEVELS)
            .rev()
            .flat_map(|level| {
                self.queues[level]
                    .iter()
                    .map(move |process| (level, process.get_pid()))
            })
            .filter(|(_, pid)| *pid != active)
            .collect();

        for (level, pid) in visits {
            let Some(pos) = self.position(level, pid) else {
                continue;
            };

            let process = &mut self.queues[level][pos];
            if self.aging_policy.should_age(process, self.cpu_time) {
                process.add_wait_age(self.aging);
            }

            if process.get_wait_age() > self.max_process_age && level > 0 {
                if let Some(mut process) = self.queues[level].remove(pos) {
                    process.promote();
                    debug!("promoted {} to priority {}", pid, process.get_priority());
                    self.queues[level - 1].push_back(process);
                }
            }
        }
    }

    fn position(&self, level: usize, pid: Pid) -> Option<usize> {
        self.queues[level]
            .iter()
            .position(|process| process.get_pid() == pid)
    }

    pub fn queue(&self, priority: Priority) -> &VecDeque<Process> {
        &self.queues[priority.level()]
    }

    /// Pids in each ready queue, priority 0 first.
    pub fn queue_contents(&self) -> Vec<(Priority, Vec<Pid>)> {
        self.queues
            .iter()
            .enumerate()
            .filter_map(|(level, queue)| {
                let priority = Priority::new(level as u8)?;
                Some((priority, queue.iter().map(Process::get_pid).collect()))
            })
            .collect()
    }

    pub fn find(&self, pid: Pid) -> Option<&Process> {
        self.queues.iter().flatten().find(|process| process.get_pid() == pid)
    }

    pub fn get_cpu_time(&self) -> u64 {
        self.cpu_time
    }

    pub fn len(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(VecDeque::is_empty)
    }
}
