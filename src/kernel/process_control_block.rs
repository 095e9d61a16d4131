use std::fmt;

/// Process identifier, assigned in load order (`p0`, `p1`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub usize);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Scheduling priority. Level 0 is realtime, level 3 the default user class.
///
/// Lower numbers are more privileged. The ordering derived here is the
/// numeric one, so `Priority::REALTIME < Priority::USER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Priority(u8);

impl Priority {
    pub const REALTIME: Priority = Priority(0);
    pub const USER: Priority = Priority(3);
    pub const LEVELS: usize = 4;

    pub fn new(level: u8) -> Option<Priority> {
        if (level as usize) < Self::LEVELS {
            Some(Priority(level))
        } else {
            None
        }
    }

    pub fn level(self) -> usize {
        self.0 as usize
    }

    pub fn is_realtime(self) -> bool {
        self.0 == 0
    }

    /// The memory bucket this priority draws from.
    pub fn bucket(self) -> Bucket {
        if self.is_realtime() {
            Bucket::Realtime
        } else {
            Bucket::User
        }
    }

    /// One level closer to realtime, or `None` if already there.
    pub fn promoted(self) -> Option<Priority> {
        self.0.checked_sub(1).map(Priority)
    }

    /// Lower number wins. Equal levels are equally privileged.
    pub fn is_at_least_as_privileged_as(self, other: Priority) -> bool {
        self.0 <= other.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocation class. Every non-realtime priority collapses into `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Realtime,
    User,
}

impl Bucket {
    /// The priority level used as the bucket's key (0 or 3).
    pub fn key(self) -> Priority {
        match self {
            Bucket::Realtime => Priority::REALTIME,
            Bucket::User => Priority::USER,
        }
    }
}

impl From<Priority> for Bucket {
    fn from(priority: Priority) -> Bucket {
        priority.bucket()
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Realtime => write!(f, "realtime"),
            Bucket::User => write!(f, "user"),
        }
    }
}

/// A parsed admission record, before a pid has been assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub arrival_tick: u64,
    pub priority: Priority,
    pub cpu_ticks: u32,
    pub memory_blocks: usize,
    pub printer: bool,
    pub scanner: bool,
    pub modem: bool,
    pub disk_blocks: usize,
}

/// Weak reference to a process, stored in block and unit owner slots.
///
/// Carries the owner's priority as it was when the reference was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle {
    pub pid: Pid,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pub printer: bool,
    pub scanner: bool,
    pub modem: bool,

    pid: Pid,
    arrival_tick: u64,
    priority: Priority,
    remaining_cpu_ticks: i64,
    memory_blocks_requested: usize,
    disk_blocks_requested: usize,
    wait_age: u32,
}

impl Process {
    pub fn new(pid: Pid, record: &ProcessRecord) -> Process {
        Process {
            pid,
            arrival_tick: record.arrival_tick,
            priority: record.priority,
            remaining_cpu_ticks: record.cpu_ticks as i64,
            memory_blocks_requested: record.memory_blocks,
            disk_blocks_requested: record.disk_blocks,
            printer: record.printer,
            scanner: record.scanner,
            modem: record.modem,
            wait_age: 0,
        }
    }

    pub fn get_pid(&self) -> Pid {
        self.pid
    }

    pub fn get_arrival_tick(&self) -> u64 {
        self.arrival_tick
    }

    pub fn get_priority(&self) -> Priority {
        self.priority
    }

    pub fn get_remaining_cpu_ticks(&self) -> i64 {
        self.remaining_cpu_ticks
    }

    pub fn get_memory_blocks_requested(&self) -> usize {
        self.memory_blocks_requested
    }

    pub fn get_disk_blocks_requested(&self) -> usize {
        self.disk_blocks_requested
    }

    pub fn get_wait_age(&self) -> u32 {
        self.wait_age
    }

    pub fn is_complete(&self) -> bool {
        self.remaining_cpu_ticks <= 0
    }

    pub fn handle(&self) -> ProcessHandle {
        ProcessHandle {
            pid: self.pid,
            priority: self.priority,
        }
    }

    pub(crate) fn execute_tick(&mut self) {
        self.remaining_cpu_ticks -= 1;
    }

    pub(crate) fn add_wait_age(&mut self, amount: u32) {
        self.wait_age = self.wait_age.saturating_add(amount);
    }

    /// Moves one level up and clears the age credit. Returns false at realtime.
    pub(crate) fn promote(&mut self) -> bool {
        match self.priority.promoted() {
            Some(priority) => {
                self.priority = priority;
                self.wait_age = 0;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_record(arrival_tick: u64, priority: u8, cpu_ticks: u32) -> ProcessRecord {
    ProcessRecord {
        arrival_tick,
        priority: Priority::new(priority).unwrap(),
        cpu_ticks,
        memory_blocks: 0,
        printer: false,
        scanner: false,
        modem: false,
        disk_blocks: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_rejects_out_of_range_level() {
        assert_eq!(Priority::new(3), Some(Priority::USER));
        assert_eq!(Priority::new(4), None);
    }

    #[test]
    fn test_priority_bucket_collapses_non_realtime() {
        assert_eq!(Priority::new(0).unwrap().bucket(), Bucket::Realtime);
        for level in 1..=3 {
            assert_eq!(Priority::new(level).unwrap().bucket(), Bucket::User);
        }
        assert_eq!(Bucket::User.key(), Priority::USER);
    }

    #[test]
    fn test_priority_privilege_is_lower_number_wins() {
        assert!(Priority::REALTIME.is_at_least_as_privileged_as(Priority::USER));
        assert!(Priority::USER.is_at_least_as_privileged_as(Priority::USER));
        assert!(!Priority::USER.is_at_least_as_privileged_as(Priority::REALTIME));
    }

    #[test]
    fn test_process_new_copies_record() {
        let process = Process::new(Pid(4), &test_record(7, 2, 5));

        assert_eq!(process.get_pid().to_string(), "p4");
        assert_eq!(process.get_arrival_tick(), 7);
        assert_eq!(process.get_priority(), Priority::new(2).unwrap());
        assert_eq!(process.get_remaining_cpu_ticks(), 5);
        assert_eq!(process.get_wait_age(), 0);
        assert!(!process.is_complete());
    }

    #[test]
    fn test_process_promote_resets_age() {
        let mut process = Process::new(Pid(0), &test_record(0, 1, 5));
        process.add_wait_age(3);

        assert!(process.promote());
        assert_eq!(process.get_priority(), Priority::REALTIME);
        assert_eq!(process.get_wait_age(), 0);

        process.add_wait_age(1);
        assert!(!process.promote());
        assert_eq!(process.get_wait_age(), 1);
    }
}
