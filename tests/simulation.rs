use mini_os::config::{Config, DiskConfig, MemoryConfig, Subsystems};
use mini_os::error::AllocError;
use mini_os::io::{loader, MemStorage};
use mini_os::kernel::{Bucket, Pid, Priority, ResourceKind};
use mini_os::Driver;

const PROCESSES: &str = "\
0, 3, 2, 4, 1, 0, 0, 1
0, 0, 3, 2, 0, 0, 0, 0
0, 1, 1, 4, 0, 1, 0, 0
1, 3, 1, 16, 0, 0, 0, 0
";

fn small_config() -> Config {
    Config {
        memory: MemoryConfig {
            realtime_blocks: 4,
            user_blocks: 12,
            block_size: 64,
        },
        disk: DiskConfig {
            blocks: 16,
            block_size: 32,
            ..DiskConfig::default()
        },
        subsystems: Subsystems::ALL,
        ..Config::default()
    }
}

fn run_order(config: Config) -> Vec<Option<Pid>> {
    let records = loader::parse_records(PROCESSES).unwrap();
    let mut driver = Driver::new(config, MemStorage::new());
    driver.load(&records);

    let mut order = Vec::new();
    while !driver.is_idle() {
        order.push(driver.step().ran);
    }
    order
}

#[test]
fn test_simulation_skips_process_without_memory() {
    let records = loader::parse_records(PROCESSES).unwrap();
    let mut driver = Driver::new(small_config(), MemStorage::new());

    let report = driver.load(&records);

    assert_eq!(report.loaded, vec![Pid(0), Pid(1), Pid(2)]);
    assert_eq!(
        report.skipped,
        vec![(
            Pid(3),
            AllocError::CapacityExceeded { bucket: Bucket::User, requested: 16, available: 4 }
        )]
    );
}

#[test]
fn test_simulation_realtime_runs_first_then_by_priority() {
    let order = run_order(small_config());

    assert_eq!(
        order,
        vec![
            Some(Pid(1)),
            Some(Pid(1)),
            Some(Pid(1)),
            Some(Pid(2)),
            Some(Pid(0)),
            Some(Pid(0)),
        ]
    );
}

#[test]
fn test_simulation_is_deterministic() {
    let mut config = small_config();
    config.scheduler.aging_policy = mini_os::kernel::AgingPolicy::Waiting;
    config.scheduler.max_process_age = 0;

    assert_eq!(run_order(config.clone()), run_order(config));
}

#[test]
fn test_simulation_returns_every_resource() {
    let records = loader::parse_records(PROCESSES).unwrap();
    let mut driver = Driver::new(small_config(), MemStorage::new());
    driver.load(&records);

    driver.step();
    let status = driver.status();
    assert_eq!(status.running, Some(Pid(1)));
    assert_eq!(status.queues[0], (Priority::REALTIME, vec![Pid(1)]));
    assert_eq!(status.disk[0].as_deref(), Some("proc/p0.swap"));

    let summary = driver.run();

    assert!(summary.unfinished.is_empty());
    assert_eq!(summary.completed.len(), 3);
    assert_eq!(driver.memory().get_available_blocks(Bucket::Realtime), 4);
    assert_eq!(driver.memory().get_available_blocks(Bucket::User), 12);
    assert_eq!(driver.disk().get_available_blocks(), 16);
    for kind in ResourceKind::ALL {
        assert!(driver.resources().units(kind).iter().all(|unit| unit.is_available()));
    }
}
