use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use mini_os::io::loader;
use mini_os::io::{DirStorage, MemStorage, PathSnapshot, Storage};
use mini_os::kernel::StatusReport;
use mini_os::{Config, Driver};

/// Runs a batch of processes through the simulated OS.
#[derive(Debug, Parser)]
struct Args {
    /// Admission records, one `arrival,priority,cpu,memory,printer,scanner,modem,disk` line each.
    processes: PathBuf,

    /// TOML configuration. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disk snapshot restored before the run and saved after it.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Keep file contents in memory instead of under the drive directory.
    #[arg(long)]
    in_memory: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if args.in_memory {
        simulate(config, MemStorage::new(), &args)
    } else {
        let storage = DirStorage::new(&config.disk.base_dir);
        simulate(config, storage, &args)
    }
}

fn simulate<S: Storage>(config: Config, storage: S, args: &Args) -> Result<()> {
    let text = fs::read_to_string(&args.processes)
        .with_context(|| format!("failed to read {}", args.processes.display()))?;
    let records = loader::parse_records(&text)?;

    let mut driver = Driver::new(config, storage);

    if let Some(path) = args.snapshot.as_deref().filter(|path| path.exists()) {
        driver.disk_mut().restore(&PathSnapshot::load(path)?)?;
    }

    println!("Loading {} processes.", records.len());
    let report = driver.load(&records);
    for (pid, err) in &report.skipped {
        println!("...Failed to spawn {}: {}", pid, err);
    }

    print_status(&driver.status());

    let summary = driver.run();

    println!("\nFinished after {} ticks.", summary.ticks);
    println!("... PID | Completed at tick");
    println!("...-----|------------------");
    for (pid, tick) in &summary.completed {
        println!("... {:>3} | {}", pid.to_string(), tick);
    }
    if !summary.unfinished.is_empty() {
        let unfinished: Vec<String> = summary.unfinished.iter().map(ToString::to_string).collect();
        println!("...Unfinished: {}", unfinished.join(", "));
    }

    print_status(&driver.status());

    if let Some(path) = &args.snapshot {
        save_snapshot(&driver.disk().snapshot(), path)?;
    }

    Ok(())
}

fn save_snapshot(snapshot: &PathSnapshot, path: &Path) -> Result<()> {
    snapshot
        .save(path)
        .with_context(|| format!("failed to save snapshot to {}", path.display()))
}

fn print_status(status: &StatusReport) {
    println!("\nStatus at tick {}:", status.clock);

    println!("...Available memory:");
    for (bucket, blocks) in &status.memory {
        println!("......{}: {} blocks", bucket, blocks);
    }

    println!("...Resources:");
    for (kind, units) in &status.resources {
        for (index, available) in units.iter().enumerate() {
            let state = if *available { "AVAILABLE" } else { "ALLOCATED" };
            println!("......{} {}: {}", kind, index, state);
        }
    }

    let used = status.disk.iter().filter(|path| path.is_some()).count();
    println!("...Disk: {}/{} blocks used", used, status.disk.len());
    for (block, path) in status.disk.iter().enumerate() {
        if let Some(path) = path {
            println!("......Block {}: {}", block, path);
        }
    }

    println!("...Queues:");
    for (priority, pids) in &status.queues {
        let pids: Vec<String> = pids.iter().map(ToString::to_string).collect();
        println!("......Priority {}: [{}]", priority, pids.join(", "));
    }
}
