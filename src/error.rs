use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::kernel::{Bucket, Pid, Priority, ResourceKind};

/// Memory allocation failures. Both leave the allocator untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocError {
    #[error("{requested} blocks requested but the {bucket} bucket has {available} available")]
    CapacityExceeded {
        bucket: Bucket,
        requested: usize,
        available: usize,
    },
    #[error("no contiguous run of {requested} free blocks in the {bucket} bucket")]
    FragmentationFailure { bucket: Bucket, requested: usize },
}

#[derive(Debug, Error)]
pub enum DiskError {
    #[error("{requested} blocks requested but the disk has {available} available")]
    CapacityExceeded { requested: usize, available: usize },
    #[error("no contiguous run of {requested} free disk blocks")]
    FragmentationFailure { requested: usize },
    #[error("{requester} (priority {requester_priority}) may not delete {path} owned at priority {owner_priority}")]
    PermissionDenied {
        path: String,
        requester: Pid,
        requester_priority: Priority,
        owner_priority: Priority,
    },
    #[error("storage failure for {path}")]
    Storage {
        path: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("realtime process {0} cannot hold peripheral units")]
    RealtimeDenied(Pid),
    #[error("{kind} {index} is already held by {owner}")]
    Occupied {
        kind: ResourceKind,
        index: usize,
        owner: Pid,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("line {line}: expected 8 fields, found {found}")]
    FieldCount { line: usize, found: usize },
    #[error("line {line}: field `{field}` is not a valid number: {value:?}")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },
    #[error("line {line}: field `{field}` out of range: {value}")]
    OutOfRange {
        line: usize,
        field: &'static str,
        value: u64,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot run for {path} at block {start} (length {length}) is outside the disk or overlaps another run")]
    InvalidRun {
        path: String,
        start: usize,
        length: usize,
    },
    #[error("failed to access snapshot file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid snapshot")]
    Parse(#[from] toml::de::Error),
    #[error("failed to encode snapshot")]
    Encode(#[from] toml::ser::Error),
}
