use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};

use super::{Pid, Process, ProcessHandle};

use crate::config::ResourceConfig;
use crate::error::ResourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Scanner,
    Printer,
    Modem,
    StorageDevice,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Scanner,
        ResourceKind::Printer,
        ResourceKind::Modem,
        ResourceKind::StorageDevice,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Scanner => "scanner",
            ResourceKind::Printer => "printer",
            ResourceKind::Modem => "modem",
            ResourceKind::StorageDevice => "storage device",
        };
        f.write_str(name)
    }
}

/// Handle to one unit: its kind and position in that kind's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId {
    pub kind: ResourceKind,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUnit {
    pub kind: ResourceKind,
    pub owner: Option<ProcessHandle>,
}

impl ResourceUnit {
    pub fn is_available(&self) -> bool {
        self.owner.is_none()
    }
}

/// Four independent pools of interchangeable peripheral units.
///
/// Never blocks. An exhausted pool is reported to the caller.
#[derive(Debug)]
pub struct ResourcePool {
    pools: BTreeMap<ResourceKind, Vec<ResourceUnit>>,
}

impl ResourcePool {
    pub fn new(scanners: usize, printers: usize, modems: usize, storage_devices: usize) -> ResourcePool {
        let pools = [
            (ResourceKind::Scanner, scanners),
            (ResourceKind::Printer, printers),
            (ResourceKind::Modem, modems),
            (ResourceKind::StorageDevice, storage_devices),
        ]
        .into_iter()
        .map(|(kind, count)| (kind, vec![ResourceUnit { kind, owner: None }; count]))
        .collect();

        ResourcePool { pools }
    }

    pub fn from_config(config: &ResourceConfig) -> ResourcePool {
        ResourcePool::new(config.scanners, config.printers, config.modems, config.storage_devices)
    }

    pub fn units(&self, kind: ResourceKind) -> &[ResourceUnit] {
        &self.pools[&kind]
    }

    fn unit_mut(&mut self, unit: UnitId) -> &mut ResourceUnit {
        let units = self
            .pools
            .get_mut(&unit.kind)
            .unwrap_or_else(|| panic!("{} pool missing", unit.kind));
        &mut units[unit.index]
    }

    pub fn has_available(&self, kind: ResourceKind) -> bool {
        self.units(kind).iter().any(ResourceUnit::is_available)
    }

    /// First free unit of `kind` in pool order. Does not reserve it.
    pub fn acquire(&self, kind: ResourceKind) -> Option<UnitId> {
        self.units(kind)
            .iter()
            .position(ResourceUnit::is_available)
            .map(|index| UnitId { kind, index })
    }

    /// Hands `unit` to `process`. Realtime processes are always refused.
    ///
    /// # Panics
    /// If `unit` does not name a unit in this pool.
    pub fn allocate(&mut self, unit: UnitId, process: &Process) -> Result<(), ResourceError> {
        if process.get_priority().is_realtime() {
            warn!("{} denied for realtime process {}", unit.kind, process.get_pid());
            return Err(ResourceError::RealtimeDenied(process.get_pid()));
        }

        let slot = self.unit_mut(unit);
        if let Some(owner) = slot.owner {
            return Err(ResourceError::Occupied {
                kind: unit.kind,
                index: unit.index,
                owner: owner.pid,
            });
        }

        slot.owner = Some(process.handle());
        debug!("{} {} allocated to {}", unit.kind, unit.index, process.get_pid());
        Ok(())
    }

    pub fn release(&mut self, unit: UnitId) {
        self.unit_mut(unit).owner = None;
    }

    /// Releases every unit held by `pid`, returning the freed handles.
    pub fn release_all(&mut self, pid: Pid) -> Vec<UnitId> {
        let mut freed = Vec::new();

        for (kind, units) in self.pools.iter_mut() {
            for (index, unit) in units.iter_mut().enumerate() {
                if unit.owner.map(|owner| owner.pid) == Some(pid) {
                    unit.owner = None;
                    freed.push(UnitId { kind: *kind, index });
                }
            }
        }

        freed
    }

    /// Per kind, one availability flag per unit in pool order.
    pub fn availability(&self) -> Vec<(ResourceKind, Vec<bool>)> {
        self.pools
            .iter()
            .map(|(kind, units)| (*kind, units.iter().map(ResourceUnit::is_available).collect()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::process_control_block::test_record;

    fn process(id: usize, priority: u8) -> Process {
        Process::new(Pid(id), &test_record(0, priority, 1))
    }

    #[test]
    fn test_resources_acquire_returns_first_free_unit() {
        let mut pool = ResourcePool::new(1, 2, 1, 2);
        let user = process(0, 3);

        let first = pool.acquire(ResourceKind::Printer).unwrap();
        assert_eq!(first, UnitId { kind: ResourceKind::Printer, index: 0 });
        // querying again without allocating returns the same unit
        assert_eq!(pool.acquire(ResourceKind::Printer), Some(first));

        pool.allocate(first, &user).unwrap();
        assert_eq!(pool.acquire(ResourceKind::Printer).map(|unit| unit.index), Some(1));
    }

    #[test]
    fn test_resources_exhausted_pool_reports_none() {
        let mut pool = ResourcePool::new(1, 0, 0, 0);
        let scanner = pool.acquire(ResourceKind::Scanner).unwrap();
        pool.allocate(scanner, &process(0, 2)).unwrap();

        assert!(!pool.has_available(ResourceKind::Scanner));
        assert_eq!(pool.acquire(ResourceKind::Scanner), None);
        assert_eq!(pool.acquire(ResourceKind::Printer), None);
    }

    #[test]
    fn test_resources_realtime_always_denied() {
        let mut pool = ResourcePool::new(1, 1, 1, 1);
        let realtime = process(3, 0);

        for kind in ResourceKind::ALL {
            let unit = pool.acquire(kind).unwrap();
            assert_eq!(pool.allocate(unit, &realtime), Err(ResourceError::RealtimeDenied(Pid(3))));
            assert!(pool.units(kind)[unit.index].owner.is_none());
        }
    }

    #[test]
    fn test_resources_occupied_unit_is_not_stolen() {
        let mut pool = ResourcePool::new(0, 1, 0, 0);
        let unit = pool.acquire(ResourceKind::Printer).unwrap();
        pool.allocate(unit, &process(0, 3)).unwrap();

        let result = pool.allocate(unit, &process(1, 1));

        assert_eq!(
            result,
            Err(ResourceError::Occupied { kind: ResourceKind::Printer, index: 0, owner: Pid(0) })
        );
    }

    #[test]
    fn test_resources_release_frees_unit() {
        let mut pool = ResourcePool::new(0, 0, 1, 0);
        let modem = pool.acquire(ResourceKind::Modem).unwrap();
        pool.allocate(modem, &process(0, 1)).unwrap();

        pool.release(modem);

        assert!(pool.has_available(ResourceKind::Modem));
    }

    #[test]
    fn test_resources_release_all_only_frees_owner() {
        let mut pool = ResourcePool::new(1, 2, 0, 0);
        let a = process(0, 3);
        let b = process(1, 3);
        pool.allocate(pool.acquire(ResourceKind::Scanner).unwrap(), &a).unwrap();
        pool.allocate(pool.acquire(ResourceKind::Printer).unwrap(), &b).unwrap();
        pool.allocate(pool.acquire(ResourceKind::Printer).unwrap(), &a).unwrap();

        let freed = pool.release_all(Pid(0));

        assert_eq!(freed.len(), 2);
        assert_eq!(
            pool.availability(),
            vec![
                (ResourceKind::Scanner, vec![true]),
                (ResourceKind::Printer, vec![false, true]),
                (ResourceKind::Modem, vec![]),
                (ResourceKind::StorageDevice, vec![]),
            ]
        );
    }
}
