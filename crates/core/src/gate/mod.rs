//! Admission checks against host resources.
//!
//! The gate is consulted once per job, before any work is done. Thermal state is
//! checked first; a throttled host rejects regardless of memory.

mod probe;

pub use probe::{
    MemoryProbe, SysfsThermalMonitor, SystemMemoryProbe, ThermalProbe, DEFAULT_THERMAL_THRESHOLD,
    DEFAULT_THERMAL_ZONE,
};

use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    Accept,
    RejectThermal,
    RejectMemory,
}

/// Resource readings taken for one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceSnapshot {
    /// `None` when the memory probe failed.
    pub free_memory_bytes: Option<u64>,
    pub thermal_throttled: bool,
}

/// Stateless admission gate.
pub struct ResourceGate {
    memory: Arc<dyn MemoryProbe>,
    thermal: Option<Arc<dyn ThermalProbe>>,
    min_free_bytes: u64,
}

impl ResourceGate {
    pub fn new(memory: Arc<dyn MemoryProbe>, min_free_bytes: u64) -> Self {
        Self {
            memory,
            thermal: None,
            min_free_bytes,
        }
    }

    pub fn with_thermal_probe(mut self, probe: Arc<dyn ThermalProbe>) -> Self {
        self.thermal = Some(probe);
        self
    }

    pub fn min_free_bytes(&self) -> u64 {
        self.min_free_bytes
    }

    /// Read both probes.
    pub fn snapshot(&self) -> ResourceSnapshot {
        let thermal_throttled = self
            .thermal
            .as_ref()
            .map(|probe| probe.is_throttled())
            .unwrap_or(false);

        let free_memory_bytes = match self.memory.free_memory_bytes() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "Memory probe failed, admitting without memory check");
                None
            }
        };

        ResourceSnapshot {
            free_memory_bytes,
            thermal_throttled,
        }
    }

    pub fn admit(&self) -> Admission {
        self.decide(&self.snapshot())
    }

    /// Apply the admission rules to a snapshot.
    pub fn decide(&self, snapshot: &ResourceSnapshot) -> Admission {
        if snapshot.thermal_throttled {
            return Admission::RejectThermal;
        }
        match snapshot.free_memory_bytes {
            Some(free) if free < self.min_free_bytes => Admission::RejectMemory,
            _ => Admission::Accept,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StaticMemoryProbe, StaticThermalProbe};

    const MB: u64 = 1024 * 1024;

    fn gate(free: u64, floor: u64) -> ResourceGate {
        ResourceGate::new(Arc::new(StaticMemoryProbe::new(free)), floor)
    }

    #[test]
    fn test_accepts_with_enough_memory() {
        assert_eq!(gate(512 * MB, 256 * MB).admit(), Admission::Accept);
    }

    #[test]
    fn test_floor_is_inclusive_for_acceptance() {
        assert_eq!(gate(256 * MB, 256 * MB).admit(), Admission::Accept);
    }

    #[test]
    fn test_rejects_below_floor_for_any_floor() {
        for floor in [1, MB, 256 * MB, 4096 * MB, u64::MAX] {
            assert_eq!(gate(floor - 1, floor).admit(), Admission::RejectMemory);
        }
        assert_eq!(gate(0, 0).admit(), Admission::Accept);
    }

    #[test]
    fn test_thermal_checked_first() {
        let gate = gate(0, 256 * MB).with_thermal_probe(Arc::new(StaticThermalProbe::new(true)));
        assert_eq!(gate.admit(), Admission::RejectThermal);
    }

    #[test]
    fn test_cool_probe_does_not_reject() {
        let gate =
            gate(512 * MB, 256 * MB).with_thermal_probe(Arc::new(StaticThermalProbe::new(false)));
        assert_eq!(gate.admit(), Admission::Accept);
    }

    #[test]
    fn test_failing_memory_probe_admits() {
        let probe = StaticMemoryProbe::new(0);
        probe.set_failing(true);
        let gate = ResourceGate::new(Arc::new(probe), 256 * MB);

        let snapshot = gate.snapshot();
        assert_eq!(snapshot.free_memory_bytes, None);
        assert_eq!(gate.admit(), Admission::Accept);
    }
}
