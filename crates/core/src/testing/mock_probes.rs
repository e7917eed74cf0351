//! Fixed-value resource probes.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::gate::{MemoryProbe, ThermalProbe};

/// Memory probe reporting a settable value.
#[derive(Debug, Default)]
pub struct StaticMemoryProbe {
    free_bytes: AtomicU64,
    failing: AtomicBool,
}

impl StaticMemoryProbe {
    pub fn new(free_bytes: u64) -> Self {
        Self {
            free_bytes: AtomicU64::new(free_bytes),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_free_bytes(&self, bytes: u64) {
        self.free_bytes.store(bytes, Ordering::SeqCst);
    }

    /// Make the probe return an error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl MemoryProbe for StaticMemoryProbe {
    fn free_memory_bytes(&self) -> io::Result<u64> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "probe failure"));
        }
        Ok(self.free_bytes.load(Ordering::SeqCst))
    }
}

/// Thermal probe with a settable verdict.
#[derive(Debug, Default)]
pub struct StaticThermalProbe {
    throttled: AtomicBool,
}

impl StaticThermalProbe {
    pub fn new(throttled: bool) -> Self {
        Self {
            throttled: AtomicBool::new(throttled),
        }
    }

    pub fn set_throttled(&self, throttled: bool) {
        self.throttled.store(throttled, Ordering::SeqCst);
    }
}

impl ThermalProbe for StaticThermalProbe {
    fn is_throttled(&self) -> bool {
        self.throttled.load(Ordering::SeqCst)
    }
}
