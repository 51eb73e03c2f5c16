use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use sysinfo::{Pid, System};
use tracing::warn;

use super::traits::MemoryProbe;

/// Resident memory of the current process, read through sysinfo
pub struct ProcessMemory {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl ProcessMemory {
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| warn!(error = e, "Cannot resolve current pid, memory readings disabled"))
            .ok();
        Self {
            pid,
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for ProcessMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessMemory {
    fn used_bytes(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        if !system.refresh_process(pid) {
            return None;
        }
        system.process(pid).map(|process| process.memory())
    }
}

/// Memory reading set by hand
///
/// Useful to disable the ceiling check or to simulate memory pressure.
#[derive(Debug, Default)]
pub struct FixedMemory {
    bytes: AtomicU64,
}

impl FixedMemory {
    pub fn new(bytes: u64) -> Self {
        Self {
            bytes: AtomicU64::new(bytes),
        }
    }

    pub fn set(&self, bytes: u64) {
        self.bytes.store(bytes, Ordering::Relaxed);
    }
}

impl MemoryProbe for FixedMemory {
    fn used_bytes(&self) -> Option<u64> {
        Some(self.bytes.load(Ordering::Relaxed))
    }
}
