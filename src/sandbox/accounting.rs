//! Best-effort resource usage accounting
//!
//! Reads the kernel accounting counters for the sandboxed cgroup. Any read
//! or parse failure returns the supplied fallback; accounting is telemetry,
//! never a control path.

use std::fs;
use std::path::{Path, PathBuf};

pub struct UsageAccountant {
    cgroup_dir: PathBuf,
}

impl UsageAccountant {
    pub fn new(cgroup_dir: impl Into<PathBuf>) -> Self {
        Self {
            cgroup_dir: cgroup_dir.into(),
        }
    }

    /// CPU time consumed by the sandboxed group, in milliseconds.
    pub fn cpu_time_ms(&self, fallback: u64) -> u64 {
        self.read_cpu_ns()
            .map(|ns| ns / 1_000_000)
            .unwrap_or(fallback)
    }

    /// Peak memory of the sandboxed group, in KB.
    pub fn memory_kb(&self, fallback: u64) -> u64 {
        self.read_memory_bytes()
            .map(|bytes| bytes / 1024)
            .unwrap_or(fallback)
    }

    fn read_cpu_ns(&self) -> Option<u64> {
        // cgroup v1 cpuacct counter, nanoseconds
        if let Some(ns) = read_u64(&self.cgroup_dir.join("cpuacct.usage")) {
            return Some(ns);
        }
        // cgroup v2 reports microseconds in cpu.stat
        let stat = fs::read_to_string(self.cgroup_dir.join("cpu.stat")).ok()?;
        parse_usage_usec(&stat).map(|usec| usec * 1000)
    }

    fn read_memory_bytes(&self) -> Option<u64> {
        // memory.peak on cgroup v2 (kernel 5.19+), max_usage_in_bytes on v1
        read_u64(&self.cgroup_dir.join("memory.peak"))
            .or_else(|| read_u64(&self.cgroup_dir.join("memory.max_usage_in_bytes")))
    }
}

fn read_u64(path: &Path) -> Option<u64> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn parse_usage_usec(content: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("usage_usec"), Some(value)) => value.parse().ok(),
            _ => None,
        }
    })
}
