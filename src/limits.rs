//! Resource limit profiles

use serde::{Deserialize, Serialize};

/// Resource ceilings for a single execution.
///
/// One instance per invocation; either supplied by the caller verbatim or
/// resolved from the per-language default table. Never mutated after
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Memory limit in MB
    pub memory_mb: u32,
    /// CPU time limit in seconds
    pub cpu_time_secs: u32,
    /// Wall clock limit in seconds
    pub wall_time_secs: u32,
    /// Cap on captured bytes per output stream
    pub max_output_bytes: u64,
    /// Maximum number of processes
    pub max_processes: u32,
    /// Maximum open files
    pub max_files: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_mb: 256,
            cpu_time_secs: 2,
            wall_time_secs: 3,
            max_output_bytes: 1024 * 1024,
            max_processes: 16,
            max_files: 64,
        }
    }
}
