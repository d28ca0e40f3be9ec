//! Sandbox module - Low-level wrapper around the external sandbox tool
//!
//! This module provides:
//! - The launcher contract (`Sandbox` trait) and its nsjail implementation
//! - Outcome classification into a closed `ExecutionStatus` set
//! - Best-effort cgroup usage accounting
//!
//! The sandbox module does NOT:
//! - Run the security filter (that happens strictly earlier)
//! - Know about languages or compilation
//! - Manage workspace lifecycle

pub mod accounting;
pub mod nsjail;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::limits::ResourceLimits;

/// Exit code reported when the wall-clock deadline forces a kill. Matches
/// the sandbox tool's own timeout sentinel so both paths classify alike.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Exit code observed when the kernel OOM-kills the target (128 + SIGKILL).
pub const OOM_EXIT_CODE: i32 = 137;

/// Exit code reported when the sandbox tool itself could not be started.
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = -1;

/// Terminal classification of a sandboxed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Ok,
    TimeLimit,
    MemoryLimit,
    RuntimeError,
    OutputLimit,
    /// Reserved for the pre-flight security filter; never produced by the
    /// launcher itself.
    SecurityViolation,
    SystemError,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Ok => "ok",
            ExecutionStatus::TimeLimit => "time_limit",
            ExecutionStatus::MemoryLimit => "memory_limit",
            ExecutionStatus::RuntimeError => "runtime_error",
            ExecutionStatus::OutputLimit => "output_limit",
            ExecutionStatus::SecurityViolation => "security_violation",
            ExecutionStatus::SystemError => "system_error",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of a sandboxed execution, produced exactly once per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    /// Captured stdout, truncated to the output cap
    pub stdout: String,
    /// Captured stderr, truncated to the output cap
    pub stderr: String,
    pub exit_code: i32,
    pub cpu_time_ms: u64,
    pub wall_time_ms: u64,
    pub memory_kb: u64,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Ok
    }
}

/// A host directory exposed inside the sandbox's filesystem view.
#[derive(Debug, Clone)]
pub struct BindMount {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub writable: bool,
}

impl BindMount {
    pub fn read_only(source: impl AsRef<Path>, dest: impl AsRef<Path>) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            dest: dest.as_ref().to_path_buf(),
            writable: false,
        }
    }

    pub fn read_write(source: impl AsRef<Path>, dest: impl AsRef<Path>) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            dest: dest.as_ref().to_path_buf(),
            writable: true,
        }
    }

    /// `source:destination` argument form consumed by the sandbox tool.
    pub(crate) fn spec(&self) -> String {
        format!("{}:{}", self.source.display(), self.dest.display())
    }
}

/// Everything the launcher needs for one sandboxed run.
#[derive(Debug, Clone)]
pub struct SandboxInvocation {
    /// Sandbox profile file for the language
    pub profile: PathBuf,
    /// Target command and arguments, as sandboxed argv
    pub command: Vec<String>,
    /// Full stdin payload (possibly empty)
    pub stdin: Vec<u8>,
    pub limits: ResourceLimits,
    pub mounts: Vec<BindMount>,
    /// Cgroup leaf consulted for post-mortem usage accounting
    pub cgroup: String,
}

/// Launcher contract.
///
/// `launch` never errors for normal failure classes (timeout, nonzero exit,
/// oversized output); every terminal condition is an `ExecutionResult`. A
/// sandbox tool that cannot be started resolves to `SystemError`.
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn launch(&self, invocation: &SandboxInvocation) -> ExecutionResult;
}

/// Map an exit code to a status. Output-cap and deadline handling happen in
/// the launcher; this covers the exit-code rows of the classification table.
pub(crate) fn classify_exit(exit_code: i32) -> ExecutionStatus {
    match exit_code {
        TIMEOUT_EXIT_CODE => ExecutionStatus::TimeLimit,
        OOM_EXIT_CODE => ExecutionStatus::MemoryLimit,
        0 => ExecutionStatus::Ok,
        _ => ExecutionStatus::RuntimeError,
    }
}

pub use nsjail::NsjailSandbox;
