//! nsjail-backed sandbox launcher
//!
//! Spawns the sandbox tool with the language profile and per-invocation
//! limit flags, feeds stdin, streams both output pipes under a hard byte
//! cap, and races process exit against the wall-clock deadline.

use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::accounting::UsageAccountant;
use super::{
    classify_exit, ExecutionResult, ExecutionStatus, Sandbox, SandboxInvocation,
    LAUNCH_FAILURE_EXIT_CODE, TIMEOUT_EXIT_CODE,
};

pub struct NsjailSandbox {
    bin: PathBuf,
    cgroup_root: PathBuf,
}

impl NsjailSandbox {
    pub fn new(bin: impl Into<PathBuf>, cgroup_root: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            cgroup_root: cgroup_root.into(),
        }
    }
}

fn build_args(invocation: &SandboxInvocation) -> Vec<String> {
    let limits = &invocation.limits;
    let mut args = vec![
        "--config".to_string(),
        invocation.profile.display().to_string(),
        "--quiet".to_string(),
        format!("--time_limit={}", limits.wall_time_secs),
        format!("--rlimit_cpu={}", limits.cpu_time_secs),
        format!("--cgroup_mem_max={}", u64::from(limits.memory_mb) * 1024 * 1024),
        format!("--cgroup_pids_max={}", limits.max_processes),
        format!("--rlimit_nofile={}", limits.max_files),
    ];

    for mount in &invocation.mounts {
        args.push(if mount.writable {
            "--bindmount".to_string()
        } else {
            "--bindmount_ro".to_string()
        });
        args.push(mount.spec());
    }

    args.push("--".to_string());
    args.extend(invocation.command.iter().cloned());
    args
}

/// One stream's captured bytes plus its size before truncation.
#[derive(Debug, Default)]
struct Capture {
    data: Vec<u8>,
    true_len: u64,
}

/// Drain a stream, keeping at most `cap` bytes. The truncation point is the
/// first byte that pushes the running total over the cap; everything after
/// is discarded but still counted.
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, cap: usize) -> Capture {
    let mut capture = Capture::default();
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                capture.true_len += n as u64;
                if capture.data.len() < cap {
                    let take = (cap - capture.data.len()).min(n);
                    capture.data.extend_from_slice(&buf[..take]);
                }
            }
            Err(_) => break,
        }
    }
    capture
}

async fn collect(task: Option<JoinHandle<Capture>>) -> Capture {
    match task {
        Some(task) => task.await.unwrap_or_default(),
        None => Capture::default(),
    }
}

/// SIGKILL the whole sandbox process group. The tool forks, so killing only
/// the direct child would leave the target running.
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        if let Err(e) = signal::kill(Pid::from_raw(-(pid as i32)), Signal::SIGKILL) {
            debug!("process group kill failed: {}", e);
        }
    }
}

fn launch_failure(message: String) -> ExecutionResult {
    ExecutionResult {
        status: ExecutionStatus::SystemError,
        stdout: String::new(),
        stderr: message,
        exit_code: LAUNCH_FAILURE_EXIT_CODE,
        cpu_time_ms: 0,
        wall_time_ms: 0,
        memory_kb: 0,
    }
}

fn into_string(capture: &Capture) -> String {
    String::from_utf8_lossy(&capture.data).into_owned()
}

#[async_trait]
impl Sandbox for NsjailSandbox {
    async fn launch(&self, invocation: &SandboxInvocation) -> ExecutionResult {
        let limits = &invocation.limits;
        let args = build_args(invocation);
        debug!("running sandbox with args: {:?}", args);

        let mut command = Command::new(&self.bin);
        command
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let started = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return launch_failure(format!(
                    "failed to start sandbox tool {:?}: {}",
                    self.bin, e
                ))
            }
        };
        let pid = child.id();

        let cap = limits.max_output_bytes as usize;
        let stdout_task = child
            .stdout
            .take()
            .map(|pipe| tokio::spawn(read_capped(pipe, cap)));
        let stderr_task = child
            .stderr
            .take()
            .map(|pipe| tokio::spawn(read_capped(pipe, cap)));

        // Feed the full stdin payload and close the pipe. Runs as its own
        // task so a program that never reads stdin cannot stall the race
        // below; the readers above are already draining.
        if let Some(mut stdin_pipe) = child.stdin.take() {
            let payload = invocation.stdin.clone();
            tokio::spawn(async move {
                if let Err(e) = stdin_pipe.write_all(&payload).await {
                    debug!("stdin write ended early: {}", e);
                }
            });
        }

        let accountant = UsageAccountant::new(self.cgroup_root.join(&invocation.cgroup));
        let wall_limit_ms = u64::from(limits.wall_time_secs) * 1000;
        let cpu_limit_ms = u64::from(limits.cpu_time_secs) * 1000;

        let exited = tokio::select! {
            status = child.wait() => Some(status),
            _ = tokio::time::sleep(Duration::from_secs(u64::from(limits.wall_time_secs))) => None,
        };

        let result = match exited {
            // Deadline fired first: termination must be guaranteed, so the
            // whole group gets an unconditional SIGKILL. Post-mortem
            // accounting cannot be trusted here; report the configured
            // limits as the consumed times.
            None => {
                kill_process_group(pid);
                if let Err(e) = child.kill().await {
                    warn!("failed to kill sandboxed process: {}", e);
                }
                let stdout = collect(stdout_task).await;
                let stderr = collect(stderr_task).await;
                let mut result = ExecutionResult {
                    status: ExecutionStatus::TimeLimit,
                    stdout: into_string(&stdout),
                    stderr: into_string(&stderr),
                    exit_code: TIMEOUT_EXIT_CODE,
                    cpu_time_ms: cpu_limit_ms,
                    wall_time_ms: wall_limit_ms,
                    memory_kb: accountant.memory_kb(0),
                };
                apply_output_cap(&mut result, &stdout, &stderr, limits.max_output_bytes);
                result
            }
            Some(Ok(status)) => {
                let wall_time_ms = started.elapsed().as_millis() as u64;
                let stdout = collect(stdout_task).await;
                let stderr = collect(stderr_task).await;

                let exit_code = status
                    .code()
                    .or_else(|| status.signal().map(|sig| 128 + sig))
                    .unwrap_or(-1);

                let mut result = ExecutionResult {
                    status: classify_exit(exit_code),
                    stdout: into_string(&stdout),
                    stderr: into_string(&stderr),
                    exit_code,
                    cpu_time_ms: accountant.cpu_time_ms(wall_time_ms.min(cpu_limit_ms)),
                    wall_time_ms,
                    memory_kb: accountant.memory_kb(0),
                };
                apply_output_cap(&mut result, &stdout, &stderr, limits.max_output_bytes);
                result
            }
            Some(Err(e)) => launch_failure(format!("failed to wait for sandbox: {}", e)),
        };

        debug!(
            "sandbox finished: status={}, exit_code={}, wall_time_ms={}",
            result.status, result.exit_code, result.wall_time_ms
        );
        result
    }
}

/// Output-limit violation takes precedence over the exit-derived status;
/// re-checked regardless of which side of the deadline race won.
fn apply_output_cap(
    result: &mut ExecutionResult,
    stdout: &Capture,
    stderr: &Capture,
    max_output_bytes: u64,
) {
    if stdout.true_len > max_output_bytes || stderr.true_len > max_output_bytes {
        result.status = ExecutionStatus::OutputLimit;
    }
}
