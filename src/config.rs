//! Engine configuration
//!
//! Tool paths and directories are carried in an explicit struct injected at
//! engine construction rather than ambient global state.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the sandbox tool binary.
    pub sandbox_bin: PathBuf,
    /// Directory holding the per-language sandbox profiles.
    pub profile_dir: PathBuf,
    /// Root under which per-invocation workspaces are created.
    pub temp_root: PathBuf,
    /// Root of the sandbox cgroup hierarchy consulted for usage accounting.
    /// Must match the cgroup parent configured in the sandbox profiles.
    pub cgroup_root: PathBuf,
    /// Ceiling on compiler runtime in milliseconds.
    pub compile_time_limit_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sandbox_bin: PathBuf::from("nsjail"),
            profile_dir: PathBuf::from("profiles"),
            temp_root: std::env::temp_dir().join("coderunner"),
            cgroup_root: PathBuf::from("/sys/fs/cgroup/NSJAIL"),
            compile_time_limit_ms: 30_000,
        }
    }
}

impl EngineConfig {
    /// Build a configuration from environment variables, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            sandbox_bin: env_path("SANDBOX_BIN").unwrap_or(default.sandbox_bin),
            profile_dir: env_path("SANDBOX_PROFILE_DIR").unwrap_or(default.profile_dir),
            temp_root: env_path("ENGINE_TEMP_DIR").unwrap_or(default.temp_root),
            cgroup_root: env_path("CGROUP_ROOT").unwrap_or(default.cgroup_root),
            compile_time_limit_ms: std::env::var("COMPILE_TIME_LIMIT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.compile_time_limit_ms),
        }
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key).map(PathBuf::from)
}
