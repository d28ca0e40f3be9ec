//! Execution orchestrator
//!
//! The only entry point external collaborators use. Resolves limits, runs
//! the static security filter, builds compiled languages, and hands the run
//! command to the sandbox launcher. The per-invocation workspace is torn
//! down on every path.

use tracing::{debug, info};

use crate::compile;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::languages::{Language, LanguageTable};
use crate::limits::ResourceLimits;
use crate::sandbox::{BindMount, ExecutionResult, NsjailSandbox, Sandbox, SandboxInvocation};
use crate::security;
use crate::workspace::Workspace;

/// Mount point of the execution workspace inside the sandbox.
const BOX_DIR: &str = "/box";

pub struct Engine {
    config: EngineConfig,
    languages: LanguageTable,
    sandbox: Box<dyn Sandbox>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let sandbox = Box::new(NsjailSandbox::new(
            config.sandbox_bin.clone(),
            config.cgroup_root.clone(),
        ));
        Self::with_sandbox(config, sandbox)
    }

    pub(crate) fn with_sandbox(
        config: EngineConfig,
        sandbox: Box<dyn Sandbox>,
    ) -> Result<Self, EngineError> {
        let languages = LanguageTable::load()?;
        Ok(Self {
            config,
            languages,
            sandbox,
        })
    }

    /// Execute untrusted source code under the sandbox.
    ///
    /// Validation, security filter, and build failures are returned as
    /// errors before any sandbox process starts; every outcome after that is
    /// an [`ExecutionResult`], including `SystemError` when the sandbox tool
    /// itself cannot be launched.
    pub async fn run(
        &self,
        language: Language,
        code: &str,
        stdin: Option<&str>,
        limits: Option<ResourceLimits>,
    ) -> Result<ExecutionResult, EngineError> {
        let limits = self.languages.resolve_limits(language, limits);
        security::check(code, language)?;

        let workspace = Workspace::create(&self.config.temp_root)?;
        debug!(workspace = %workspace.path().display(), %language, "acquired workspace");

        let result = self
            .run_in_workspace(&workspace, language, code, stdin, limits)
            .await;
        workspace.close();
        result
    }

    async fn run_in_workspace(
        &self,
        workspace: &Workspace,
        language: Language,
        code: &str,
        stdin: Option<&str>,
        limits: ResourceLimits,
    ) -> Result<ExecutionResult, EngineError> {
        let spec = self.languages.spec(language);

        let source_path = workspace.write_file(&spec.source_file, code.as_bytes()).await?;
        if let Some(input) = stdin {
            workspace.write_file("stdin.txt", input.as_bytes()).await?;
        }

        match language {
            Language::Python => {}
            Language::Cpp => {
                let build_dir = workspace.build_dir().await?;
                compile::compile_cpp(
                    &source_path,
                    &build_dir.join("main"),
                    self.config.compile_time_limit_ms,
                )
                .await?;
            }
            Language::Java => {
                let build_dir = workspace.build_dir().await?;
                compile::compile_java(&source_path, &build_dir, self.config.compile_time_limit_ms)
                    .await?;
            }
        }

        // The workspace (source plus build artifacts) is visible inside the
        // sandbox read-only; nothing the target writes survives it.
        let invocation = SandboxInvocation {
            profile: self.config.profile_dir.join(&spec.profile),
            command: spec.run_command.clone(),
            stdin: stdin.unwrap_or_default().as_bytes().to_vec(),
            limits,
            mounts: vec![BindMount::read_only(workspace.path(), BOX_DIR)],
            cgroup: workspace.name(),
        };

        info!(%language, "launching sandboxed execution");
        Ok(self.sandbox.launch(&invocation).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::ExecutionStatus;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct MockSandbox {
        calls: Arc<AtomicUsize>,
        last: Arc<Mutex<Option<SandboxInvocation>>>,
    }

    #[async_trait]
    impl Sandbox for MockSandbox {
        async fn launch(&self, invocation: &SandboxInvocation) -> ExecutionResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(invocation.clone());
            ExecutionResult {
                status: ExecutionStatus::Ok,
                stdout: "Hello, World!\n".to_string(),
                stderr: String::new(),
                exit_code: 0,
                cpu_time_ms: 5,
                wall_time_ms: 12,
                memory_kb: 1024,
            }
        }
    }

    struct TestHarness {
        engine: Engine,
        calls: Arc<AtomicUsize>,
        last: Arc<Mutex<Option<SandboxInvocation>>>,
    }

    fn harness(temp_root: &Path) -> TestHarness {
        let config = EngineConfig {
            temp_root: temp_root.to_path_buf(),
            ..EngineConfig::default()
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(Mutex::new(None));
        let engine = Engine::with_sandbox(
            config,
            Box::new(MockSandbox {
                calls: calls.clone(),
                last: last.clone(),
            }),
        )
        .unwrap();
        TestHarness {
            engine,
            calls,
            last,
        }
    }

    fn entries_under(root: &Path) -> usize {
        match std::fs::read_dir(root) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    #[tokio::test]
    async fn python_run_reaches_the_sandbox() {
        let root = tempfile::tempdir().unwrap();
        let h = harness(root.path());

        let result = h
            .engine
            .run(Language::Python, "print(\"Hello, World!\")\n", Some(""), None)
            .await
            .unwrap();

        assert_eq!(result.status, ExecutionStatus::Ok);
        assert_eq!(result.stdout, "Hello, World!\n");
        assert_eq!(result.exit_code, 0);
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);

        let invocation = h.last.lock().unwrap().take().unwrap();
        assert!(invocation.profile.ends_with("python.cfg"));
        assert_eq!(invocation.command[0], "/usr/bin/python3");
        assert_eq!(invocation.mounts.len(), 1);
        assert!(!invocation.mounts[0].writable);
        assert_eq!(invocation.mounts[0].dest, Path::new("/box"));

        // workspace torn down after the run
        assert_eq!(entries_under(root.path()), 0);
    }

    #[tokio::test]
    async fn stdin_payload_is_forwarded() {
        let root = tempfile::tempdir().unwrap();
        let h = harness(root.path());

        h.engine
            .run(Language::Python, "print(input())\n", Some("42\n"), None)
            .await
            .unwrap();

        let invocation = h.last.lock().unwrap().take().unwrap();
        assert_eq!(invocation.stdin, b"42\n");
    }

    #[tokio::test]
    async fn caller_limits_are_used_verbatim() {
        let root = tempfile::tempdir().unwrap();
        let h = harness(root.path());

        let custom = ResourceLimits {
            memory_mb: 64,
            cpu_time_secs: 1,
            wall_time_secs: 2,
            max_output_bytes: 512,
            max_processes: 4,
            max_files: 16,
        };
        h.engine
            .run(Language::Python, "print(1)\n", None, Some(custom.clone()))
            .await
            .unwrap();

        let invocation = h.last.lock().unwrap().take().unwrap();
        assert_eq!(invocation.limits, custom);
    }

    #[tokio::test]
    async fn security_rejection_short_circuits() {
        let root = tempfile::tempdir().unwrap();
        let h = harness(root.path());

        let err = h
            .engine
            .run(Language::Python, "import os\nos.system('ls')\n", None, None)
            .await
            .unwrap_err();

        match err {
            EngineError::SecurityViolation { pattern } => assert_eq!(pattern, "os.system"),
            other => panic!("expected security violation, got {:?}", other),
        }
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
        assert_eq!(entries_under(root.path()), 0);
    }

    #[tokio::test]
    async fn empty_code_is_rejected_before_the_sandbox() {
        let root = tempfile::tempdir().unwrap();
        let h = harness(root.path());

        let err = h
            .engine
            .run(Language::Python, "  \n", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cpp_compile_failure_short_circuits() {
        let root = tempfile::tempdir().unwrap();
        let h = harness(root.path());

        // missing semicolon; also covers hosts without a compiler, where the
        // launch failure maps to the same error class
        let err = h
            .engine
            .run(Language::Cpp, "int main() { return 0 }\n", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Compile { .. }));
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
        assert_eq!(entries_under(root.path()), 0);
    }
}
