//! Build pipeline for compiled languages
//!
//! Invokes the external compiler into an isolated output directory inside
//! the workspace. Any compile failure short-circuits before the sandbox is
//! ever invoked and surfaces as `EngineError::Compile` carrying the captured
//! diagnostics.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::EngineError;

/// Class the Java entry point must live in.
pub const JAVA_ENTRY_CLASS: &str = "Main";

pub(crate) fn cpp_command(source: &Path, out_binary: &Path) -> Vec<String> {
    vec![
        "g++".to_string(),
        "-std=c++17".to_string(),
        "-O2".to_string(),
        "-static".to_string(),
        "-o".to_string(),
        out_binary.display().to_string(),
        source.display().to_string(),
    ]
}

pub(crate) fn java_command(source: &Path, out_dir: &Path) -> Vec<String> {
    vec![
        "javac".to_string(),
        "-encoding".to_string(),
        "UTF-8".to_string(),
        "-d".to_string(),
        out_dir.display().to_string(),
        source.display().to_string(),
    ]
}

/// Compile a C++ source file into a single static binary.
pub async fn compile_cpp(
    source: &Path,
    out_binary: &Path,
    time_limit_ms: u64,
) -> Result<(), EngineError> {
    run_compiler(&cpp_command(source, out_binary), time_limit_ms).await
}

/// Compile a Java source file into an isolated class directory.
///
/// A zero compiler exit without the expected entry class artifact is itself
/// a failure; some toolchains exit cleanly without producing it.
pub async fn compile_java(
    source: &Path,
    out_dir: &Path,
    time_limit_ms: u64,
) -> Result<(), EngineError> {
    run_compiler(&java_command(source, out_dir), time_limit_ms).await?;
    verify_java_artifact(out_dir)
}

fn verify_java_artifact(out_dir: &Path) -> Result<(), EngineError> {
    let entry = out_dir.join(format!("{}.class", JAVA_ENTRY_CLASS));
    if !entry.exists() {
        return Err(EngineError::Compile {
            diagnostics: format!(
                "compiler exited successfully but produced no {} class",
                JAVA_ENTRY_CLASS
            ),
        });
    }
    Ok(())
}

async fn run_compiler(cmd: &[String], time_limit_ms: u64) -> Result<(), EngineError> {
    let Some((program, args)) = cmd.split_first() else {
        return Err(EngineError::Compile {
            diagnostics: "empty compile command".into(),
        });
    };

    debug!("running compiler: {:?}", cmd);

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            return Err(EngineError::Compile {
                diagnostics: format!("failed to launch {}: {}", program, e),
            })
        }
    };

    let output = match tokio::time::timeout(
        Duration::from_millis(time_limit_ms),
        child.wait_with_output(),
    )
    .await
    {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(EngineError::Compile {
                diagnostics: format!("failed to wait for {}: {}", program, e),
            })
        }
        Err(_) => {
            return Err(EngineError::Compile {
                diagnostics: "compilation timed out".into(),
            })
        }
    };

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let diagnostics = if !stderr.trim().is_empty() {
        stderr
    } else if !stdout.trim().is_empty() {
        stdout
    } else {
        format!(
            "compiler exited with code {}",
            output.status.code().unwrap_or(-1)
        )
    };

    Err(EngineError::Compile { diagnostics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cpp_command_uses_fixed_standard_and_static_linking() {
        let cmd = cpp_command(
            &PathBuf::from("/tmp/ws/main.cpp"),
            &PathBuf::from("/tmp/ws/build/main"),
        );
        assert_eq!(cmd[0], "g++");
        assert!(cmd.contains(&"-std=c++17".to_string()));
        assert!(cmd.contains(&"-O2".to_string()));
        assert!(cmd.contains(&"-static".to_string()));
        assert_eq!(cmd.last().unwrap(), "/tmp/ws/main.cpp");
    }

    #[test]
    fn java_command_sets_source_encoding_and_output_dir() {
        let cmd = java_command(
            &PathBuf::from("/tmp/ws/Main.java"),
            &PathBuf::from("/tmp/ws/build"),
        );
        assert_eq!(cmd[0], "javac");
        assert!(cmd.contains(&"-encoding".to_string()));
        assert!(cmd.contains(&"UTF-8".to_string()));
        let d = cmd.iter().position(|a| a == "-d").unwrap();
        assert_eq!(cmd[d + 1], "/tmp/ws/build");
    }

    #[test]
    fn clean_exit_without_entry_class_is_a_compile_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = verify_java_artifact(dir.path()).unwrap_err();
        match err {
            EngineError::Compile { diagnostics } => {
                assert!(diagnostics.contains("no Main class"))
            }
            other => panic!("expected compile error, got {:?}", other),
        }

        std::fs::write(dir.path().join("Main.class"), b"\xca\xfe\xba\xbe").unwrap();
        assert!(verify_java_artifact(dir.path()).is_ok());
    }

    #[tokio::test]
    async fn missing_compiler_is_a_compile_error() {
        let cmd = vec!["definitely-not-a-compiler".to_string()];
        let err = run_compiler(&cmd, 1000).await.unwrap_err();
        match err {
            EngineError::Compile { diagnostics } => {
                assert!(diagnostics.contains("failed to launch"))
            }
            other => panic!("expected compile error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn nonzero_compiler_exit_carries_diagnostics() {
        // `false` stands in for a compiler that fails without output
        let cmd = vec!["false".to_string()];
        let err = run_compiler(&cmd, 1000).await.unwrap_err();
        match err {
            EngineError::Compile { diagnostics } => {
                assert!(diagnostics.contains("exited with code"))
            }
            other => panic!("expected compile error, got {:?}", other),
        }
    }
}
