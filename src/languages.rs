//! Language configuration for compilation and execution

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

use crate::error::EngineError;
use crate::limits::ResourceLimits;

/// Supported languages.
///
/// The enumeration is closed: each variant selects a sandbox profile, an
/// interpreter/compiler invocation, a security filter rule set, and a default
/// resource profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    Cpp,
    Java,
}

impl Language {
    /// Canonical key used in the language table.
    pub fn key(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Cpp => "cpp",
            Language::Java => "java",
        }
    }

    /// Whether source code must be compiled before it can run.
    pub fn needs_build(self) -> bool {
        matches!(self, Language::Cpp | Language::Java)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Language {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "python" | "py" | "python3" => Ok(Language::Python),
            "cpp" | "c++" | "cxx" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            other => Err(EngineError::Validation(format!(
                "unsupported language: {}",
                other
            ))),
        }
    }
}

/// Configuration for a supported programming language.
#[derive(Debug, Clone)]
pub struct LanguageSpec {
    /// Name of the source file (e.g., "main.py")
    pub source_file: String,
    /// Run command as it executes inside the sandbox
    pub run_command: Vec<String>,
    /// Sandbox profile file name, relative to the profile directory
    pub profile: String,
    /// Default resource profile (falls back to the global default when absent)
    pub limits: Option<ResourceLimits>,
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageSpec {
    source_file: String,
    run_command: String,
    profile: String,
    #[serde(default)]
    limits: Option<ResourceLimits>,
}

#[derive(Debug, Deserialize)]
struct RawTable {
    defaults: ResourceLimits,
    languages: HashMap<String, RawLanguageSpec>,
}

const EMBEDDED_TABLE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));

/// Language table loaded from the embedded TOML file.
///
/// Held by the engine rather than a process-global so that limit resolution
/// stays a pure lookup.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    python: LanguageSpec,
    cpp: LanguageSpec,
    java: LanguageSpec,
    defaults: ResourceLimits,
}

impl LanguageTable {
    /// Parse the embedded language table.
    pub fn load() -> anyhow::Result<Self> {
        Self::parse(EMBEDDED_TABLE)
    }

    fn parse(content: &str) -> anyhow::Result<Self> {
        let raw: RawTable = toml::from_str(content).context("invalid language table")?;

        let mut specs: HashMap<String, LanguageSpec> = raw
            .languages
            .into_iter()
            .map(|(name, raw)| {
                let spec = LanguageSpec {
                    source_file: raw.source_file,
                    run_command: into_command(&raw.run_command),
                    profile: raw.profile,
                    limits: raw.limits,
                };
                (name, spec)
            })
            .collect();

        let mut take = |key: &str| {
            specs
                .remove(key)
                .with_context(|| format!("language table is missing [languages.{}]", key))
        };

        Ok(Self {
            python: take("python")?,
            cpp: take("cpp")?,
            java: take("java")?,
            defaults: raw.defaults,
        })
    }

    /// Get the configuration for a language.
    pub fn spec(&self, language: Language) -> &LanguageSpec {
        match language {
            Language::Python => &self.python,
            Language::Cpp => &self.cpp,
            Language::Java => &self.java,
        }
    }

    /// Resolve the limits for an execution.
    ///
    /// A caller-supplied profile is used verbatim; otherwise the language
    /// default applies, and the global default covers languages without one.
    pub fn resolve_limits(
        &self,
        language: Language,
        override_limits: Option<ResourceLimits>,
    ) -> ResourceLimits {
        match override_limits {
            Some(limits) => limits,
            None => self
                .spec(language)
                .limits
                .clone()
                .unwrap_or_else(|| self.defaults.clone()),
        }
    }
}

fn into_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_covers_all_languages() {
        let table = LanguageTable::load().unwrap();

        assert_eq!(table.spec(Language::Python).source_file, "main.py");
        assert_eq!(table.spec(Language::Cpp).source_file, "main.cpp");
        assert_eq!(table.spec(Language::Java).source_file, "Main.java");
        assert!(table
            .spec(Language::Java)
            .run_command
            .contains(&"Main".to_string()));
    }

    #[test]
    fn language_aliases_parse() {
        assert_eq!("py".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("Python3".parse::<Language>().unwrap(), Language::Python);
        assert_eq!("c++".parse::<Language>().unwrap(), Language::Cpp);
        assert_eq!("JAVA".parse::<Language>().unwrap(), Language::Java);
        assert!("rust".parse::<Language>().is_err());
    }

    #[test]
    fn override_limits_used_verbatim() {
        let table = LanguageTable::load().unwrap();
        let custom = ResourceLimits {
            memory_mb: 1024,
            cpu_time_secs: 9,
            wall_time_secs: 20,
            max_output_bytes: 42,
            max_processes: 2,
            max_files: 8,
        };

        let resolved = table.resolve_limits(Language::Python, Some(custom.clone()));
        assert_eq!(resolved, custom);
    }

    #[test]
    fn language_defaults_apply_without_override() {
        let table = LanguageTable::load().unwrap();

        let python = table.resolve_limits(Language::Python, None);
        assert_eq!(python.wall_time_secs, 3);

        let java = table.resolve_limits(Language::Java, None);
        assert_eq!(java.memory_mb, 512);
        assert_eq!(java.max_processes, 64);
    }

    #[test]
    fn missing_limits_fall_back_to_defaults() {
        let table = LanguageTable::parse(
            r#"
[defaults]
memory_mb = 128
cpu_time_secs = 1
wall_time_secs = 2
max_output_bytes = 4096
max_processes = 4
max_files = 16

[languages.python]
source_file = "main.py"
run_command = "/usr/bin/python3 /box/main.py"
profile = "python.cfg"

[languages.cpp]
source_file = "main.cpp"
run_command = "/box/build/main"
profile = "cpp.cfg"

[languages.java]
source_file = "Main.java"
run_command = "/usr/bin/java -cp /box/build Main"
profile = "java.cfg"
"#,
        )
        .unwrap();

        let resolved = table.resolve_limits(Language::Cpp, None);
        assert_eq!(resolved.memory_mb, 128);
        assert_eq!(resolved.max_output_bytes, 4096);
    }

    #[test]
    fn run_command_splits_on_whitespace() {
        let table = LanguageTable::load().unwrap();
        let cmd = &table.spec(Language::Python).run_command;
        assert_eq!(cmd[0], "/usr/bin/python3");
        assert_eq!(cmd[1], "/box/main.py");
    }
}
