//! Static security filter
//!
//! Rejects obviously dangerous source code before any process is spawned.
//! This is advisory defense-in-depth in front of the sandbox, not a
//! substitute for it: a match prevents spawning entirely.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::EngineError;
use crate::languages::Language;

/// Maximum accepted source size in bytes.
pub const MAX_SOURCE_BYTES: usize = 1024 * 1024;

type RuleSet = Vec<(&'static str, Regex)>;

fn compile(rules: &[(&'static str, &'static str)]) -> RuleSet {
    rules
        .iter()
        .map(|(label, pattern)| (*label, Regex::new(pattern).unwrap()))
        .collect()
}

fn python_rules() -> &'static RuleSet {
    static RULES: OnceLock<RuleSet> = OnceLock::new();
    RULES.get_or_init(|| {
        compile(&[
            ("eval(", r"\beval\s*\("),
            ("exec(", r"\bexec\s*\("),
            ("compile(", r"\bcompile\s*\("),
            ("__import__", r"__import__"),
            ("importlib", r"\bimportlib\b"),
            ("subprocess", r"\bsubprocess\b"),
            ("os.system", r"\bos\s*\.\s*system\b"),
            ("os.popen", r"\bos\s*\.\s*popen\b"),
            ("os.exec", r"\bos\s*\.\s*exec\w*\b"),
            ("socket", r"\bsocket\b"),
            ("ctypes", r"\bctypes\b"),
            ("shutil.rmtree", r"\bshutil\s*\.\s*rmtree\b"),
            ("system path access", r#"open\s*\(\s*["']/+(etc|proc|sys)"#),
        ])
    })
}

fn cpp_rules() -> &'static RuleSet {
    static RULES: OnceLock<RuleSet> = OnceLock::new();
    RULES.get_or_init(|| {
        compile(&[
            ("system(", r"\bsystem\s*\("),
            ("popen(", r"\bpopen\s*\("),
            ("exec family", r"\bexec[lv]p?e?\s*\("),
            ("fork(", r"\bfork\s*\("),
            ("vfork(", r"\bvfork\s*\("),
            ("clone(", r"\bclone\s*\("),
            ("socket header", r"#\s*include\s*<sys/socket\.h>"),
            ("netinet header", r"#\s*include\s*<netinet/"),
            ("inline assembly", r"\b(asm|__asm__)\b"),
            ("system path access", r#"["']/+(etc|proc|sys)"#),
        ])
    })
}

fn java_rules() -> &'static RuleSet {
    static RULES: OnceLock<RuleSet> = OnceLock::new();
    RULES.get_or_init(|| {
        compile(&[
            ("Runtime.getRuntime", r"Runtime\s*\.\s*getRuntime"),
            ("ProcessBuilder", r"\bProcessBuilder\b"),
            ("reflection", r"java\s*\.\s*lang\s*\.\s*reflect"),
            ("System.exit", r"System\s*\.\s*exit\s*\("),
            ("java.net", r"\bjava\s*\.\s*net\s*\."),
            ("ClassLoader", r"\bClassLoader\b"),
            ("sun.misc.Unsafe", r"sun\s*\.\s*misc\s*\.\s*Unsafe"),
            ("loadLibrary", r"\bloadLibrary\s*\("),
            ("system path access", r#""/+(etc|proc|sys)"#),
        ])
    })
}

fn rules_for(language: Language) -> &'static RuleSet {
    match language {
        Language::Python => python_rules(),
        Language::Cpp => cpp_rules(),
        Language::Java => java_rules(),
    }
}

/// Check source code against the per-language rule table.
///
/// Empty and oversized submissions are rejected before any pattern runs.
/// The first matching rule rejects the whole submission with the offending
/// pattern named.
pub fn check(code: &str, language: Language) -> Result<(), EngineError> {
    if code.trim().is_empty() {
        return Err(EngineError::Validation("source code is empty".into()));
    }
    if code.len() > MAX_SOURCE_BYTES {
        return Err(EngineError::Validation(format!(
            "source code exceeds {} bytes",
            MAX_SOURCE_BYTES
        )));
    }

    for (label, pattern) in rules_for(language) {
        if pattern.is_match(code) {
            return Err(EngineError::SecurityViolation {
                pattern: (*label).to_string(),
            });
        }
    }

    Ok(())
}
