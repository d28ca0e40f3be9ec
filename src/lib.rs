//! Sandboxed multi-language code execution engine
//!
//! Given untrusted source code, an optional stdin payload, and a resource
//! limit profile, the engine compiles the program if needed, runs it under
//! an external OS-level sandbox with hard resource ceilings, and returns a
//! structured [`ExecutionResult`].
//!
//! ```no_run
//! use coderunner::{Engine, EngineConfig, Language};
//!
//! # async fn demo() -> Result<(), coderunner::EngineError> {
//! let engine = Engine::new(EngineConfig::from_env())?;
//! let result = engine
//!     .run(Language::Python, "print(\"Hello, World!\")", None, None)
//!     .await?;
//! println!("{}: {}", result.status, result.stdout);
//! # Ok(())
//! # }
//! ```

pub mod compile;
pub mod config;
pub mod engine;
pub mod error;
pub mod languages;
pub mod limits;
pub mod sandbox;
pub mod security;
pub mod workspace;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use languages::Language;
pub use limits::ResourceLimits;
pub use sandbox::{ExecutionResult, ExecutionStatus};
