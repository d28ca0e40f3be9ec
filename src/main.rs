use anyhow::{Context, Result};
use tracing::info;

use coderunner::{Engine, EngineConfig, Language};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("coderunner=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let mut args = std::env::args().skip(1);
    let (language, source) = match (args.next(), args.next()) {
        (Some(language), Some(source)) => (language, source),
        _ => {
            eprintln!("usage: coderunner <language> <source-file> [stdin-file]");
            std::process::exit(2);
        }
    };

    let language: Language = language.parse()?;
    let code = std::fs::read_to_string(&source)
        .with_context(|| format!("failed to read source file {}", source))?;
    let stdin = match args.next() {
        Some(path) => Some(
            std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read stdin file {}", path))?,
        ),
        None => None,
    };

    let config = EngineConfig::from_env();
    info!(?config, "starting execution engine");

    let engine = Engine::new(config)?;
    let result = engine.run(language, &code, stdin.as_deref(), None).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
