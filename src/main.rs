use clap::Parser;
use shadow_lights::{handle_event, Handlers, SkillConfig, WebSocketShadowStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

/// Answer one voice-platform event from the shadow of a light bridge
#[derive(Parser, Debug)]
#[command(name = "shadow-lights", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "shadow-lights.toml")]
    config: PathBuf,
    /// File holding the event JSON; read from stdin when omitted
    #[arg(long)]
    event: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = SkillConfig::load(&cli.config)?;

    let raw = match &cli.event {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
            let mut raw = String::new();
            tokio::io::stdin().read_to_string(&mut raw).await?;
            raw
        }
    };
    let event = serde_json::from_str(&raw)?;

    let store = WebSocketShadowStore::connect(config.store_url.clone(), config.request_timeout()).await?;
    let handlers = Handlers::new(&config, Arc::new(store));

    let response = handle_event(&handlers, event).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
