use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::prelude::*;
use wizhome::api;
use wizhome::Config;
use wizhome::Engine;
use wizhome::LogLevel;
use wizhome::OpenAiClient;

/// Smart-home simulator driven by a chat model
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "wizhome.toml")]
    config: PathBuf,

    /// Override the configured log level
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::from_file(&args.config)?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(config.logging.filter())
        .init();

    tracing::info!("wizhome starting");
    tracing::info!("Loaded config from: {}", args.config.display());

    let api_key = std::env::var(&config.chat.api_key_env).with_context(|| {
        format!(
            "API key not found: set the {} environment variable",
            config.chat.api_key_env
        )
    })?;
    let chat = OpenAiClient::new(&config.chat, api_key).context("Failed to create HTTP client")?;
    tracing::info!(
        "Using model {} at {}",
        config.chat.model,
        config.chat.endpoint
    );

    let home = config.home.to_home();
    tracing::info!(
        "Home seeded with {} device(s), {} person(s), {} rule(s)",
        home.devices.len(),
        home.people.len(),
        home.rules.len()
    );

    let engine = Arc::new(Engine::new(home, Arc::new(chat)));
    let runner = engine.clone();
    tokio::spawn(async move { runner.run().await });

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        // Wait for Ctrl+C
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received shutdown signal"),
            Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    api::serve(&config.api.listen, config.api.port, engine, shutdown_rx).await?;

    tracing::info!("wizhome shutdown complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let args = Args::parse_from(["wizhome"]);
        assert_eq!(args.config, PathBuf::from("wizhome.toml"));
        assert_eq!(args.log_level, None);

        let args = Args::parse_from(["wizhome", "-c", "/etc/wizhome.toml", "--log-level", "debug"]);
        assert_eq!(args.config, PathBuf::from("/etc/wizhome.toml"));
        assert_eq!(args.log_level, Some(LogLevel::Debug));
    }
}
