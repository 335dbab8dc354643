mod bootstrap;
mod bot;
mod http;
mod yelp;

use anyhow::Result;
use grub_core::config::{AppConfig, LoadOptions};
use grub_core::{BotError, DialogueEngine};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use grub_core::config::LogFormat::*;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)
        .await
        .map_err(|error| fatal(BotError::Configuration(error.to_string())))?;

    http::spawn(
        &app.config.server.bind_address,
        app.config.server.port,
        http::HttpState::new(app.dialogue.clone(), app.webhook_dispatcher.clone()),
        &app.config.server.static_dir,
    )
    .await?;

    let sweeper =
        DialogueEngine::spawn_sweeper(app.dialogue.clone(), app.config.dialogue.sweep_interval());

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bot_user_id = %app.bot_user_id,
        port = app.config.server.port,
        "grub-server started"
    );

    let outcome = tokio::select! {
        result = app.slack_runner.start() => result
            .map_err(|error| fatal(BotError::TransportFatal(error.to_string()))),
        signal = wait_for_shutdown() => signal,
    };

    sweeper.abort();
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "grub-server stopping"
    );

    outcome
}

fn fatal(error: BotError) -> anyhow::Error {
    tracing::error!(
        event_name = "system.server.fatal",
        correlation_id = "runtime",
        fatal = error.is_fatal(),
        error = %error,
        "grub-server cannot continue; exiting"
    );
    anyhow::Error::new(error)
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
