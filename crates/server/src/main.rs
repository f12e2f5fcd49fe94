mod bootstrap;
mod health;

use std::sync::Arc;

use anyhow::Result;
use suggestbox_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use suggestbox_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.runner.status(),
        Arc::clone(&app.ledger),
    )
    .await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "suggestbox-server started"
    );

    let running = app.runner.start();
    tokio::pin!(running);

    tokio::select! {
        outcome = &mut running => {
            outcome?;
            tracing::info!(
                event_name = "system.server.gateway_closed",
                correlation_id = "shutdown",
                "gateway stream closed; stopping"
            );
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!(
                event_name = "system.server.stopping",
                correlation_id = "shutdown",
                "suggestbox-server stopping"
            );
            app.runner.stop();
            running.await?;
        }
    }

    Ok(())
}
