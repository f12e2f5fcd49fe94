use std::sync::Arc;
use std::time::Duration;

use suggestbox_chat::{
    gateway::{ChatGateway, TimeoutGateway},
    runner::{GatewayRunner, GatewayTransport, ReconnectPolicy},
    suggestions::{suggestion_dispatcher, SuggestionSettings},
};
use suggestbox_core::config::{AppConfig, ConfigError};
use suggestbox_core::VoteLedger;
use suggestbox_discord::{DiscordGateway, DiscordTransport};
use thiserror::Error;
use tracing::info;

const GATEWAY_READY_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Application {
    pub config: AppConfig,
    pub ledger: Arc<VoteLedger>,
    pub runner: GatewayRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Wires the Discord adapter into the suggestion handlers.
pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    config.validate()?;
    let gateway = Arc::new(DiscordGateway::new(&config.discord.bot_token));
    let transport =
        Arc::new(DiscordTransport::new(config.discord.bot_token.clone(), GATEWAY_READY_TIMEOUT));
    Ok(assemble(config, gateway, transport))
}

pub fn assemble(
    config: AppConfig,
    gateway: Arc<dyn ChatGateway>,
    transport: Arc<dyn GatewayTransport>,
) -> Application {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        intake_channel_id = %config.suggestions.intake_channel_id,
        votes_channel = config.suggestions.votes_channel_id.is_some(),
        "starting application bootstrap"
    );

    let timeout = Duration::from_secs(config.gateway.call_timeout_secs);
    let gateway: Arc<dyn ChatGateway> = Arc::new(TimeoutGateway::new(gateway, timeout));
    let ledger = Arc::new(VoteLedger::new());
    let dispatcher = suggestion_dispatcher(
        gateway,
        Arc::clone(&ledger),
        SuggestionSettings::from(&config.suggestions),
    );
    let runner =
        GatewayRunner::new(transport, dispatcher, ReconnectPolicy::from(&config.gateway));

    Application { config, ledger, runner }
}
