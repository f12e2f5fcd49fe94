use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serenity::all::{Client, Context, EventHandler, GatewayIntents, Interaction, Message, Ready};
use serenity::gateway::ShardManager;
use suggestbox_chat::{
    events::{ChatEnvelope, ChatEvent},
    runner::{GatewayTransport, TransportError},
};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::convert;

const INBOUND_BUFFER: usize = 256;

/// Inbound Discord events via serenity's gateway client.
///
/// Each `connect` starts a fresh client task; the envelope stream ends when that client stops.
pub struct DiscordTransport {
    bot_token: SecretString,
    ready_timeout: Duration,
    session: Mutex<Option<Session>>,
}

struct Session {
    inbound: mpsc::Receiver<ChatEnvelope>,
    shard_manager: Arc<ShardManager>,
    failure: Arc<Mutex<Option<String>>>,
}

impl DiscordTransport {
    pub fn new(bot_token: SecretString, ready_timeout: Duration) -> Self {
        Self { bot_token, ready_timeout, session: Mutex::new(None) }
    }
}

#[async_trait]
impl GatewayTransport for DiscordTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let (sender, inbound) = mpsc::channel(INBOUND_BUFFER);
        let (ready_tx, ready_rx) = oneshot::channel();
        let bridge = DiscordBridge { sender, ready: Mutex::new(Some(ready_tx)) };

        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;
        let mut client = Client::builder(self.bot_token.expose_secret(), intents)
            .event_handler(bridge)
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        let shard_manager = Arc::clone(&client.shard_manager);
        let failure = Arc::new(Mutex::new(None));
        let task_failure = Arc::clone(&failure);
        tokio::spawn(async move {
            if let Err(error) = client.start().await {
                warn!(
                    event_name = "ingress.discord.client_stopped",
                    error = %error,
                    "discord client stopped with an error"
                );
                *task_failure.lock().await = Some(error.to_string());
            }
            drop(client);
        });

        match tokio::time::timeout(self.ready_timeout, ready_rx).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                let reason = failure.lock().await.clone();
                return Err(TransportError::Connect(
                    reason.unwrap_or_else(|| "client stopped before ready".to_owned()),
                ));
            }
            Err(_) => {
                shard_manager.shutdown_all().await;
                return Err(TransportError::Connect(format!(
                    "no ready event within {}s",
                    self.ready_timeout.as_secs()
                )));
            }
        }

        *self.session.lock().await = Some(Session { inbound, shard_manager, failure });
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_mut() else {
            return Err(TransportError::Receive("transport is not connected".to_owned()));
        };

        match session.inbound.recv().await {
            Some(envelope) => Ok(Some(envelope)),
            None => match session.failure.lock().await.take() {
                Some(reason) => Err(TransportError::Receive(reason)),
                None => Ok(None),
            },
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        if let Some(session) = self.session.lock().await.take() {
            session.shard_manager.shutdown_all().await;
        }
        Ok(())
    }
}

struct DiscordBridge {
    sender: mpsc::Sender<ChatEnvelope>,
    ready: Mutex<Option<oneshot::Sender<()>>>,
}

impl DiscordBridge {
    async fn forward(&self, event: ChatEvent) {
        let envelope = ChatEnvelope { envelope_id: Uuid::new_v4().to_string(), event };
        if self.sender.send(envelope).await.is_err() {
            debug!(
                event_name = "ingress.discord.receiver_closed",
                "dropping event; runner is no longer reading"
            );
        }
    }
}

#[async_trait]
impl EventHandler for DiscordBridge {
    async fn message(&self, _ctx: Context, message: Message) {
        self.forward(convert::message_created(&message)).await;
    }

    async fn interaction_create(&self, _ctx: Context, interaction: Interaction) {
        if let Interaction::Component(component) = interaction {
            self.forward(convert::button_pressed(&component)).await;
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            event_name = "ingress.discord.ready",
            bot_user = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord gateway ready"
        );
        if let Some(signal) = self.ready.lock().await.take() {
            let _ = signal.send(());
        }
    }
}
