use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use suggestbox_core::ApplicationError;
use thiserror::Error;
use tracing::warn;

use crate::templates::MessageTemplate;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub channel_id: String,
    pub message_id: String,
}

/// Handle needed to answer a button interaction.
#[derive(Clone, PartialEq, Eq)]
pub struct InteractionRef {
    pub interaction_id: String,
    pub token: String,
}

impl fmt::Debug for InteractionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractionRef")
            .field("interaction_id", &self.interaction_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecentMessage {
    pub message: MessageRef,
    /// Message content plus any embed text, for marker scans.
    pub text: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("`{operation}` was rejected by the chat platform: {message}")]
    Request { operation: &'static str, message: String },
    #[error("`{operation}` timed out after {timeout_ms}ms")]
    Timeout { operation: &'static str, timeout_ms: u64 },
    /// The target message no longer exists on the platform.
    #[error("`{operation}` target message no longer exists")]
    NotFound { operation: &'static str },
    #[error("invalid platform identifier `{0}`")]
    InvalidIdentifier(String),
}

impl GatewayError {
    pub fn request(operation: &'static str, error: impl fmt::Display) -> Self {
        Self::Request { operation, message: error.to_string() }
    }
}

impl From<GatewayError> for ApplicationError {
    fn from(value: GatewayError) -> Self {
        match value {
            GatewayError::Timeout { operation, timeout_ms } => {
                ApplicationError::Timeout { operation: operation.to_owned(), timeout_ms }
            }
            request @ (GatewayError::Request { .. } | GatewayError::NotFound { .. }) => {
                ApplicationError::Integration(request.to_string())
            }
            invalid @ GatewayError::InvalidIdentifier(_) => {
                ApplicationError::Configuration(invalid.to_string())
            }
        }
    }
}

/// Outbound chat-platform operations.
///
/// `acknowledge_interaction` must precede `reply_ephemeral` for the same interaction; the
/// platform only accepts one initial response per interaction.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn send_message(
        &self,
        channel_id: &str,
        message: &MessageTemplate,
    ) -> Result<MessageRef, GatewayError>;

    async fn edit_message(
        &self,
        target: &MessageRef,
        message: &MessageTemplate,
    ) -> Result<(), GatewayError>;

    async fn delete_message(&self, target: &MessageRef) -> Result<(), GatewayError>;

    /// Most recent messages first.
    async fn recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<RecentMessage>, GatewayError>;

    async fn open_thread(&self, parent: &MessageRef, title: &str) -> Result<(), GatewayError>;

    async fn acknowledge_interaction(&self, interaction: &InteractionRef)
        -> Result<(), GatewayError>;

    async fn reply_ephemeral(
        &self,
        interaction: &InteractionRef,
        text: &str,
    ) -> Result<(), GatewayError>;
}

/// Bounds every call on the wrapped gateway; expiry becomes [`GatewayError::Timeout`].
pub struct TimeoutGateway {
    inner: Arc<dyn ChatGateway>,
    timeout: Duration,
}

impl TimeoutGateway {
    pub fn new(inner: Arc<dyn ChatGateway>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(
                    event_name = "egress.chat.timeout",
                    operation,
                    timeout_ms,
                    "chat platform call exceeded its time budget"
                );
                Err(GatewayError::Timeout { operation, timeout_ms })
            }
        }
    }
}

#[async_trait]
impl ChatGateway for TimeoutGateway {
    async fn send_message(
        &self,
        channel_id: &str,
        message: &MessageTemplate,
    ) -> Result<MessageRef, GatewayError> {
        self.bounded("send_message", self.inner.send_message(channel_id, message)).await
    }

    async fn edit_message(
        &self,
        target: &MessageRef,
        message: &MessageTemplate,
    ) -> Result<(), GatewayError> {
        self.bounded("edit_message", self.inner.edit_message(target, message)).await
    }

    async fn delete_message(&self, target: &MessageRef) -> Result<(), GatewayError> {
        self.bounded("delete_message", self.inner.delete_message(target)).await
    }

    async fn recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<RecentMessage>, GatewayError> {
        self.bounded("recent_messages", self.inner.recent_messages(channel_id, limit)).await
    }

    async fn open_thread(&self, parent: &MessageRef, title: &str) -> Result<(), GatewayError> {
        self.bounded("open_thread", self.inner.open_thread(parent, title)).await
    }

    async fn acknowledge_interaction(
        &self,
        interaction: &InteractionRef,
    ) -> Result<(), GatewayError> {
        self.bounded("acknowledge_interaction", self.inner.acknowledge_interaction(interaction))
            .await
    }

    async fn reply_ephemeral(
        &self,
        interaction: &InteractionRef,
        text: &str,
    ) -> Result<(), GatewayError> {
        self.bounded("reply_ephemeral", self.inner.reply_ephemeral(interaction, text)).await
    }
}
