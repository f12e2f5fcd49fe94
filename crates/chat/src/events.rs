use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use suggestbox_core::{PostId, UserId};
use thiserror::Error;

use crate::gateway::{GatewayError, InteractionRef, MessageRef};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEnvelope {
    pub envelope_id: String,
    pub event: ChatEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    MessageCreated(MessageCreatedEvent),
    ButtonPressed(ButtonPressedEvent),
    Unsupported { event_type: String },
}

impl ChatEvent {
    pub fn event_type(&self) -> ChatEventType {
        match self {
            Self::MessageCreated(_) => ChatEventType::MessageCreated,
            Self::ButtonPressed(_) => ChatEventType::ButtonPressed,
            Self::Unsupported { .. } => ChatEventType::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatEventType {
    MessageCreated,
    ButtonPressed,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageAuthor {
    pub user_id: UserId,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_bot: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageCreatedEvent {
    pub message: MessageRef,
    pub author: MessageAuthor,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonPressedEvent {
    pub interaction: InteractionRef,
    pub custom_id: String,
    /// The message carrying the pressed button.
    pub message: MessageRef,
    pub user_id: UserId,
}

impl ButtonPressedEvent {
    pub fn post_id(&self) -> PostId {
        PostId::new(self.message.message_id.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Processed,
    /// The user was told privately why the action could not complete.
    Notified(String),
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("publishing failed: {0}")]
    Publish(#[source] GatewayError),
    #[error("failure notice could not be delivered: {0}")]
    Notice(#[source] GatewayError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> ChatEventType;
    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<ChatEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}
