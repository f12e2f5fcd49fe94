use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serenity::all::{
    CreateInteractionResponse, CreateInteractionResponseFollowup, CreateThread, GetMessages, Http,
    InteractionId,
};
use suggestbox_chat::{
    gateway::{ChatGateway, GatewayError, InteractionRef, MessageRef, RecentMessage},
    templates::MessageTemplate,
};

use crate::convert;

/// Outbound Discord operations over serenity's REST client.
pub struct DiscordGateway {
    http: Arc<Http>,
}

impl DiscordGateway {
    pub fn new(bot_token: &SecretString) -> Self {
        Self { http: Arc::new(Http::new(bot_token.expose_secret())) }
    }

    pub fn from_http(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    async fn send_message(
        &self,
        channel_id: &str,
        message: &MessageTemplate,
    ) -> Result<MessageRef, GatewayError> {
        let sent = convert::channel_id(channel_id)?
            .send_message(&self.http, convert::create_message(message))
            .await
            .map_err(|error| GatewayError::request("send_message", error))?;
        Ok(convert::message_ref(&sent))
    }

    async fn edit_message(
        &self,
        target: &MessageRef,
        message: &MessageTemplate,
    ) -> Result<(), GatewayError> {
        convert::channel_id(&target.channel_id)?
            .edit_message(
                &self.http,
                convert::message_id(&target.message_id)?,
                convert::edit_message(message),
            )
            .await
            .map(|_| ())
            .map_err(|error| convert::request_error("edit_message", error))
    }

    async fn delete_message(&self, target: &MessageRef) -> Result<(), GatewayError> {
        convert::channel_id(&target.channel_id)?
            .delete_message(&self.http, convert::message_id(&target.message_id)?)
            .await
            .map_err(|error| convert::request_error("delete_message", error))
    }

    async fn recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<RecentMessage>, GatewayError> {
        let messages = convert::channel_id(channel_id)?
            .messages(&self.http, GetMessages::new().limit(limit))
            .await
            .map_err(|error| GatewayError::request("recent_messages", error))?;
        Ok(messages
            .iter()
            .map(|message| RecentMessage {
                message: convert::message_ref(message),
                text: convert::searchable_text(&message.content, &message.embeds),
            })
            .collect())
    }

    async fn open_thread(&self, parent: &MessageRef, title: &str) -> Result<(), GatewayError> {
        convert::channel_id(&parent.channel_id)?
            .create_thread_from_message(
                &self.http,
                convert::message_id(&parent.message_id)?,
                CreateThread::new(title),
            )
            .await
            .map(|_| ())
            .map_err(|error| GatewayError::request("open_thread", error))
    }

    async fn acknowledge_interaction(
        &self,
        interaction: &InteractionRef,
    ) -> Result<(), GatewayError> {
        let interaction_id = InteractionId::new(convert::snowflake(&interaction.interaction_id)?);
        self.http
            .create_interaction_response(
                interaction_id,
                &interaction.token,
                &CreateInteractionResponse::Acknowledge,
                Vec::new(),
            )
            .await
            .map_err(|error| GatewayError::request("acknowledge_interaction", error))
    }

    async fn reply_ephemeral(
        &self,
        interaction: &InteractionRef,
        text: &str,
    ) -> Result<(), GatewayError> {
        let followup = CreateInteractionResponseFollowup::new().content(text).ephemeral(true);
        self.http
            .create_followup_message(&interaction.token, &followup, Vec::new())
            .await
            .map(|_| ())
            .map_err(|error| GatewayError::request("reply_ephemeral", error))
    }
}
