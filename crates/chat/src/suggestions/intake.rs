use std::sync::Arc;

use async_trait::async_trait;
use suggestbox_core::{PostId, SuggestionDraft, VoteLedger};
use tracing::{debug, info, warn};

use super::SuggestionSettings;
use crate::{
    events::{
        ChatEnvelope, ChatEvent, ChatEventType, EventContext, EventHandler, EventHandlerError,
        HandlerResult,
    },
    gateway::ChatGateway,
    templates::suggestion_post,
};

/// Republishes intake-channel messages as suggestion posts.
///
/// The post is published before the original message is deleted, so a failed publish never
/// loses the user's text.
pub struct SuggestionIntakeHandler {
    gateway: Arc<dyn ChatGateway>,
    ledger: Arc<VoteLedger>,
    settings: Arc<SuggestionSettings>,
}

impl SuggestionIntakeHandler {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        ledger: Arc<VoteLedger>,
        settings: Arc<SuggestionSettings>,
    ) -> Self {
        Self { gateway, ledger, settings }
    }
}

#[async_trait]
impl EventHandler for SuggestionIntakeHandler {
    fn event_type(&self) -> ChatEventType {
        ChatEventType::MessageCreated
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::MessageCreated(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.author.is_bot || event.message.channel_id != self.settings.intake_channel_id {
            return Ok(HandlerResult::Ignored);
        }

        let Some(draft) = SuggestionDraft::capture(
            event.author.user_id.clone(),
            event.author.display_name.clone(),
            event.author.avatar_url.clone(),
            &event.text,
            event.sent_at,
        ) else {
            debug!(
                event_name = "suggestions.intake.blank_ignored",
                correlation_id = %ctx.correlation_id,
                message_id = %event.message.message_id,
                "ignoring blank submission"
            );
            return Ok(HandlerResult::Ignored);
        };

        let published = self
            .gateway
            .send_message(&event.message.channel_id, &suggestion_post(&draft))
            .await
            .map_err(|error| {
                warn!(
                    event_name = "suggestions.intake.publish_failed",
                    correlation_id = %ctx.correlation_id,
                    message_id = %event.message.message_id,
                    error = %error,
                    "could not publish suggestion; original message left in place"
                );
                EventHandlerError::Publish(error)
            })?;

        let post_id = PostId::new(published.message_id.clone());
        self.ledger.get_or_create(&post_id).await;
        info!(
            event_name = "suggestions.intake.published",
            correlation_id = %ctx.correlation_id,
            post_id = %post_id,
            author_id = %draft.author_id,
            "suggestion published"
        );

        if let Err(error) = self.gateway.delete_message(&event.message).await {
            warn!(
                event_name = "suggestions.intake.delete_failed",
                correlation_id = %ctx.correlation_id,
                post_id = %post_id,
                message_id = %event.message.message_id,
                error = %error,
                "could not delete the original submission"
            );
        }

        if self.settings.open_discussion_threads {
            let title = draft.discussion_title();
            if let Err(error) = self.gateway.open_thread(&published, &title).await {
                warn!(
                    event_name = "suggestions.intake.thread_failed",
                    correlation_id = %ctx.correlation_id,
                    post_id = %post_id,
                    error = %error,
                    "could not open discussion thread"
                );
            }
        }

        Ok(HandlerResult::Processed)
    }
}
