use std::sync::Arc;

use async_trait::async_trait;
use suggestbox_core::{render, ApplicationError, PostEntry, PostId, Tally, VoteChoice, VoteLedger};
use tracing::{debug, info, warn};

use super::SuggestionSettings;
use crate::{
    events::{
        ButtonPressedEvent, ChatEnvelope, ChatEvent, ChatEventType, EventContext, EventHandler,
        EventHandlerError, HandlerResult,
    },
    gateway::{ChatGateway, GatewayError, MessageRef},
    templates::{companion_message, has_companion_marker, vote_buttons_update, vote_failure_notice},
};

/// Applies yes/no button presses and refreshes every surface showing the tally.
///
/// The post's ledger lock is held from the vote mutation until the surfaces are in sync, so
/// concurrent voters on one post see their updates applied in order and the companion message
/// is created at most once.
pub struct VoteHandler {
    gateway: Arc<dyn ChatGateway>,
    ledger: Arc<VoteLedger>,
    settings: Arc<SuggestionSettings>,
}

impl VoteHandler {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        ledger: Arc<VoteLedger>,
        settings: Arc<SuggestionSettings>,
    ) -> Self {
        Self { gateway, ledger, settings }
    }

    async fn sync_surfaces(
        &self,
        post: &MessageRef,
        tally: &Tally,
        entry: &mut PostEntry,
    ) -> Result<(), GatewayError> {
        self.gateway.edit_message(post, &vote_buttons_update(tally)).await?;

        let Some(votes_channel_id) = self.settings.votes_channel_id.as_deref() else {
            return Ok(());
        };
        let companion = companion_message(post, tally);
        if let Some(message_id) = entry.companion_message_id.clone() {
            let remembered = MessageRef { channel_id: votes_channel_id.to_owned(), message_id };
            match self.gateway.edit_message(&remembered, &companion).await {
                Err(GatewayError::NotFound { .. }) => {
                    warn!(
                        event_name = "suggestions.vote.companion_missing",
                        post_id = %entry.record.post_id,
                        companion_id = %remembered.message_id,
                        "votes detail message is gone; publishing a new one"
                    );
                    entry.forget_companion();
                }
                outcome => return outcome,
            }
        }

        let existing = self.find_companion(votes_channel_id, &entry.record.post_id).await?;
        match existing {
            Some(target) => {
                self.gateway.edit_message(&target, &companion).await?;
                entry.remember_companion(target.message_id);
            }
            None => {
                let created = self.gateway.send_message(votes_channel_id, &companion).await?;
                info!(
                    event_name = "suggestions.vote.companion_created",
                    post_id = %entry.record.post_id,
                    companion_id = %created.message_id,
                    "votes detail message created"
                );
                entry.remember_companion(created.message_id);
            }
        }
        Ok(())
    }

    /// Looks for a companion left by an earlier process among the channel's recent messages.
    async fn find_companion(
        &self,
        votes_channel_id: &str,
        post_id: &PostId,
    ) -> Result<Option<MessageRef>, GatewayError> {
        let recent = self
            .gateway
            .recent_messages(votes_channel_id, self.settings.companion_scan_limit)
            .await?;
        Ok(recent
            .into_iter()
            .find(|candidate| has_companion_marker(&candidate.text, post_id))
            .map(|found| found.message))
    }

    async fn report_failure(
        &self,
        event: &ButtonPressedEvent,
        ctx: &EventContext,
        error: GatewayError,
    ) -> Result<HandlerResult, EventHandlerError> {
        warn!(
            event_name = "suggestions.vote.sync_failed",
            correlation_id = %ctx.correlation_id,
            post_id = %event.message.message_id,
            user_id = %event.user_id,
            error = %error,
            "vote recorded but tally display could not be refreshed"
        );
        let interface = ApplicationError::from(error).into_interface(ctx.correlation_id.clone());
        let notice = vote_failure_notice(&interface);
        self.gateway
            .reply_ephemeral(&event.interaction, &notice)
            .await
            .map_err(EventHandlerError::Notice)?;
        Ok(HandlerResult::Notified(notice))
    }
}

#[async_trait]
impl EventHandler for VoteHandler {
    fn event_type(&self) -> ChatEventType {
        ChatEventType::ButtonPressed
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::ButtonPressed(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        let Some(choice) = VoteChoice::from_custom_id(&event.custom_id) else {
            debug!(
                event_name = "suggestions.vote.unknown_button",
                correlation_id = %ctx.correlation_id,
                custom_id = %event.custom_id,
                "ignoring unrecognised button"
            );
            return Ok(HandlerResult::Ignored);
        };

        let post_id = event.post_id();
        // Outside the post lock: the platform expires unacknowledged interactions after 3s.
        if let Err(error) = self.gateway.acknowledge_interaction(&event.interaction).await {
            warn!(
                event_name = "suggestions.vote.ack_failed",
                correlation_id = %ctx.correlation_id,
                post_id = %post_id,
                error = %error,
                "could not acknowledge button interaction"
            );
        }

        let mut entry = self.ledger.lock(&post_id).await;
        entry.record.cast(event.user_id.clone(), choice);
        let tally = render(&entry.record);
        info!(
            event_name = "suggestions.vote.cast",
            correlation_id = %ctx.correlation_id,
            post_id = %post_id,
            user_id = %event.user_id,
            choice = choice.label(),
            yes = tally.yes_count,
            no = tally.no_count,
            "vote recorded"
        );

        let synced = self.sync_surfaces(&event.message, &tally, &mut entry).await;
        drop(entry);

        match synced {
            Ok(()) => Ok(HandlerResult::Processed),
            Err(error) => self.report_failure(event, ctx, error).await,
        }
    }
}
