//! Suggestion intake and vote handling.
//!
//! [`SuggestionIntakeHandler`] turns intake-channel messages into published suggestion posts and
//! registers them in the [`VoteLedger`]. [`VoteHandler`] applies button presses to the ledger and
//! pushes the new tally to the post's buttons and, when a votes channel is configured, to the
//! companion votes-detail message.

mod intake;
mod votes;

use std::sync::Arc;

use suggestbox_core::{config::SuggestionsConfig, VoteLedger};

use crate::{events::EventDispatcher, gateway::ChatGateway};

pub use intake::SuggestionIntakeHandler;
pub use votes::VoteHandler;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestionSettings {
    pub intake_channel_id: String,
    pub votes_channel_id: Option<String>,
    pub open_discussion_threads: bool,
    pub companion_scan_limit: u8,
}

impl From<&SuggestionsConfig> for SuggestionSettings {
    fn from(config: &SuggestionsConfig) -> Self {
        Self {
            intake_channel_id: config.intake_channel_id.clone(),
            votes_channel_id: config.votes_channel_id.clone(),
            open_discussion_threads: config.open_discussion_threads,
            companion_scan_limit: config.companion_scan_limit,
        }
    }
}

/// Dispatcher with the intake and vote handlers registered over one shared ledger.
pub fn suggestion_dispatcher(
    gateway: Arc<dyn ChatGateway>,
    ledger: Arc<VoteLedger>,
    settings: SuggestionSettings,
) -> EventDispatcher {
    let settings = Arc::new(settings);
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SuggestionIntakeHandler::new(
        Arc::clone(&gateway),
        Arc::clone(&ledger),
        Arc::clone(&settings),
    ));
    dispatcher.register(VoteHandler::new(gateway, ledger, settings));
    dispatcher
}
