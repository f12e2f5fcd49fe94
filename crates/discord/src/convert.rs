use chrono::DateTime;
use serenity::all::{
    ButtonStyle as DiscordButtonStyle, ChannelId, ComponentInteraction, CreateActionRow,
    CreateButton, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateMessage, EditMessage,
    Embed as DiscordEmbed, Message, MessageId, Timestamp,
};
use serenity::http::HttpError;
use suggestbox_chat::{
    events::{ButtonPressedEvent, ChatEvent, MessageAuthor, MessageCreatedEvent},
    gateway::{GatewayError, InteractionRef, MessageRef},
    templates::{ButtonElement, ButtonStyle, Embed, MessageTemplate},
};
use suggestbox_core::UserId;

/// Discord JSON error code for a message id that no longer resolves.
const UNKNOWN_MESSAGE: isize = 10008;

/// Maps a REST failure, keeping "unknown message" distinguishable from other rejections.
pub(crate) fn request_error(operation: &'static str, error: serenity::Error) -> GatewayError {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) = &error {
        if response.error.code == UNKNOWN_MESSAGE {
            return GatewayError::NotFound { operation };
        }
    }
    GatewayError::request(operation, error)
}

pub(crate) fn snowflake(raw: &str) -> Result<u64, GatewayError> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| GatewayError::InvalidIdentifier(raw.to_owned()))
}

pub(crate) fn channel_id(raw: &str) -> Result<ChannelId, GatewayError> {
    snowflake(raw).map(ChannelId::new)
}

pub(crate) fn message_id(raw: &str) -> Result<MessageId, GatewayError> {
    snowflake(raw).map(MessageId::new)
}

pub(crate) fn message_ref(message: &Message) -> MessageRef {
    MessageRef {
        channel_id: message.channel_id.get().to_string(),
        message_id: message.id.get().to_string(),
    }
}

fn embed(embed: &Embed) -> CreateEmbed {
    let mut built = CreateEmbed::new();
    if let Some(title) = &embed.title {
        built = built.title(title);
    }
    if let Some(description) = &embed.description {
        built = built.description(description);
    }
    if let Some(color) = embed.color {
        built = built.color(color);
    }
    if let Some(author) = &embed.author {
        let mut header = CreateEmbedAuthor::new(&author.name);
        if let Some(icon_url) = &author.icon_url {
            header = header.icon_url(icon_url);
        }
        built = built.author(header);
    }
    for field in &embed.fields {
        built = built.field(&field.name, &field.value, field.inline);
    }
    if let Some(footer) = &embed.footer {
        built = built.footer(CreateEmbedFooter::new(footer));
    }
    if let Some(timestamp) =
        embed.timestamp.and_then(|at| Timestamp::from_unix_timestamp(at.timestamp()).ok())
    {
        built = built.timestamp(timestamp);
    }
    built
}

fn button(element: &ButtonElement) -> CreateButton {
    let style = match element.style {
        ButtonStyle::Success => DiscordButtonStyle::Success,
        ButtonStyle::Danger => DiscordButtonStyle::Danger,
    };
    CreateButton::new(&element.custom_id).label(&element.label).style(style)
}

fn action_rows(buttons: &[ButtonElement]) -> Vec<CreateActionRow> {
    if buttons.is_empty() {
        return Vec::new();
    }
    vec![CreateActionRow::Buttons(buttons.iter().map(button).collect())]
}

pub(crate) fn create_message(template: &MessageTemplate) -> CreateMessage {
    let mut message = CreateMessage::new();
    if let Some(content) = &template.content {
        message = message.content(content);
    }
    if let Some(body) = &template.embed {
        message = message.embed(embed(body));
    }
    if !template.buttons.is_empty() {
        message = message.components(action_rows(&template.buttons));
    }
    message
}

/// Edit payload touching only the parts the template sets.
pub(crate) fn edit_message(template: &MessageTemplate) -> EditMessage {
    let mut message = EditMessage::new();
    if let Some(content) = &template.content {
        message = message.content(content);
    }
    if let Some(body) = &template.embed {
        message = message.embed(embed(body));
    }
    if !template.buttons.is_empty() {
        message = message.components(action_rows(&template.buttons));
    }
    message
}

pub(crate) fn searchable_text(content: &str, embeds: &[DiscordEmbed]) -> String {
    let mut parts = Vec::new();
    if !content.is_empty() {
        parts.push(content.to_owned());
    }
    for embed in embeds {
        parts.extend(embed.title.clone());
        parts.extend(embed.description.clone());
        parts.extend(embed.fields.iter().map(|field| format!("{}\n{}", field.name, field.value)));
        parts.extend(embed.footer.as_ref().map(|footer| footer.text.clone()));
    }
    parts.join("\n")
}

pub(crate) fn message_created(message: &Message) -> ChatEvent {
    let author = &message.author;
    let sent_at =
        DateTime::from_timestamp(message.timestamp.unix_timestamp(), 0).unwrap_or_default();
    ChatEvent::MessageCreated(MessageCreatedEvent {
        message: message_ref(message),
        author: MessageAuthor {
            user_id: UserId::new(author.id.get().to_string()),
            display_name: author.global_name.clone().unwrap_or_else(|| author.name.clone()),
            avatar_url: author.avatar_url(),
            is_bot: author.bot,
        },
        text: message.content.clone(),
        sent_at,
    })
}

pub(crate) fn button_pressed(component: &ComponentInteraction) -> ChatEvent {
    ChatEvent::ButtonPressed(ButtonPressedEvent {
        interaction: InteractionRef {
            interaction_id: component.id.get().to_string(),
            token: component.token.clone(),
        },
        custom_id: component.data.custom_id.clone(),
        message: message_ref(&component.message),
        user_id: UserId::new(component.user.id.get().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use serenity::all::Embed as DiscordEmbed;
    use suggestbox_chat::gateway::GatewayError;
    use suggestbox_chat::templates::{suggestion_post, vote_buttons_update};
    use suggestbox_core::{SuggestionDraft, Tally, UserId};

    use super::{create_message, edit_message, request_error, searchable_text, snowflake};

    fn draft() -> SuggestionDraft {
        SuggestionDraft::capture(
            UserId::new("42"),
            "ana",
            Some("https://cdn.example/avatar.png".to_owned()),
            "Add a music channel",
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("timestamp"),
        )
        .expect("draft")
    }

    #[test]
    fn snowflakes_must_be_positive_integers() {
        assert_eq!(snowflake("1234567890"), Ok(1_234_567_890));
        assert_eq!(snowflake("abc"), Err(GatewayError::InvalidIdentifier("abc".to_owned())));
        assert_eq!(snowflake("0"), Err(GatewayError::InvalidIdentifier("0".to_owned())));
    }

    #[test]
    fn non_http_failures_stay_generic_rejections() {
        let mapped = request_error("edit_message", serenity::Error::Other("gateway closed"));

        assert!(matches!(mapped, GatewayError::Request { operation: "edit_message", .. }));
    }

    #[test]
    fn suggestion_post_serializes_embed_and_buttons() {
        let payload = serde_json::to_string(&create_message(&suggestion_post(&draft())))
            .expect("serialize");

        assert!(payload.contains("Add a music channel"));
        assert!(payload.contains("vote_yes"));
        assert!(payload.contains("vote_no"));
        assert!(payload.contains("👍 (0) - 0%"));
        assert!(payload.contains("https://cdn.example/avatar.png"));
    }

    #[test]
    fn button_only_edit_leaves_the_embed_alone() {
        let tally = Tally { yes_count: 1, yes_percent: 100, ..Tally::default() };

        let payload =
            serde_json::to_value(edit_message(&vote_buttons_update(&tally))).expect("serialize");

        assert!(payload.get("embeds").is_none());
        assert!(payload.get("components").is_some());
        assert!(payload.to_string().contains("👍 (1) - 100%"));
    }

    #[test]
    fn searchable_text_includes_embed_footer() {
        let embed: DiscordEmbed = serde_json::from_value(json!({
            "title": "📊 Suggestion votes",
            "fields": [{ "name": "👍 Yes: 1 (100%)", "value": "<@7>", "inline": true }],
            "footer": { "text": "[suggestion:55] • Total votes: 1" }
        }))
        .expect("embed");

        let text = searchable_text("", &[embed]);

        assert!(text.contains("[suggestion:55]"));
        assert!(text.contains("<@7>"));
    }
}
