use chrono::{DateTime, Utc};
use serde::Serialize;
use suggestbox_core::{InterfaceError, PostId, SuggestionDraft, Tally, VoteChoice};

use crate::gateway::MessageRef;

pub const SUGGESTION_COLOR: u32 = 0x0099FF;
pub const COMPANION_COLOR: u32 = 0x5865F2;
pub const FOOTER_TEXT: &str = "Suggestion box";

/// Discord rejects embed field values longer than this.
pub const FIELD_VALUE_LIMIT: usize = 1024;
/// Mention fields per side, which keeps both sides inside the 6000-character embed budget.
const FIELDS_PER_SIDE: usize = 2;
/// Room kept in the last field for the `+N more` line.
const OVERFLOW_RESERVE: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Success,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
}

impl ButtonElement {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Self { custom_id: custom_id.into(), label: label.into(), style }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub author: Option<EmbedAuthor>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Platform-neutral message body.
///
/// When used for an edit, parts left empty (`None` or no buttons) keep their current value on
/// the platform side.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub content: Option<String>,
    pub embed: Option<Embed>,
    pub buttons: Vec<ButtonElement>,
}

impl MessageTemplate {
    /// Concatenated searchable text, as a recent-message scan would see it.
    pub fn searchable_text(&self) -> String {
        let mut parts = Vec::new();
        if let Some(content) = &self.content {
            parts.push(content.clone());
        }
        if let Some(embed) = &self.embed {
            parts.extend(embed.title.clone());
            parts.extend(embed.description.clone());
            parts.extend(
                embed.fields.iter().map(|field| format!("{}\n{}", field.name, field.value)),
            );
            parts.extend(embed.footer.clone());
        }
        parts.join("\n")
    }
}

#[derive(Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embed: Option<Embed>,
    buttons: Vec<ButtonElement>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn embed<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut EmbedBuilder),
    {
        let mut builder = EmbedBuilder::default();
        build(&mut builder);
        self.embed = Some(builder.build());
        self
    }

    pub fn buttons<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.buttons.extend(builder.build());
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { content: self.content, embed: self.embed, buttons: self.buttons }
    }
}

#[derive(Default)]
pub struct EmbedBuilder {
    embed: Embed,
}

impl EmbedBuilder {
    pub fn title(&mut self, title: impl Into<String>) -> &mut Self {
        self.embed.title = Some(title.into());
        self
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.embed.description = Some(description.into());
        self
    }

    pub fn color(&mut self, color: u32) -> &mut Self {
        self.embed.color = Some(color);
        self
    }

    pub fn author(&mut self, name: impl Into<String>, icon_url: Option<String>) -> &mut Self {
        self.embed.author = Some(EmbedAuthor { name: name.into(), icon_url });
        self
    }

    pub fn field(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        inline: bool,
    ) -> &mut Self {
        self.embed.fields.push(EmbedField { name: name.into(), value: value.into(), inline });
        self
    }

    pub fn footer(&mut self, footer: impl Into<String>) -> &mut Self {
        self.embed.footer = Some(footer.into());
        self
    }

    pub fn timestamp(&mut self, timestamp: DateTime<Utc>) -> &mut Self {
        self.embed.timestamp = Some(timestamp);
        self
    }

    fn build(self) -> Embed {
        self.embed
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<ButtonElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(button);
        self
    }

    fn build(self) -> Vec<ButtonElement> {
        self.elements
    }
}

pub fn vote_buttons(tally: &Tally) -> Vec<ButtonElement> {
    vec![
        ButtonElement::new(VoteChoice::Yes.custom_id(), tally.yes_label(), ButtonStyle::Success),
        ButtonElement::new(VoteChoice::No.custom_id(), tally.no_label(), ButtonStyle::Danger),
    ]
}

/// Published suggestion: embed plus zeroed vote buttons.
pub fn suggestion_post(draft: &SuggestionDraft) -> MessageTemplate {
    let author_id = &draft.author_id;
    MessageBuilder::new()
        .embed(|embed| {
            embed
                .color(SUGGESTION_COLOR)
                .author(
                    format!("{} - {}", draft.author_name, author_id),
                    draft.author_avatar_url.clone(),
                )
                .title("💡 Suggestion")
                .description(format!("```\n{}\n```", escape_code_block(&draft.text)))
                .field("👤 Author", author_id.mention(), true)
                .field("📅 Date", format!("<t:{}:F>", draft.submitted_at.timestamp()), true)
                .footer(FOOTER_TEXT)
                .timestamp(draft.submitted_at);
        })
        .buttons(|actions| {
            for button in vote_buttons(&Tally::default()) {
                actions.button(button);
            }
        })
        .build()
}

/// Edit payload that only replaces the post's vote buttons.
pub fn vote_buttons_update(tally: &Tally) -> MessageTemplate {
    MessageBuilder::new()
        .buttons(|actions| {
            for button in vote_buttons(tally) {
                actions.button(button);
            }
        })
        .build()
}

/// Text tag that ties a votes-detail message to its suggestion post.
pub fn companion_marker(post_id: &PostId) -> String {
    format!("[suggestion:{post_id}]")
}

pub fn has_companion_marker(text: &str, post_id: &PostId) -> bool {
    text.contains(&companion_marker(post_id))
}

/// Votes-detail message listing who voted which way.
pub fn companion_message(post: &MessageRef, tally: &Tally) -> MessageTemplate {
    let post_id = PostId::new(post.message_id.clone());
    MessageBuilder::new()
        .embed(|embed| {
            embed
                .color(COMPANION_COLOR)
                .title("📊 Suggestion votes")
                .description(format!(
                    "Votes for suggestion `{}` in <#{}>",
                    post.message_id, post.channel_id
                ));
            if let Some(yes_list) = &tally.yes_list {
                let heading = format!("👍 Yes: {} ({}%)", tally.yes_count, tally.yes_percent);
                mention_fields(embed, &heading, "👍 Yes (continued)", yes_list);
            }
            if let Some(no_list) = &tally.no_list {
                let heading = format!("👎 No: {} ({}%)", tally.no_count, tally.no_percent);
                mention_fields(embed, &heading, "👎 No (continued)", no_list);
            }
            embed.footer(format!(
                "{} • Total votes: {}",
                companion_marker(&post_id),
                tally.total_votes()
            ));
        })
        .build()
}

fn mention_fields(embed: &mut EmbedBuilder, heading: &str, continued: &str, mentions: &str) {
    for (index, chunk) in split_mentions(mentions).into_iter().enumerate() {
        let name = if index == 0 { heading } else { continued };
        embed.field(name, chunk, true);
    }
}

/// Packs newline-separated mentions into at most [`FIELDS_PER_SIDE`] values of at most
/// [`FIELD_VALUE_LIMIT`] bytes; whatever does not fit is summarised as `+N more`.
fn split_mentions(mentions: &str) -> Vec<String> {
    let lines: Vec<&str> = mentions.lines().collect();
    let mut chunks = Vec::new();
    let mut current = String::new();

    for (index, line) in lines.iter().enumerate() {
        let last_chunk = chunks.len() + 1 == FIELDS_PER_SIDE;
        let budget =
            if last_chunk { FIELD_VALUE_LIMIT - OVERFLOW_RESERVE } else { FIELD_VALUE_LIMIT };
        let separator = usize::from(!current.is_empty());
        if !current.is_empty() && current.len() + separator + line.len() > budget {
            if last_chunk {
                current.push_str(&format!("\n+{} more", lines.len() - index));
                chunks.push(current);
                return chunks;
            }
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Private notice shown to a voter whose vote was stored but could not be displayed.
pub fn vote_failure_notice(error: &InterfaceError) -> String {
    format!(
        "⚠️ Your vote was recorded, but the tally could not be refreshed. {} (ref: {})",
        error.user_message(),
        error.correlation_id()
    )
}

fn escape_code_block(text: &str) -> String {
    text.replace("```", "`\u{200b}`\u{200b}`")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use suggestbox_core::{
        render, ApplicationError, PostId, SuggestionDraft, UserId, VoteChoice, VoteRecord,
    };

    use super::{
        companion_marker, companion_message, has_companion_marker, suggestion_post,
        vote_buttons_update, vote_failure_notice, ButtonStyle, FIELD_VALUE_LIMIT,
    };
    use crate::gateway::MessageRef;

    fn draft(text: &str) -> SuggestionDraft {
        SuggestionDraft::capture(
            UserId::new("42"),
            "ana",
            Some("https://cdn.example/avatar.png".to_owned()),
            text,
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().expect("timestamp"),
        )
        .expect("draft")
    }

    fn post_ref() -> MessageRef {
        MessageRef { channel_id: "100".to_owned(), message_id: "555".to_owned() }
    }

    #[test]
    fn suggestion_post_carries_text_author_and_zeroed_buttons() {
        let template = suggestion_post(&draft("Add a music channel"));
        let embed = template.embed.as_ref().expect("embed");

        assert_eq!(embed.title.as_deref(), Some("💡 Suggestion"));
        assert_eq!(embed.description.as_deref(), Some("```\nAdd a music channel\n```"));
        assert_eq!(embed.author.as_ref().map(|author| author.name.as_str()), Some("ana - 42"));
        assert_eq!(embed.fields[0].value, "<@42>");
        assert_eq!(embed.fields[1].value, "<t:1772366400:F>");
        assert_eq!(template.buttons.len(), 2);
        assert_eq!(template.buttons[0].custom_id, "vote_yes");
        assert_eq!(template.buttons[0].label, "👍 (0) - 0%");
        assert_eq!(template.buttons[0].style, ButtonStyle::Success);
        assert_eq!(template.buttons[1].custom_id, "vote_no");
        assert_eq!(template.buttons[1].label, "👎 (0) - 0%");
        assert_eq!(template.buttons[1].style, ButtonStyle::Danger);
    }

    #[test]
    fn code_fences_inside_suggestions_cannot_close_the_block() {
        let template = suggestion_post(&draft("try ``` this"));
        let description = template.embed.and_then(|embed| embed.description).expect("description");

        assert_eq!(description.matches("```").count(), 2);
    }

    #[test]
    fn button_update_leaves_embed_untouched() {
        let mut record = VoteRecord::new(PostId::new("555"));
        record.cast(UserId::new("A"), VoteChoice::Yes);
        let template = vote_buttons_update(&render(&record));

        assert!(template.embed.is_none());
        assert!(template.content.is_none());
        assert_eq!(template.buttons[0].label, "👍 (1) - 100%");
        assert_eq!(template.buttons[1].label, "👎 (0) - 0%");
    }

    #[test]
    fn companion_lists_voters_and_omits_empty_side() {
        let mut record = VoteRecord::new(PostId::new("555"));
        record.cast(UserId::new("A"), VoteChoice::Yes);
        record.cast(UserId::new("B"), VoteChoice::Yes);
        let template = companion_message(&post_ref(), &render(&record));
        let embed = template.embed.as_ref().expect("embed");

        assert_eq!(embed.fields.len(), 1);
        assert_eq!(embed.fields[0].name, "👍 Yes: 2 (100%)");
        assert_eq!(embed.fields[0].value, "<@A>\n<@B>");
        assert!(has_companion_marker(&template.searchable_text(), &PostId::new("555")));
    }

    fn crowded_record(voters: usize) -> VoteRecord {
        let mut record = VoteRecord::new(PostId::new("555"));
        for index in 0..voters {
            let user_id = (100_000_000_000_000_000_u64 + index as u64).to_string();
            record.cast(UserId::new(user_id), VoteChoice::Yes);
        }
        record
    }

    #[test]
    fn long_voter_lists_are_split_across_fields() {
        let template = companion_message(&post_ref(), &render(&crowded_record(60)));
        let embed = template.embed.as_ref().expect("embed");

        assert_eq!(embed.fields.len(), 2);
        assert_eq!(embed.fields[0].name, "👍 Yes: 60 (100%)");
        assert_eq!(embed.fields[1].name, "👍 Yes (continued)");
        assert!(embed.fields.iter().all(|field| field.value.len() <= FIELD_VALUE_LIMIT));
        let listed: usize = embed.fields.iter().map(|field| field.value.lines().count()).sum();
        assert_eq!(listed, 60);
    }

    #[test]
    fn oversized_voter_lists_end_with_an_overflow_count() {
        let template = companion_message(&post_ref(), &render(&crowded_record(300)));
        let embed = template.embed.as_ref().expect("embed");

        assert_eq!(embed.fields.len(), 2);
        assert!(embed.fields.iter().all(|field| field.value.len() <= FIELD_VALUE_LIMIT));
        let last = embed.fields[1].value.lines().last().expect("overflow line");
        let shown = embed.fields.iter().map(|field| field.value.lines().count()).sum::<usize>() - 1;
        assert_eq!(last, format!("+{} more", 300 - shown));
        let embed_chars: usize = embed
            .fields
            .iter()
            .map(|field| field.name.chars().count() + field.value.chars().count())
            .sum();
        assert!(embed_chars < 6_000);
    }

    #[test]
    fn companion_marker_does_not_match_prefixed_ids() {
        let text = format!("{} • Total votes: 3", companion_marker(&PostId::new("5551")));

        assert!(!has_companion_marker(&text, &PostId::new("555")));
        assert!(has_companion_marker(&text, &PostId::new("5551")));
    }

    #[test]
    fn failure_notice_includes_reference() {
        let interface =
            ApplicationError::Integration("edit failed".to_owned()).into_interface("env-9");
        let notice = vote_failure_notice(&interface);

        assert!(notice.contains("Your vote was recorded"));
        assert!(notice.contains("ref: env-9"));
    }

    #[test]
    fn templates_serialize_for_structured_logs() {
        let template = suggestion_post(&draft("Add a music channel"));
        let value = serde_json::to_value(&template).expect("serialize");

        assert_eq!(value["buttons"][0]["style"], "success");
        assert_eq!(value["buttons"][1]["custom_id"], "vote_no");
    }
}
