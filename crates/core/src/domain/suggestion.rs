use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::vote::UserId;

pub const DISCUSSION_TITLE_MAX_CHARS: usize = 50;
const DISCUSSION_TITLE_ELLIPSIS: &str = "...";
const DISCUSSION_TITLE_FALLBACK: &str = "Suggestion discussion";

/// A user's raw submission, captured before the original message is removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionDraft {
    pub author_id: UserId,
    pub author_name: String,
    pub author_avatar_url: Option<String>,
    pub text: String,
    pub submitted_at: DateTime<Utc>,
}

impl SuggestionDraft {
    /// Builds a draft from raw message text, or `None` when the text is blank.
    pub fn capture(
        author_id: UserId,
        author_name: impl Into<String>,
        author_avatar_url: Option<String>,
        raw_text: &str,
        submitted_at: DateTime<Utc>,
    ) -> Option<Self> {
        let text = raw_text.trim();
        if text.is_empty() {
            return None;
        }

        Some(Self {
            author_id,
            author_name: author_name.into(),
            author_avatar_url,
            text: text.to_owned(),
            submitted_at,
        })
    }

    pub fn discussion_title(&self) -> String {
        discussion_title(&self.text)
    }
}

/// Thread name derived from the suggestion text: first line, at most
/// [`DISCUSSION_TITLE_MAX_CHARS`] characters including a trailing `...` when cut.
pub fn discussion_title(text: &str) -> String {
    let first_line = text.lines().map(str::trim).find(|line| !line.is_empty()).unwrap_or_default();
    if first_line.is_empty() {
        return DISCUSSION_TITLE_FALLBACK.to_owned();
    }

    if first_line.chars().count() <= DISCUSSION_TITLE_MAX_CHARS {
        return first_line.to_owned();
    }

    let keep = DISCUSSION_TITLE_MAX_CHARS - DISCUSSION_TITLE_ELLIPSIS.chars().count();
    let mut title: String = first_line.chars().take(keep).collect();
    title.truncate(title.trim_end().len());
    title.push_str(DISCUSSION_TITLE_ELLIPSIS);
    title
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{discussion_title, SuggestionDraft, DISCUSSION_TITLE_MAX_CHARS};
    use crate::domain::vote::UserId;

    #[test]
    fn blank_submissions_are_not_captured() {
        let draft = SuggestionDraft::capture(UserId::new("U1"), "ana", None, "  \n\t ", Utc::now());
        assert!(draft.is_none());
    }

    #[test]
    fn capture_trims_surrounding_whitespace() {
        let draft = SuggestionDraft::capture(
            UserId::new("U1"),
            "ana",
            None,
            "  add a music channel \n",
            Utc::now(),
        )
        .expect("draft");
        assert_eq!(draft.text, "add a music channel");
    }

    #[test]
    fn short_titles_are_kept_verbatim() {
        assert_eq!(discussion_title("Add a music channel"), "Add a music channel");
    }

    #[test]
    fn long_titles_are_truncated_with_ellipsis() {
        let text = "Please add a dedicated channel for sharing screenshots of builds and events";
        let title = discussion_title(text);

        assert!(title.ends_with("..."));
        assert!(title.chars().count() <= DISCUSSION_TITLE_MAX_CHARS);
        assert!(text.starts_with(title.trim_end_matches("...")));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "é".repeat(80);
        let title = discussion_title(&text);

        assert_eq!(title.chars().count(), DISCUSSION_TITLE_MAX_CHARS);
        assert!(title.starts_with("éé"));
    }

    #[test]
    fn title_uses_first_non_empty_line() {
        assert_eq!(discussion_title("\n\n  Line one  \nLine two"), "Line one");
    }

    #[test]
    fn exactly_max_length_is_not_truncated() {
        let text = "a".repeat(DISCUSSION_TITLE_MAX_CHARS);
        assert_eq!(discussion_title(&text), text);
    }
}
