use serde::Serialize;

use crate::domain::vote::{UserId, VoteRecord};

/// Display values derived from a [`VoteRecord`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub yes_count: usize,
    pub no_count: usize,
    pub yes_percent: u8,
    pub no_percent: u8,
    /// Newline-separated voter mentions; `None` when nobody voted yes.
    pub yes_list: Option<String>,
    pub no_list: Option<String>,
}

impl Tally {
    pub fn total_votes(&self) -> usize {
        self.yes_count + self.no_count
    }

    pub fn yes_label(&self) -> String {
        format!("👍 ({}) - {}%", self.yes_count, self.yes_percent)
    }

    pub fn no_label(&self) -> String {
        format!("👎 ({}) - {}%", self.no_count, self.no_percent)
    }
}

pub fn render(record: &VoteRecord) -> Tally {
    let yes_count = record.yes_voters().len();
    let no_count = record.no_voters().len();
    let total = yes_count + no_count;

    Tally {
        yes_count,
        no_count,
        yes_percent: percent(yes_count, total),
        no_percent: percent(no_count, total),
        yes_list: mention_list(record.yes_voters()),
        no_list: mention_list(record.no_voters()),
    }
}

/// Share of `part` in `total` rounded to the nearest whole percent, halves rounding up.
/// Zero when `total` is zero.
pub fn percent(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }

    let part = part.min(total) as u128;
    let total = total as u128;
    let rounded = (part * 200 + total) / (total * 2);
    u8::try_from(rounded).unwrap_or(100)
}

fn mention_list<'a>(voters: impl IntoIterator<Item = &'a UserId>) -> Option<String> {
    let mentions = voters.into_iter().map(UserId::mention).collect::<Vec<_>>();
    (!mentions.is_empty()).then(|| mentions.join("\n"))
}
