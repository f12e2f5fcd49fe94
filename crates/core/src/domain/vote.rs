use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a published suggestion post, as assigned by the chat platform.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostId(pub String);

impl PostId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Platform mention markup for this user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteChoice {
    Yes,
    No,
}

impl VoteChoice {
    pub const YES_ID: &'static str = "vote_yes";
    pub const NO_ID: &'static str = "vote_no";

    /// Button identifier carried by interactions for this choice.
    pub fn custom_id(self) -> &'static str {
        match self {
            Self::Yes => Self::YES_ID,
            Self::No => Self::NO_ID,
        }
    }

    /// Returns `None` for any identifier outside the fixed `vote_yes`/`vote_no` contract.
    pub fn from_custom_id(custom_id: &str) -> Option<Self> {
        match custom_id {
            Self::YES_ID => Some(Self::Yes),
            Self::NO_ID => Some(Self::No),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

/// Yes/no voter sets of one suggestion post.
///
/// A user is a member of at most one of the two sets. Sets are ordered so rendered voter lists
/// are stable between refreshes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub post_id: PostId,
    yes_voters: BTreeSet<UserId>,
    no_voters: BTreeSet<UserId>,
}

impl VoteRecord {
    pub fn new(post_id: PostId) -> Self {
        Self { post_id, yes_voters: BTreeSet::new(), no_voters: BTreeSet::new() }
    }

    /// Records `choice` for `user_id`, replacing any earlier choice by the same user.
    ///
    /// Re-casting the current choice removes and reinserts the user; membership is unchanged.
    pub fn cast(&mut self, user_id: UserId, choice: VoteChoice) {
        self.yes_voters.remove(&user_id);
        self.no_voters.remove(&user_id);

        match choice {
            VoteChoice::Yes => self.yes_voters.insert(user_id),
            VoteChoice::No => self.no_voters.insert(user_id),
        };
    }

    pub fn choice_of(&self, user_id: &UserId) -> Option<VoteChoice> {
        if self.yes_voters.contains(user_id) {
            Some(VoteChoice::Yes)
        } else if self.no_voters.contains(user_id) {
            Some(VoteChoice::No)
        } else {
            None
        }
    }

    pub fn yes_voters(&self) -> &BTreeSet<UserId> {
        &self.yes_voters
    }

    pub fn no_voters(&self) -> &BTreeSet<UserId> {
        &self.no_voters
    }

    pub fn total_votes(&self) -> usize {
        self.yes_voters.len() + self.no_voters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{PostId, UserId, VoteChoice, VoteRecord};

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    #[test]
    fn switching_choice_moves_user_between_sets() {
        let mut record = VoteRecord::new(PostId::new("P1"));

        record.cast(user("A"), VoteChoice::Yes);
        record.cast(user("A"), VoteChoice::No);

        assert_eq!(record.yes_voters().len(), 0);
        assert_eq!(record.no_voters().len(), 1);
        assert!(record.no_voters().contains(&user("A")));
        assert!(!record.yes_voters().contains(&user("A")));
    }

    #[test]
    fn repeated_same_choice_keeps_single_membership() {
        let mut record = VoteRecord::new(PostId::new("P1"));

        record.cast(user("A"), VoteChoice::Yes);
        record.cast(user("A"), VoteChoice::Yes);

        assert_eq!(record.yes_voters().len(), 1);
        assert_eq!(record.total_votes(), 1);
        assert_eq!(record.choice_of(&user("A")), Some(VoteChoice::Yes));
    }

    #[test]
    fn user_is_never_in_both_sets_across_a_cast_sequence() {
        let mut record = VoteRecord::new(PostId::new("P1"));
        let sequence = [
            VoteChoice::Yes,
            VoteChoice::No,
            VoteChoice::No,
            VoteChoice::Yes,
            VoteChoice::Yes,
            VoteChoice::No,
        ];

        for choice in sequence {
            record.cast(user("A"), choice);
            let in_yes = record.yes_voters().contains(&user("A"));
            let in_no = record.no_voters().contains(&user("A"));
            assert!(in_yes != in_no, "user must be in exactly one set after casting");
            assert_eq!(record.choice_of(&user("A")), Some(choice));
        }
    }

    #[test]
    fn custom_ids_follow_fixed_contract() {
        assert_eq!(VoteChoice::from_custom_id("vote_yes"), Some(VoteChoice::Yes));
        assert_eq!(VoteChoice::from_custom_id("vote_no"), Some(VoteChoice::No));
        assert_eq!(VoteChoice::from_custom_id("vote_maybe"), None);
        assert_eq!(VoteChoice::from_custom_id("VOTE_YES"), None);
        assert_eq!(VoteChoice::Yes.custom_id(), "vote_yes");
    }

    #[test]
    fn mention_uses_platform_markup() {
        assert_eq!(user("123").mention(), "<@123>");
    }
}
