//! In-memory vote ledger.
//!
//! Every suggestion post owns one [`PostEntry`] behind its own async mutex. Callers that need the
//! vote mutation and the follow-up display sync to happen as one unit hold the guard returned by
//! [`VoteLedger::lock`] across both; votes on different posts never contend.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::vote::{PostId, UserId, VoteChoice, VoteRecord};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostEntry {
    pub record: VoteRecord,
    /// Message id of the published votes-detail message for this post, once known.
    pub companion_message_id: Option<String>,
}

impl PostEntry {
    fn new(post_id: PostId) -> Self {
        Self { record: VoteRecord::new(post_id), companion_message_id: None }
    }

    pub fn remember_companion(&mut self, message_id: impl Into<String>) {
        self.companion_message_id = Some(message_id.into());
    }

    pub fn forget_companion(&mut self) -> Option<String> {
        self.companion_message_id.take()
    }
}

pub type PostHandle = Arc<Mutex<PostEntry>>;

#[derive(Debug, Default)]
pub struct VoteLedger {
    posts: Mutex<HashMap<PostId, PostHandle>>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `post_id`, creating an empty one on first use.
    pub async fn get_or_create(&self, post_id: &PostId) -> PostHandle {
        let mut posts = self.posts.lock().await;
        posts
            .entry(post_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(PostEntry::new(post_id.clone()))))
            .clone()
    }

    /// Acquires the post's mutual-exclusion scope.
    pub async fn lock(&self, post_id: &PostId) -> OwnedMutexGuard<PostEntry> {
        self.get_or_create(post_id).await.lock_owned().await
    }

    pub async fn cast_vote(
        &self,
        post_id: &PostId,
        user_id: UserId,
        choice: VoteChoice,
    ) -> VoteRecord {
        let mut entry = self.lock(post_id).await;
        entry.record.cast(user_id, choice);
        entry.record.clone()
    }

    pub async fn snapshot(&self, post_id: &PostId) -> Option<VoteRecord> {
        let handle = self.posts.lock().await.get(post_id).cloned()?;
        let entry = handle.lock().await;
        Some(entry.record.clone())
    }

    pub async fn tracked_posts(&self) -> usize {
        self.posts.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::VoteLedger;
    use crate::domain::vote::{PostId, UserId, VoteChoice};

    #[tokio::test]
    async fn get_or_create_returns_same_entry_after_mutation() {
        let ledger = VoteLedger::new();
        let post_id = PostId::new("P1");

        let first = ledger.get_or_create(&post_id).await;
        ledger.cast_vote(&post_id, UserId::new("A"), VoteChoice::Yes).await;
        let second = ledger.get_or_create(&post_id).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.lock().await.record.yes_voters().len(), 1);
        assert_eq!(ledger.tracked_posts().await, 1);
    }

    #[tokio::test]
    async fn cast_vote_creates_record_lazily() {
        let ledger = VoteLedger::new();
        let post_id = PostId::new("P-lazy");

        assert!(ledger.snapshot(&post_id).await.is_none());
        let record = ledger.cast_vote(&post_id, UserId::new("A"), VoteChoice::No).await;

        assert_eq!(record.post_id, post_id);
        assert_eq!(record.no_voters().len(), 1);
        assert_eq!(ledger.snapshot(&post_id).await, Some(record));
    }

    #[tokio::test]
    async fn forgotten_companion_is_cleared_under_the_lock() {
        let ledger = VoteLedger::new();
        let post_id = PostId::new("P1");

        ledger.lock(&post_id).await.remember_companion("C1");
        let forgotten = ledger.lock(&post_id).await.forget_companion();

        assert_eq!(forgotten.as_deref(), Some("C1"));
        assert_eq!(ledger.lock(&post_id).await.companion_message_id, None);
    }

    #[tokio::test]
    async fn switching_vote_updates_counts() {
        let ledger = VoteLedger::new();
        let post_id = PostId::new("P1");

        ledger.cast_vote(&post_id, UserId::new("A"), VoteChoice::Yes).await;
        let record = ledger.cast_vote(&post_id, UserId::new("A"), VoteChoice::No).await;

        assert_eq!(record.yes_voters().len(), 0);
        assert_eq!(record.no_voters().len(), 1);
        assert!(record.no_voters().contains(&UserId::new("A")));
    }

    #[tokio::test]
    async fn posts_are_tracked_independently() {
        let ledger = VoteLedger::new();

        ledger.cast_vote(&PostId::new("P1"), UserId::new("A"), VoteChoice::Yes).await;
        ledger.cast_vote(&PostId::new("P2"), UserId::new("A"), VoteChoice::No).await;

        let first = ledger.snapshot(&PostId::new("P1")).await.expect("P1");
        let second = ledger.snapshot(&PostId::new("P2")).await.expect("P2");
        assert_eq!(first.yes_voters().len(), 1);
        assert_eq!(second.no_voters().len(), 1);
        assert_eq!(ledger.tracked_posts().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_casts_keep_sets_disjoint() {
        let ledger = Arc::new(VoteLedger::new());
        let post_id = PostId::new("P-race");

        let mut tasks = Vec::new();
        for round in 0..200 {
            let ledger = Arc::clone(&ledger);
            let post_id = post_id.clone();
            tasks.push(tokio::spawn(async move {
                let choice = if round % 2 == 0 { VoteChoice::Yes } else { VoteChoice::No };
                let voter = UserId::new(format!("U{}", round % 5));
                ledger.cast_vote(&post_id, voter, choice).await
            }));
        }
        for task in tasks {
            let record = task.await.expect("cast task");
            assert!(record.yes_voters().is_disjoint(record.no_voters()));
        }

        let record = ledger.snapshot(&post_id).await.expect("record");
        assert!(record.yes_voters().is_disjoint(record.no_voters()));
        assert_eq!(record.total_votes(), 5);
    }

    #[tokio::test]
    async fn companion_id_is_kept_alongside_record() {
        let ledger = VoteLedger::new();
        let post_id = PostId::new("P1");

        {
            let mut entry = ledger.lock(&post_id).await;
            assert!(entry.companion_message_id.is_none());
            entry.remember_companion("M-companion");
        }

        let entry = ledger.lock(&post_id).await;
        assert_eq!(entry.companion_message_id.as_deref(), Some("M-companion"));
    }
}
