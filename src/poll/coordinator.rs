//! Module `coordinator`
//!
//! Aggregate vote counts per topic and the live client-count gauge. Every
//! session reports into the same coordinator concurrently.

use log::{debug, info};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::poll::TopicId;

/// Operations a session may request from the shared coordinator.
///
/// Both must be safe to call from many sessions at once.
pub trait VoteCoordinator: Send + Sync {
    fn report_client_count(&self, count: usize);
    fn increment_vote(&self, topic: TopicId);
}

/// In-process tally of votes and connected clients.
#[derive(Debug, Default)]
pub struct PollCoordinator {
    votes: Mutex<HashMap<TopicId, u64>>,
    client_count: AtomicUsize,
}

impl PollCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn votes_for(&self, topic: TopicId) -> u64 {
        self.lock_votes().get(&topic).copied().unwrap_or(0)
    }

    /// Snapshot of all tallies, sorted by topic id.
    pub fn tally(&self) -> Vec<(TopicId, u64)> {
        let mut tally: Vec<_> = self
            .lock_votes()
            .iter()
            .map(|(topic, count)| (*topic, *count))
            .collect();
        tally.sort_unstable();
        tally
    }

    pub fn total_votes(&self) -> u64 {
        self.lock_votes().values().sum()
    }

    pub fn client_count(&self) -> usize {
        self.client_count.load(Ordering::SeqCst)
    }

    fn lock_votes(&self) -> std::sync::MutexGuard<'_, HashMap<TopicId, u64>> {
        // A panic while holding the lock cannot leave a half-applied increment.
        self.votes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl VoteCoordinator for PollCoordinator {
    fn report_client_count(&self, count: usize) {
        self.client_count.store(count, Ordering::SeqCst);
        info!("Connected clients: {}", count);
    }

    fn increment_vote(&self, topic: TopicId) {
        let mut votes = self.lock_votes();
        let count = votes.entry(topic).or_insert(0);
        *count += 1;
        debug!("Topic {} now has {} votes", topic, count);
    }
}
