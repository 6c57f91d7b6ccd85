//! Module `catalog`
//!
//! Immutable mapping from topic id to label, shared read-only by every
//! session, and the random pair selection used for each offer.

use rand::Rng;
use std::collections::BTreeMap;

use crate::error::CatalogError;
use crate::poll::TopicId;

/// Two distinct topics currently offered to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicPair {
    pub first: TopicId,
    pub second: TopicId,
}

impl TopicPair {
    pub fn contains(&self, topic: TopicId) -> bool {
        self.first == topic || self.second == topic
    }
}

#[derive(Debug, Clone)]
pub struct TopicCatalog {
    topics: BTreeMap<TopicId, String>,
    ids: Vec<TopicId>,
}

impl TopicCatalog {
    /// Builds a catalog, rejecting duplicate ids and catalogs that cannot
    /// produce a distinct pair.
    pub fn new<I>(entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (TopicId, String)>,
    {
        let mut topics = BTreeMap::new();
        for (id, label) in entries {
            if topics.insert(id, label).is_some() {
                return Err(CatalogError::DuplicateTopic(id));
            }
        }

        if topics.len() < 2 {
            return Err(CatalogError::TooFewTopics(topics.len()));
        }

        let ids = topics.keys().copied().collect();
        Ok(Self { topics, ids })
    }

    pub fn label(&self, topic: TopicId) -> Option<&str> {
        self.topics.get(&topic).map(String::as_str)
    }

    pub fn contains(&self, topic: TopicId) -> bool {
        self.topics.contains_key(&topic)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Draws two distinct topics uniformly at random.
    ///
    /// The second draw is resampled until it differs from the first.
    pub fn offer_pair<R: Rng>(&self, rng: &mut R) -> TopicPair {
        let first = rng.gen_range(0..self.ids.len());
        let mut second = rng.gen_range(0..self.ids.len());
        while second == first {
            second = rng.gen_range(0..self.ids.len());
        }

        TopicPair {
            first: self.ids[first],
            second: self.ids[second],
        }
    }
}
