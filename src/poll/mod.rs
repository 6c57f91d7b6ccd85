//! Poll domain
//!
//! The topic catalog offered to clients and the coordinator that tallies
//! their votes.

pub mod catalog;
pub mod coordinator;

pub use catalog::{TopicCatalog, TopicPair};
pub use coordinator::{PollCoordinator, VoteCoordinator};

/// Stable identifier of a poll topic, sent over the wire as an int.
pub type TopicId = i32;
