//! Error types
//!
//! Defines domain-specific error types for the catalog, the per-connection
//! session and the server as a whole.

use std::fmt;
use std::io;
use std::net::IpAddr;

use crate::poll::TopicId;

/// Topic catalog construction errors
#[derive(Debug)]
pub enum CatalogError {
    TooFewTopics(usize),
    DuplicateTopic(TopicId),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::TooFewTopics(n) => {
                write!(f, "At least two topics are required, got {}", n)
            }
            CatalogError::DuplicateTopic(id) => write!(f, "Duplicate topic id: {}", id),
        }
    }
}

impl std::error::Error for CatalogError {}

/// Session errors, each one fatal to the session that raised it
#[derive(Debug)]
pub enum SessionError {
    /// Peer address already has a registered session. Raised before any
    /// protocol traffic; the acceptor owns the connection cleanup.
    DuplicateConnection(IpAddr),
    /// Unrecognized request tag
    ProtocolViolation(i32),
    /// Any read/write failure on the channel
    Transport(io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::DuplicateConnection(ip) => {
                write!(f, "A client from {} is already connected", ip)
            }
            SessionError::ProtocolViolation(tag) => write!(f, "Illegal request tag: {}", tag),
            SessionError::Transport(e) => write!(f, "Transport error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SessionError {
    fn from(error: io::Error) -> Self {
        SessionError::Transport(error)
    }
}

/// General server error that encompasses all error types
#[derive(Debug)]
pub enum PollServerError {
    Config(config::ConfigError),
    Catalog(CatalogError),
    IoError(io::Error),
}

impl fmt::Display for PollServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollServerError::Config(e) => write!(f, "Configuration error: {}", e),
            PollServerError::Catalog(e) => write!(f, "Catalog error: {}", e),
            PollServerError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for PollServerError {}

impl From<config::ConfigError> for PollServerError {
    fn from(error: config::ConfigError) -> Self {
        PollServerError::Config(error)
    }
}

impl From<CatalogError> for PollServerError {
    fn from(error: CatalogError) -> Self {
        PollServerError::Catalog(error)
    }
}

impl From<io::Error> for PollServerError {
    fn from(error: io::Error) -> Self {
        PollServerError::IoError(error)
    }
}
