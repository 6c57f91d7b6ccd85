//! Server core functionality
//!
//! The listener/accept loop that hands each connection its own session.

pub mod core;

pub use self::core::Server;
