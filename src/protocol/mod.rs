//! Poll protocol implementation
//!
//! Request/response tags and the framed duplex channel they travel over.

pub mod channel;
pub mod commands;
pub mod responses;

pub use channel::FramedChannel;
pub use commands::{Request, parse_request};
pub use responses::Response;
