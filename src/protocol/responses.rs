//! Server-to-client markers
//!
//! Defines the tags the server writes ahead of each message.

pub const UPDATE_POLL_DATA: i32 = 1;
pub const TIME_RELAPSE: i32 = 2;
pub const ILLEGAL_REQUEST: i32 = 3;
pub const UNEXPECTED_ERROR: i32 = 4;

/// Marker written by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Followed by two (id, label) pairs
    UpdatePollData,
    /// A topic offer follows
    TimeRelapse,
    IllegalRequest,
    UnexpectedError,
}

impl Response {
    pub fn tag(self) -> i32 {
        match self {
            Response::UpdatePollData => UPDATE_POLL_DATA,
            Response::TimeRelapse => TIME_RELAPSE,
            Response::IllegalRequest => ILLEGAL_REQUEST,
            Response::UnexpectedError => UNEXPECTED_ERROR,
        }
    }
}
