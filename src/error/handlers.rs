//! Error handlers
//!
//! Provides error reporting and the error-to-wire mapping used before a
//! session closes its connection.

use crate::error::types::{PollServerError, SessionError};
use crate::protocol::Response;
use log::error;

/// Handle a server error
pub fn handle_error(err: &PollServerError) {
    error!("Poll Server Error: {}", err);
}

/// Marker sent to the peer before the connection is torn down, if any.
///
/// A rejected duplicate never receives protocol traffic.
pub fn error_to_wire_tag(err: &SessionError) -> Option<Response> {
    match err {
        SessionError::DuplicateConnection(_) => None,
        SessionError::ProtocolViolation(_) => Some(Response::IllegalRequest),
        SessionError::Transport(_) => Some(Response::UnexpectedError),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_wire_tag_per_error_kind() {
        let dup = SessionError::DuplicateConnection(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(error_to_wire_tag(&dup), None);

        let violation = SessionError::ProtocolViolation(99);
        assert_eq!(error_to_wire_tag(&violation), Some(Response::IllegalRequest));

        let transport = SessionError::Transport(io::Error::from(io::ErrorKind::BrokenPipe));
        assert_eq!(error_to_wire_tag(&transport), Some(Response::UnexpectedError));
    }
}
