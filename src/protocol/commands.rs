//! Module `commands`
//!
//! Client-to-server request tags and their decoding.

/// Tag of a SELECTION_COMPLETED request, followed by an int topic id.
pub const SELECTION_COMPLETED: i32 = 10;
/// Tag of a graceful disconnect request.
pub const REGULAR_DISCONNECT: i32 = 11;
/// Tag of a liveness ping.
pub const HEARTBEAT: i32 = 12;

/// A request tag read from the client.
///
/// Only the tag is decoded here; a `SelectionCompleted` payload is read by
/// the session right after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    SelectionCompleted,
    RegularDisconnect,
    Heartbeat,
    Unknown(i32),
}

/// Maps a raw request tag into the `Request` enum.
pub fn parse_request(tag: i32) -> Request {
    match tag {
        SELECTION_COMPLETED => Request::SelectionCompleted,
        REGULAR_DISCONNECT => Request::RegularDisconnect,
        HEARTBEAT => Request::Heartbeat,
        other => Request::Unknown(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tags() {
        assert_eq!(parse_request(10), Request::SelectionCompleted);
        assert_eq!(parse_request(11), Request::RegularDisconnect);
        assert_eq!(parse_request(12), Request::Heartbeat);
    }

    #[test]
    fn test_parse_unknown_tag() {
        assert_eq!(parse_request(0), Request::Unknown(0));
        assert_eq!(parse_request(-7), Request::Unknown(-7));
        // server->client tags are not valid requests
        assert_eq!(parse_request(1), Request::Unknown(1));
    }
}
