//! Wire contract shared by both ingestion listeners
//!
//! Each TCP connection carries exactly one frame: a single bounded read of at
//! most [`MAX_FRAME_SIZE`] bytes. Frame bodies are `|`-delimited text:
//! - Room:       `code|version|count|langId|serverName|playerName`
//! - Anti-cheat: `clientId|friendCode|reporterName|reason`
//!
//! The literal `Test` is a liveness probe answered with [`PROBE_REPLY`].

use crate::models::{GameVersion, LangName, Room, SuspicionReport};
use thiserror::Error;

/// Size of the single read performed per connection.
pub const MAX_FRAME_SIZE: usize = 2048;
pub const PROBE_REQUEST: &str = "Test";
pub const PROBE_REPLY: &str = "Test Form SERVER";

pub const ROOM_FIELDS: usize = 6;
pub const REPORT_FIELDS: usize = 4;

/// Why a frame was discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },
    #[error("invalid version: {0:?}")]
    InvalidVersion(String),
    #[error("invalid player count: {0:?}")]
    InvalidCount(String),
    #[error("invalid language id: {0:?}")]
    InvalidLanguage(String),
    #[error("invalid client id: {0:?}")]
    InvalidClientId(String),
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Probe,
    Message(String),
}

/// Decode the bytes of one read as text, dropping NUL padding and a trailing
/// line terminator.
pub fn decode_frame(bytes: &[u8]) -> String {
    let bytes = &bytes[..bytes.len().min(MAX_FRAME_SIZE)];
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

pub fn classify(bytes: &[u8]) -> Frame {
    let text = decode_frame(bytes);
    if text == PROBE_REQUEST {
        Frame::Probe
    } else {
        Frame::Message(text)
    }
}

fn split_fields(text: &str, expected: usize) -> Result<Vec<&str>, ParseError> {
    let fields: Vec<&str> = text.split('|').collect();
    if fields.len() < expected {
        return Err(ParseError::TooFewFields {
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

/// Parse a Room announcement. Fields past the sixth are ignored.
pub fn parse_room(text: &str) -> Result<Room, ParseError> {
    let fields = split_fields(text, ROOM_FIELDS)?;

    let version: GameVersion = fields[1]
        .parse()
        .map_err(|_| ParseError::InvalidVersion(fields[1].to_string()))?;
    let count: u32 = fields[2]
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidCount(fields[2].to_string()))?;
    let lang_id = fields[3]
        .trim()
        .parse::<u8>()
        .ok()
        .and_then(|id| LangName::try_from(id).ok())
        .ok_or_else(|| ParseError::InvalidLanguage(fields[3].to_string()))?;

    Ok(Room {
        code: fields[0].to_string(),
        version,
        count,
        lang_id,
        server_name: fields[4].to_string(),
        player_name: fields[5].to_string(),
    })
}

/// Parse an anti-cheat report. Fields past the fourth are ignored.
pub fn parse_report(text: &str) -> Result<SuspicionReport, ParseError> {
    let fields = split_fields(text, REPORT_FIELDS)?;

    let client_id: i32 = fields[0]
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidClientId(fields[0].to_string()))?;

    Ok(SuspicionReport {
        client_id,
        friend_code: fields[1].to_string(),
        reporter_name: fields[2].to_string(),
        reason: fields[3].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_detection() {
        assert_eq!(classify(b"Test"), Frame::Probe);
        assert_eq!(classify(b"Test\r\n"), Frame::Probe);
        assert_eq!(classify(b"Test\0\0\0\0"), Frame::Probe);
        assert_eq!(classify(b"Testing"), Frame::Message("Testing".to_string()));
        assert_eq!(classify(b"test"), Frame::Message("test".to_string()));
    }

    #[test]
    fn test_decode_strips_padding() {
        let mut buf = [0u8; 32];
        buf[..9].copy_from_slice(b"a|b|c|d\n\0");
        assert_eq!(decode_frame(&buf), "a|b|c|d");
    }

    #[test]
    fn test_decode_caps_at_frame_size() {
        let big = vec![b'x'; MAX_FRAME_SIZE + 100];
        assert_eq!(decode_frame(&big).len(), MAX_FRAME_SIZE);
    }

    #[test]
    fn test_parse_room_example() {
        let room = parse_room("ABCD|1.2.3.4|8|13|MyServer|PlayerOne").unwrap();
        assert_eq!(room.code, "ABCD");
        assert_eq!(room.version, GameVersion::new(1, 2, 3, 4));
        assert_eq!(room.count, 8);
        assert_eq!(room.lang_id, LangName::SChinese);
        assert_eq!(room.server_name, "MyServer");
        assert_eq!(room.player_name, "PlayerOne");
    }

    #[test]
    fn test_parse_room_ignores_trailing_fields() {
        let room = parse_room("ABCD|1.2|0|0|S|P|extra|junk").unwrap();
        assert_eq!(room.player_name, "P");
    }

    #[test]
    fn test_parse_room_rejections() {
        assert_eq!(
            parse_room("ABCD|1.2.3.4|8|13|MyServer"),
            Err(ParseError::TooFewFields { expected: 6, found: 5 })
        );
        assert!(matches!(
            parse_room("ABCD|one|8|13|S|P"),
            Err(ParseError::InvalidVersion(_))
        ));
        assert!(matches!(
            parse_room("ABCD|1.2.3.4|-1|13|S|P"),
            Err(ParseError::InvalidCount(_))
        ));
        assert!(matches!(
            parse_room("ABCD|1.2.3.4|8|16|S|P"),
            Err(ParseError::InvalidLanguage(_))
        ));
        assert!(matches!(
            parse_room("ABCD|1.2.3.4|8|300|S|P"),
            Err(ParseError::InvalidLanguage(_))
        ));
    }

    #[test]
    fn test_parse_report() {
        let report = parse_report("c1|7|hacker|aimbot");
        assert!(matches!(report, Err(ParseError::InvalidClientId(_))));

        let report = parse_report("7|c1|hacker|aimbot").unwrap();
        assert_eq!(report.client_id, 7);
        assert_eq!(report.friend_code, "c1");
        assert_eq!(report.reporter_name, "hacker");
        assert_eq!(report.reason, "aimbot");

        assert_eq!(
            parse_report("7|c1|hacker"),
            Err(ParseError::TooFewFields { expected: 4, found: 3 })
        );
    }
}
