//! Typed requests and the response envelope
//!
//! Each command is a [`Request`]: a command name, the return codes it
//! accepts, its ordered parameters and a parser from `(code, body)` to a
//! typed payload. Rendering, reply splitting and code checking are shared.

pub mod auth;
pub mod calendar;
pub mod mylist;

pub use auth::{AuthRequest, AuthResult, LogoutRequest, PingRequest};
pub use calendar::{Calendar, CalendarEntry, CalendarFlags, CalendarRequest};
pub use mylist::{
    AddFileRequest, MyListAddResult, MyListState, RemoveFileRequest, UpdateFileRequest,
};

use crate::protocol::codes::ReturnCode;
use crate::protocol::error::{ProtocolError, Result};
use log::error;
use std::fmt;

/// Field separator within a reply line
pub const FIELD_SEPARATOR: char = '|';

/// Newline encoding for multiline values
pub const ENCODED_NEWLINE: &str = "<br />";

/// Quote encoding
pub const ENCODED_QUOTE: &str = "`";

/// Pipe encoding
pub const ENCODED_PIPE: &str = "/";

/// A typed AniDB command
pub trait Request: fmt::Debug + Send + Sync {
    /// Parsed payload of a successful reply
    type Payload: Send;

    /// Command name as sent on the wire
    const COMMAND: &'static str;

    /// Return codes this command understands; anything else is unexpected
    const ACCEPTED: &'static [ReturnCode];

    /// Whether the session id must be attached
    const REQUIRES_SESSION: bool = true;

    /// Keep the short delay tier even after sustained use
    const FORCE_SHORT_DELAY: bool = false;

    /// Parameters whose values must never reach the logs
    const SENSITIVE: &'static [&'static str] = &[];

    /// Command parameters, in wire order
    fn parameters(&self) -> Vec<(&'static str, String)>;

    /// Map an accepted return code and the reply body to a payload
    fn parse(&self, code: ReturnCode, body: &str) -> Result<Option<Self::Payload>>;
}

/// Typed reply: the return code and the payload it implied, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Response<T> {
    pub code: ReturnCode,
    pub payload: Option<T>,
}

impl<T> Response<T> {
    /// Take the payload
    pub fn into_payload(self) -> Option<T> {
        self.payload
    }

    /// True when the reply carried no payload
    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }
}

/// A reply split into tag, return code and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Echoed request tag, if the request carried one
    pub tag: Option<String>,
    /// Leading return code
    pub code: ReturnCode,
    /// Everything after the code: rest of the first line plus following lines
    pub body: String,
}

impl RawResponse {
    /// Split a decoded reply.
    ///
    /// Tags generated by the client never start with a digit, so a leading
    /// numeric token is the return code and anything else is a tag.
    pub fn parse(text: &str) -> Result<Self> {
        let (first, rest) = split_token(text);
        if first.is_empty() {
            return Err(ProtocolError::decoding("Empty response"));
        }

        let (tag, code_token, body) = if first.starts_with(|c: char| c.is_ascii_digit()) {
            (None, first, rest)
        } else {
            let (code_token, body) = split_token(rest);
            (Some(first.to_string()), code_token, body)
        };

        let code = code_token.parse::<u16>().map_err(|_| {
            ProtocolError::decoding(format!("Invalid response code: {code_token:?}"))
        })?;

        Ok(Self {
            tag,
            code: ReturnCode::from(code),
            body: body.to_string(),
        })
    }

    /// First line of the body, the server's status message
    pub fn message(&self) -> &str {
        self.body.lines().next().unwrap_or("")
    }
}

/// Split off the first token of the first line. A separating space is
/// consumed; a separating newline is kept so the remainder still starts a
/// new line.
fn split_token(s: &str) -> (&str, &str) {
    match s.find([' ', '\n']) {
        Some(i) => {
            let (token, rest) = s.split_at(i);
            (token, rest.strip_prefix(' ').unwrap_or(rest))
        }
        None => (s, ""),
    }
}

/// Render a request as a command line
pub fn render<R: Request>(request: &R, session: Option<&str>, tag: Option<&str>) -> String {
    render_with(request, session, tag, false)
}

/// Render a request for logging, with sensitive values masked
pub fn render_masked<R: Request>(request: &R, session: Option<&str>, tag: Option<&str>) -> String {
    render_with(request, session, tag, true)
}

fn render_with<R: Request>(
    request: &R,
    session: Option<&str>,
    tag: Option<&str>,
    masked: bool,
) -> String {
    let mut params: Vec<String> = request
        .parameters()
        .into_iter()
        .map(|(key, value)| {
            if masked && R::SENSITIVE.contains(&key) {
                format!("{key}=***")
            } else {
                format!("{key}={}", encode_value(&value))
            }
        })
        .collect();

    if let Some(session) = session {
        params.push(format!("s={}", encode_value(session)));
    }
    if let Some(tag) = tag {
        params.push(format!("tag={}", encode_value(tag)));
    }

    if params.is_empty() {
        R::COMMAND.to_string()
    } else {
        format!("{} {}", R::COMMAND, params.join("&"))
    }
}

/// Check the reply code against the command and run its parser
pub fn dispatch<R: Request>(request: &R, raw: &RawResponse) -> Result<Response<R::Payload>> {
    if !R::ACCEPTED.contains(&raw.code) {
        error!(
            "Unexpected response to {}: {} (raw body: {:?})",
            R::COMMAND,
            raw.code,
            raw.body
        );
        return Err(ProtocolError::unexpected(R::COMMAND, raw.code, raw.body.clone()));
    }

    let payload = request.parse(raw.code, &raw.body)?;
    Ok(Response {
        code: raw.code,
        payload,
    })
}

/// Encode a value for AniDB protocol transmission
///
/// AniDB expects option values in html form encoding: `&` becomes `&amp;`
/// and newlines become `<br />`. Other characters go out unchanged.
pub fn encode_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len() + 10);

    for ch in value.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '\n' => result.push_str(ENCODED_NEWLINE),
            '\r' => continue,
            _ => result.push(ch),
        }
    }

    result
}

/// Decode a reply field
///
/// Reverses `&amp;` and `<br />`, and maps AniDB's reply escapes: a
/// backtick stands for an apostrophe and a lone `/` for a pipe.
pub fn decode_value(value: &str) -> String {
    if value == ENCODED_PIPE {
        return FIELD_SEPARATOR.to_string();
    }

    value
        .replace("&amp;", "&")
        .replace(ENCODED_NEWLINE, "\n")
        .replace(ENCODED_QUOTE, "'")
}

/// Split a reply line into decoded fields
pub fn parse_fields(line: &str) -> Vec<String> {
    line.split(FIELD_SEPARATOR).map(decode_value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Probe {
        name: String,
        secret: String,
    }

    impl Request for Probe {
        type Payload = String;
        const COMMAND: &'static str = "PROBE";
        const ACCEPTED: &'static [ReturnCode] = &[ReturnCode::Pong];
        const SENSITIVE: &'static [&'static str] = &["secret"];

        fn parameters(&self) -> Vec<(&'static str, String)> {
            vec![("name", self.name.clone()), ("secret", self.secret.clone())]
        }

        fn parse(&self, _code: ReturnCode, body: &str) -> Result<Option<String>> {
            Ok(body.lines().nth(1).map(str::to_string))
        }
    }

    fn probe() -> Probe {
        Probe {
            name: "a&b".to_string(),
            secret: "hunter2".to_string(),
        }
    }

    #[test]
    fn test_encode_value() {
        assert_eq!(encode_value("simple"), "simple");
        assert_eq!(encode_value("with&ampersand"), "with&amp;ampersand");
        assert_eq!(encode_value("line1\r\nline2"), "line1<br />line2");
        assert_eq!(encode_value("P@ssw0rd!#2024"), "P@ssw0rd!#2024");
    }

    #[test]
    fn test_decode_value() {
        assert_eq!(decode_value("simple"), "simple");
        assert_eq!(decode_value("line1<br />line2"), "line1\nline2");
        assert_eq!(decode_value("quote`here"), "quote'here");
        assert_eq!(decode_value("/"), "|");
        assert_eq!(decode_value("/path/to/file"), "/path/to/file");
        assert_eq!(decode_value("test&amp;user"), "test&user");
    }

    #[test]
    fn test_render_orders_params_and_appends_session_and_tag() {
        let rendered = render(&probe(), Some("abc12"), Some("t7"));
        assert_eq!(rendered, "PROBE name=a&amp;b&secret=hunter2&s=abc12&tag=t7");
    }

    #[test]
    fn test_render_masked_hides_sensitive_values() {
        let rendered = render_masked(&probe(), None, None);
        assert_eq!(rendered, "PROBE name=a&amp;b&secret=***");
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_raw_response_untagged() {
        let raw = RawResponse::parse("210 MYLIST ENTRY ADDED\n12345").unwrap();
        assert_eq!(raw.tag, None);
        assert_eq!(raw.code, ReturnCode::MyListEntryAdded);
        assert_eq!(raw.body, "MYLIST ENTRY ADDED\n12345");
        assert_eq!(raw.message(), "MYLIST ENTRY ADDED");
    }

    #[test]
    fn test_raw_response_tagged() {
        let raw = RawResponse::parse("t12 300 PONG\n4242").unwrap();
        assert_eq!(raw.tag.as_deref(), Some("t12"));
        assert_eq!(raw.code, ReturnCode::Pong);
        assert_eq!(raw.body, "PONG\n4242");
    }

    #[test]
    fn test_raw_response_code_followed_by_newline() {
        let raw = RawResponse::parse("210\n12345").unwrap();
        assert_eq!(raw.code, ReturnCode::MyListEntryAdded);
        assert_eq!(raw.body, "\n12345");
    }

    #[test]
    fn test_raw_response_bare_code() {
        let raw = RawResponse::parse("555").unwrap();
        assert_eq!(raw.code, ReturnCode::Banned);
        assert_eq!(raw.body, "");
    }

    #[test]
    fn test_raw_response_rejects_garbage() {
        assert!(RawResponse::parse("").is_err());
        assert!(RawResponse::parse("INVALID RESPONSE FORMAT").is_err());
    }

    #[test]
    fn test_dispatch_accepted_code() {
        let raw = RawResponse::parse("300 PONG\n4242").unwrap();
        let response = dispatch(&probe(), &raw).unwrap();
        assert_eq!(response.code, ReturnCode::Pong);
        assert_eq!(response.payload.as_deref(), Some("4242"));
    }

    #[test]
    fn test_dispatch_rejects_unlisted_code() {
        let raw = RawResponse::parse("320 NO SUCH FILE").unwrap();
        match dispatch(&probe(), &raw) {
            Err(ProtocolError::UnexpectedResponse {
                command,
                code,
                body,
            }) => {
                assert_eq!(command, "PROBE");
                assert_eq!(code, ReturnCode::NoSuchFile);
                assert_eq!(body, "NO SUCH FILE");
            }
            other => panic!("Expected UnexpectedResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_fields() {
        assert_eq!(parse_fields("a|b|c"), vec!["a", "b", "c"]);
        assert_eq!(parse_fields("x|/|y`s"), vec!["x", "|", "y's"]);
    }
}
