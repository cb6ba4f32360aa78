//! AniDB UDP return codes
//!
//! Every reply starts with a numeric return code. The codes the client acts
//! upon are listed explicitly; anything else is kept as [`ReturnCode::Other`].

use std::fmt;

/// Return code prefixed to every AniDB UDP reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    LoginAccepted,
    LoginAcceptedNewVersion,
    LoggedOut,
    MyListEntryAdded,
    MyListEntryDeleted,
    Calendar,
    Pong,
    FileAlreadyInMyList,
    MyListEntryEdited,
    NoSuchFile,
    NoSuchAnime,
    NoSuchEpisode,
    CalendarEmpty,
    NotLoggedIn,
    NoSuchMyListEntry,
    LoginFailed,
    LoginFirst,
    AccessDenied,
    ClientVersionOutdated,
    ClientBanned,
    IllegalInput,
    InvalidSession,
    Banned,
    UnknownCommand,
    InternalServerError,
    OutOfService,
    ServerBusy,
    Timeout,
    Other(u16),
}

/// Semantic grouping of return codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCategory {
    /// Command executed
    Success,
    /// Command understood but the target does not exist or nothing matched
    NotFound,
    /// Session missing, expired or rejected
    SessionInvalid,
    /// Client or account banned
    Banned,
    /// Temporary server condition; delay and resubmit
    Retryable,
    /// Permanent failure for this request
    Fatal,
    /// Code not known to this client
    Unknown,
}

impl ReturnCode {
    /// Numeric value as sent on the wire
    pub fn as_u16(&self) -> u16 {
        match self {
            Self::LoginAccepted => 200,
            Self::LoginAcceptedNewVersion => 201,
            Self::LoggedOut => 203,
            Self::MyListEntryAdded => 210,
            Self::MyListEntryDeleted => 211,
            Self::Calendar => 297,
            Self::Pong => 300,
            Self::FileAlreadyInMyList => 310,
            Self::MyListEntryEdited => 311,
            Self::NoSuchFile => 320,
            Self::NoSuchAnime => 330,
            Self::NoSuchEpisode => 340,
            Self::CalendarEmpty => 397,
            Self::NotLoggedIn => 403,
            Self::NoSuchMyListEntry => 411,
            Self::LoginFailed => 500,
            Self::LoginFirst => 501,
            Self::AccessDenied => 502,
            Self::ClientVersionOutdated => 503,
            Self::ClientBanned => 504,
            Self::IllegalInput => 505,
            Self::InvalidSession => 506,
            Self::Banned => 555,
            Self::UnknownCommand => 598,
            Self::InternalServerError => 600,
            Self::OutOfService => 601,
            Self::ServerBusy => 602,
            Self::Timeout => 604,
            Self::Other(code) => *code,
        }
    }

    /// Get a human-readable description of the return code
    pub fn description(&self) -> &'static str {
        match self {
            Self::LoginAccepted => "LOGIN ACCEPTED",
            Self::LoginAcceptedNewVersion => "LOGIN ACCEPTED - NEW VERSION AVAILABLE",
            Self::LoggedOut => "LOGGED OUT",
            Self::MyListEntryAdded => "MYLIST ENTRY ADDED",
            Self::MyListEntryDeleted => "MYLIST ENTRY DELETED",
            Self::Calendar => "CALENDAR",
            Self::Pong => "PONG",
            Self::FileAlreadyInMyList => "FILE ALREADY IN MYLIST",
            Self::MyListEntryEdited => "MYLIST ENTRY EDITED",
            Self::NoSuchFile => "NO SUCH FILE",
            Self::NoSuchAnime => "NO SUCH ANIME",
            Self::NoSuchEpisode => "NO SUCH EPISODE",
            Self::CalendarEmpty => "CALENDAR EMPTY",
            Self::NotLoggedIn => "NOT LOGGED IN",
            Self::NoSuchMyListEntry => "NO SUCH MYLIST ENTRY",
            Self::LoginFailed => "LOGIN FAILED",
            Self::LoginFirst => "LOGIN FIRST",
            Self::AccessDenied => "ACCESS DENIED",
            Self::ClientVersionOutdated => "CLIENT VERSION OUTDATED",
            Self::ClientBanned => "CLIENT BANNED",
            Self::IllegalInput => "ILLEGAL INPUT OR ACCESS DENIED",
            Self::InvalidSession => "INVALID SESSION",
            Self::Banned => "BANNED",
            Self::UnknownCommand => "UNKNOWN COMMAND",
            Self::InternalServerError => "INTERNAL SERVER ERROR",
            Self::OutOfService => "ANIDB OUT OF SERVICE",
            Self::ServerBusy => "SERVER BUSY",
            Self::Timeout => "TIMEOUT - DELAY AND RESUBMIT",
            Self::Other(_) => "UNKNOWN RESPONSE CODE",
        }
    }

    /// Semantic category of the code
    pub fn category(&self) -> CodeCategory {
        match self {
            Self::LoginAccepted
            | Self::LoginAcceptedNewVersion
            | Self::LoggedOut
            | Self::MyListEntryAdded
            | Self::MyListEntryDeleted
            | Self::Calendar
            | Self::Pong
            | Self::FileAlreadyInMyList
            | Self::MyListEntryEdited => CodeCategory::Success,
            Self::NoSuchFile
            | Self::NoSuchAnime
            | Self::NoSuchEpisode
            | Self::CalendarEmpty
            | Self::NoSuchMyListEntry => CodeCategory::NotFound,
            Self::NotLoggedIn | Self::LoginFirst | Self::InvalidSession => {
                CodeCategory::SessionInvalid
            }
            Self::ClientBanned | Self::Banned => CodeCategory::Banned,
            Self::InternalServerError | Self::OutOfService | Self::ServerBusy | Self::Timeout => {
                CodeCategory::Retryable
            }
            Self::LoginFailed
            | Self::AccessDenied
            | Self::ClientVersionOutdated
            | Self::IllegalInput
            | Self::UnknownCommand => CodeCategory::Fatal,
            Self::Other(code) => match code {
                500..=599 => CodeCategory::Fatal,
                600..=699 => CodeCategory::Retryable,
                _ => CodeCategory::Unknown,
            },
        }
    }

    /// The session is no longer usable
    pub fn is_session_invalid(&self) -> bool {
        self.category() == CodeCategory::SessionInvalid
    }

    /// The client or account is banned
    pub fn is_banned(&self) -> bool {
        self.category() == CodeCategory::Banned
    }

    /// Temporary server-side failure
    pub fn is_retryable(&self) -> bool {
        self.category() == CodeCategory::Retryable
    }
}

impl From<u16> for ReturnCode {
    fn from(code: u16) -> Self {
        match code {
            200 => Self::LoginAccepted,
            201 => Self::LoginAcceptedNewVersion,
            203 => Self::LoggedOut,
            210 => Self::MyListEntryAdded,
            211 => Self::MyListEntryDeleted,
            297 => Self::Calendar,
            300 => Self::Pong,
            310 => Self::FileAlreadyInMyList,
            311 => Self::MyListEntryEdited,
            320 => Self::NoSuchFile,
            330 => Self::NoSuchAnime,
            340 => Self::NoSuchEpisode,
            397 => Self::CalendarEmpty,
            403 => Self::NotLoggedIn,
            411 => Self::NoSuchMyListEntry,
            500 => Self::LoginFailed,
            501 => Self::LoginFirst,
            502 => Self::AccessDenied,
            503 => Self::ClientVersionOutdated,
            504 => Self::ClientBanned,
            505 => Self::IllegalInput,
            506 => Self::InvalidSession,
            555 => Self::Banned,
            598 => Self::UnknownCommand,
            600 => Self::InternalServerError,
            601 => Self::OutOfService,
            602 => Self::ServerBusy,
            604 => Self::Timeout,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.description())
    }
}
