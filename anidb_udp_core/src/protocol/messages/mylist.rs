//! MyList commands
//!
//! Files are addressed by size and ed2k hash. MYLISTADD either creates an
//! entry (210) or reports the one already there (310); with `edit=1` it
//! updates an existing entry instead.

use crate::protocol::codes::ReturnCode;
use crate::protocol::error::{ProtocolError, Result};
use crate::protocol::messages::{Request, parse_fields};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Storage state of a MyList entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum MyListState {
    #[default]
    Unknown = 0,
    /// On a local hard drive
    Internal = 1,
    /// On removable media
    External = 2,
    Deleted = 3,
    /// On a network share
    Remote = 4,
}

impl MyListState {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for MyListState {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, u8> {
        match value {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Internal),
            2 => Ok(Self::External),
            3 => Ok(Self::Deleted),
            4 => Ok(Self::Remote),
            other => Err(other),
        }
    }
}

/// Result of adding a file to MyList
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MyListAddResult {
    pub my_list_id: u64,
    pub state: MyListState,
    pub is_watched: bool,
    pub watched_date: Option<DateTime<Utc>>,
}

/// MYLISTADD by size and ed2k
#[derive(Debug, Clone)]
pub struct AddFileRequest {
    pub size: u64,
    pub ed2k: String,
    pub state: MyListState,
    pub watched: bool,
    pub watched_date: Option<DateTime<Utc>>,
}

impl AddFileRequest {
    pub fn new(size: u64, ed2k: impl Into<String>, state: MyListState) -> Self {
        Self {
            size,
            ed2k: ed2k.into(),
            state,
            watched: false,
            watched_date: None,
        }
    }

    /// Mark the file watched, optionally at a known time
    pub fn watched(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.watched = true;
        self.watched_date = at;
        self
    }
}

fn file_parameters(
    size: u64,
    ed2k: &str,
    state: MyListState,
    watched: bool,
    watched_date: Option<DateTime<Utc>>,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("size", size.to_string()),
        ("ed2k", ed2k.to_string()),
        ("state", state.as_u8().to_string()),
    ];
    if watched {
        params.push(("viewed", "1".to_string()));
        if let Some(date) = watched_date {
            params.push(("viewdate", date.timestamp().to_string()));
        }
    }
    params
}

impl Request for AddFileRequest {
    type Payload = MyListAddResult;

    const COMMAND: &'static str = "MYLISTADD";
    const ACCEPTED: &'static [ReturnCode] = &[
        ReturnCode::MyListEntryAdded,
        ReturnCode::FileAlreadyInMyList,
    ];

    fn parameters(&self) -> Vec<(&'static str, String)> {
        file_parameters(
            self.size,
            &self.ed2k,
            self.state,
            self.watched,
            self.watched_date,
        )
    }

    fn parse(&self, code: ReturnCode, body: &str) -> Result<Option<MyListAddResult>> {
        let malformed = |field| ProtocolError::malformed(Self::COMMAND, code, field, body);
        let line = body.lines().nth(1).ok_or_else(|| malformed("lid"))?;

        if code == ReturnCode::MyListEntryAdded {
            // {int4 mylist id of new entry}
            let my_list_id = line.trim().parse().map_err(|_| malformed("lid"))?;
            return Ok(Some(MyListAddResult {
                my_list_id,
                state: self.state,
                is_watched: self.watched,
                watched_date: self.watched_date,
            }));
        }

        // {lid}|{fid}|{eid}|{aid}|{gid}|{date}|{state}|{viewdate}|{storage}|{source}|{other}|{filestate}
        let fields = parse_fields(line);
        let my_list_id = fields
            .first()
            .and_then(|lid| lid.parse().ok())
            .ok_or_else(|| malformed("lid"))?;
        let state = fields
            .get(6)
            .and_then(|state| state.parse::<u8>().ok())
            .and_then(|state| MyListState::try_from(state).ok())
            .ok_or_else(|| malformed("state"))?;
        let viewdate: i64 = fields
            .get(7)
            .and_then(|date| date.parse().ok())
            .ok_or_else(|| malformed("viewdate"))?;

        let is_watched = viewdate > 0;
        let watched_date = if is_watched {
            Some(
                Utc.timestamp_opt(viewdate, 0)
                    .single()
                    .ok_or_else(|| malformed("viewdate"))?,
            )
        } else {
            None
        };

        Ok(Some(MyListAddResult {
            my_list_id,
            state,
            is_watched,
            watched_date,
        }))
    }
}

/// MYLISTADD with `edit=1`: update the state of an existing entry
#[derive(Debug, Clone)]
pub struct UpdateFileRequest {
    pub size: u64,
    pub ed2k: String,
    pub state: MyListState,
    pub watched: bool,
    pub watched_date: Option<DateTime<Utc>>,
}

impl UpdateFileRequest {
    pub fn new(size: u64, ed2k: impl Into<String>, state: MyListState) -> Self {
        Self {
            size,
            ed2k: ed2k.into(),
            state,
            watched: false,
            watched_date: None,
        }
    }

    pub fn watched(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.watched = true;
        self.watched_date = at;
        self
    }
}

impl Request for UpdateFileRequest {
    /// Number of entries edited
    type Payload = u32;

    const COMMAND: &'static str = "MYLISTADD";
    const ACCEPTED: &'static [ReturnCode] = &[
        ReturnCode::MyListEntryEdited,
        ReturnCode::NoSuchMyListEntry,
    ];

    fn parameters(&self) -> Vec<(&'static str, String)> {
        let mut params = file_parameters(
            self.size,
            &self.ed2k,
            self.state,
            self.watched,
            self.watched_date,
        );
        params.push(("edit", "1".to_string()));
        params
    }

    fn parse(&self, code: ReturnCode, body: &str) -> Result<Option<u32>> {
        if code == ReturnCode::NoSuchMyListEntry {
            return Ok(None);
        }
        // A count follows only when more than one entry matched
        match body.lines().nth(1) {
            Some(count) => count
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ProtocolError::malformed(Self::COMMAND, code, "count", body)),
            None => Ok(Some(1)),
        }
    }
}

/// MYLISTDEL by size and ed2k
#[derive(Debug, Clone)]
pub struct RemoveFileRequest {
    pub size: u64,
    pub ed2k: String,
}

impl RemoveFileRequest {
    pub fn new(size: u64, ed2k: impl Into<String>) -> Self {
        Self {
            size,
            ed2k: ed2k.into(),
        }
    }
}

impl Request for RemoveFileRequest {
    type Payload = ();

    const COMMAND: &'static str = "MYLISTDEL";
    // The entry being gone already is as good as deleting it
    const ACCEPTED: &'static [ReturnCode] = &[
        ReturnCode::MyListEntryDeleted,
        ReturnCode::NoSuchMyListEntry,
        ReturnCode::NoSuchFile,
    ];

    fn parameters(&self) -> Vec<(&'static str, String)> {
        vec![("size", self.size.to_string()), ("ed2k", self.ed2k.clone())]
    }

    fn parse(&self, _code: ReturnCode, _body: &str) -> Result<Option<()>> {
        Ok(None)
    }
}
