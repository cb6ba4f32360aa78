//! CALENDAR: recently aired and upcoming anime
//!
//! Each body line is `{aid}|{start epoch}|{date flags}`. Entries are split
//! into those that have definitely started airing and everything else.

use crate::protocol::codes::ReturnCode;
use crate::protocol::error::Result;
use crate::protocol::messages::Request;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use log::trace;
use std::fmt;
use std::ops::BitOr;

/// Date precision flags attached to a calendar entry
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CalendarFlags(u8);

impl CalendarFlags {
    pub const NONE: Self = Self(0);
    pub const START_DAY_UNKNOWN: Self = Self(1);
    pub const START_MONTH_DAY_UNKNOWN: Self = Self(2);
    pub const END_DAY_UNKNOWN: Self = Self(4);
    pub const END_MONTH_DAY_UNKNOWN: Self = Self(8);
    pub const AIRED_IN_PAST: Self = Self(16);
    pub const START_UNKNOWN: Self = Self(32);
    pub const END_UNKNOWN: Self = Self(64);

    /// Flags that make the start date unusable for ordering
    const START_IMPRECISE: Self =
        Self(Self::START_UNKNOWN.0 | Self::START_DAY_UNKNOWN.0 | Self::START_MONTH_DAY_UNKNOWN.0);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Start date is known to the day
    pub const fn start_known(self) -> bool {
        !self.intersects(Self::START_IMPRECISE)
    }
}

impl BitOr for CalendarFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for CalendarFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CalendarFlags({:#09b})", self.0)
    }
}

/// One anime in the calendar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    pub anime_id: u32,
    /// Start date; `None` when the server sent no date
    pub release_date: Option<DateTime<Utc>>,
    pub date_flags: CalendarFlags,
}

/// Calendar split at today
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calendar {
    /// Started strictly before today, with a fully known date
    pub previous: Vec<CalendarEntry>,
    /// Everything else, including entries with imprecise dates
    pub upcoming: Vec<CalendarEntry>,
}

/// CALENDAR command
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarRequest;

impl Request for CalendarRequest {
    type Payload = Calendar;

    const COMMAND: &'static str = "CALENDAR";
    const ACCEPTED: &'static [ReturnCode] = &[ReturnCode::Calendar, ReturnCode::CalendarEmpty];

    fn parameters(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn parse(&self, code: ReturnCode, body: &str) -> Result<Option<Calendar>> {
        if code == ReturnCode::CalendarEmpty {
            return Ok(None);
        }
        Ok(Some(parse_calendar(body, Utc::now().date_naive())))
    }
}

/// Split a calendar body relative to `today`.
///
/// Lines that are not exactly three numeric fields are skipped, which also
/// drops the status line.
pub fn parse_calendar(body: &str, today: NaiveDate) -> Calendar {
    let mut calendar = Calendar::default();

    for line in body.lines().filter(|line| !line.is_empty()) {
        let Some(entry) = parse_entry(line) else {
            trace!("Skipping calendar line {line:?}");
            continue;
        };

        let aired = entry.date_flags.start_known()
            && entry
                .release_date
                .is_some_and(|date| date.date_naive() < today);
        if aired {
            calendar.previous.push(entry);
        } else {
            calendar.upcoming.push(entry);
        }
    }

    calendar
}

fn parse_entry(line: &str) -> Option<CalendarEntry> {
    let parts: Vec<&str> = line.split('|').collect();
    let [aid, epoch, flags] = parts.as_slice() else {
        return None;
    };

    let anime_id = aid.parse().ok()?;
    let epoch: i64 = epoch.parse().ok()?;
    let flags: u8 = flags.parse().ok()?;

    // 0 means no date
    let release_date = if epoch == 0 {
        None
    } else {
        Utc.timestamp_opt(epoch, 0).single()
    };

    Some(CalendarEntry {
        anime_id,
        release_date,
        date_flags: CalendarFlags::from_bits(flags),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{RawResponse, dispatch};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn epoch(y: i32, m: u32, d: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp()
    }

    #[test]
    fn test_calendar_empty_is_absent() {
        let raw = RawResponse::parse("397 CALENDAR EMPTY").unwrap();
        let response = dispatch(&CalendarRequest, &raw).unwrap();
        assert_eq!(response.code, ReturnCode::CalendarEmpty);
        assert!(response.is_empty());
    }

    #[test]
    fn test_past_entry_with_known_date() {
        let body = format!("CALENDAR\n100|{}|0", epoch(2024, 6, 1));
        let calendar = parse_calendar(&body, today());
        assert_eq!(calendar.previous.len(), 1);
        assert_eq!(calendar.previous[0].anime_id, 100);
        assert!(calendar.upcoming.is_empty());
    }

    #[test]
    fn test_start_unknown_is_upcoming_regardless_of_date() {
        let body = format!("CALENDAR\n100|{}|32", epoch(2020, 1, 1));
        let calendar = parse_calendar(&body, today());
        assert!(calendar.previous.is_empty());
        assert_eq!(calendar.upcoming.len(), 1);
        assert!(
            calendar.upcoming[0]
                .date_flags
                .contains(CalendarFlags::START_UNKNOWN)
        );
    }

    #[test]
    fn test_imprecise_start_is_upcoming() {
        let past = epoch(2020, 1, 1);
        let body = format!("CALENDAR\n1|{past}|1\n2|{past}|2\n3|{past}|16\n4|{past}|64");
        let calendar = parse_calendar(&body, today());
        let previous: Vec<u32> = calendar.previous.iter().map(|e| e.anime_id).collect();
        let upcoming: Vec<u32> = calendar.upcoming.iter().map(|e| e.anime_id).collect();
        assert_eq!(previous, vec![3, 4]);
        assert_eq!(upcoming, vec![1, 2]);
    }

    #[test]
    fn test_today_and_future_are_upcoming() {
        let body = format!(
            "CALENDAR\n5|{}|0\n6|{}|0",
            epoch(2024, 6, 15),
            epoch(2024, 7, 1)
        );
        let calendar = parse_calendar(&body, today());
        assert!(calendar.previous.is_empty());
        assert_eq!(calendar.upcoming.len(), 2);
    }

    #[test]
    fn test_zero_epoch_has_no_date() {
        let calendar = parse_calendar("CALENDAR\n7|0|0", today());
        assert!(calendar.previous.is_empty());
        assert_eq!(calendar.upcoming[0].release_date, None);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let body = format!(
            "CALENDAR\n1|2|3|4\nabc|{}|0\n8|notanumber|0\n9|{}|0\n\n10|{}|x",
            epoch(2024, 1, 1),
            epoch(2024, 1, 1),
            epoch(2024, 1, 1)
        );
        let calendar = parse_calendar(&body, today());
        assert_eq!(calendar.previous.len(), 1);
        assert_eq!(calendar.previous[0].anime_id, 9);
        assert!(calendar.upcoming.is_empty());
    }

    #[test]
    fn test_flags() {
        let flags = CalendarFlags::AIRED_IN_PAST | CalendarFlags::END_UNKNOWN;
        assert_eq!(flags.bits(), 80);
        assert!(flags.start_known());
        assert!(!CalendarFlags::START_DAY_UNKNOWN.start_known());
        assert!(flags.contains(CalendarFlags::END_UNKNOWN));
        assert!(!flags.contains(CalendarFlags::START_UNKNOWN));
    }
}
