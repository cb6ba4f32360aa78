//! Canned reply texts, without tags

/// 200 with a session key
pub fn login_accepted(session: &str) -> String {
    format!("200 {session} LOGIN ACCEPTED")
}

/// 200 in NAT mode
pub fn login_accepted_nat(session: &str, public: &str) -> String {
    format!("200 {session} {public} LOGIN ACCEPTED")
}

pub fn login_failed() -> String {
    "500 LOGIN FAILED".to_string()
}

pub fn logged_out() -> String {
    "203 LOGGED OUT".to_string()
}

pub fn pong() -> String {
    "300 PONG".to_string()
}

pub fn banned(reason: &str) -> String {
    format!("555 BANNED\n{reason}")
}

pub fn invalid_session() -> String {
    "506 INVALID SESSION".to_string()
}

pub fn server_busy() -> String {
    "602 SERVER BUSY".to_string()
}

/// 210 with the new MyList id
pub fn mylist_entry_added(lid: u64) -> String {
    format!("210 MYLIST ENTRY ADDED\n{lid}")
}

/// 310 with the existing entry; `viewdate` 0 means unwatched
pub fn file_already_in_mylist(lid: u64, state: u8, viewdate: i64) -> String {
    format!("310 FILE ALREADY IN MYLIST\n{lid}|1001|2002|3003|4004|1600000000|{state}|{viewdate}|shelf|web||1")
}

pub fn mylist_entry_deleted() -> String {
    "211 MYLIST ENTRY DELETED\n1".to_string()
}

pub fn no_such_mylist_entry() -> String {
    "411 NO SUCH MYLIST ENTRY".to_string()
}

pub fn no_such_file() -> String {
    "320 NO SUCH FILE".to_string()
}

/// 297 with `(aid, epoch, flags)` lines
pub fn calendar(entries: &[(u32, i64, u8)]) -> String {
    let mut text = "297 CALENDAR".to_string();
    for (aid, epoch, flags) in entries {
        text.push_str(&format!("\n{aid}|{epoch}|{flags}"));
    }
    text
}

pub fn calendar_empty() -> String {
    "397 CALENDAR EMPTY".to_string()
}
