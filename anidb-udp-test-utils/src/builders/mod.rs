//! Builders for canned AniDB replies

pub mod responses;
