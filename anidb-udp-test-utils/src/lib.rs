//! Test utilities for the AniDB UDP client
//!
//! This crate provides a scripted in-memory transport, a loopback mock
//! server and reply builders for testing the connection handler.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::responses;
pub use mocks::{MockUdpServer, Reply, ScriptedTransport, SentCommand};
