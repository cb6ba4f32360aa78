//! AniDB UDP Client Core Library
//!
//! Client side of the AniDB UDP API: a rate limiter that keeps the client
//! within AniDB's flood limits, typed commands with return-code driven
//! parsers, and a connection handler that owns the session.
//!
//! ```no_run
//! use anidb_udp_core::config::ClientSettings;
//! use anidb_udp_core::protocol::ConnectionHandler;
//! use anidb_udp_core::protocol::messages::{AddFileRequest, MyListState};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = ClientSettings::load(None)?;
//! let handler = ConnectionHandler::connect(&settings).await?;
//! handler.login().await?;
//!
//! let request = AddFileRequest::new(734003200, "a1b2c3d4e5f60718293a4b5c6d7e8f90", MyListState::Internal);
//! if let Some(entry) = handler.send(&request).await?.into_payload() {
//!     println!("MyList id {}", entry.my_list_id);
//! }
//!
//! handler.logout().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod protocol;
pub mod security;

// Re-export main types
pub use config::{ClientSettings, ConfigError};
pub use protocol::{ConnectionHandler, ProtocolError, RateLimiter, Response, ReturnCode};
pub use security::SecureString;
