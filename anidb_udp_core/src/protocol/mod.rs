//! AniDB UDP Protocol Implementation
//!
//! - `rate_limiter`: two-tier throttle every outbound packet passes through
//! - `codes`: return code taxonomy
//! - `messages`: typed requests, reply splitting and per-command parsers
//! - `connection`: session state machine driving the transport
//! - `transport`: UDP socket seam and connection states
//! - `codec`: datagram encoding/decoding

pub mod codec;
pub mod codes;
pub mod connection;
pub mod error;
pub mod messages;
pub mod rate_limiter;
pub mod transport;

// Re-export main types
pub use codes::{CodeCategory, ReturnCode};
pub use connection::{ConnectionHandler, HandlerTimeouts};
pub use error::{ErrorKind, ProtocolError, Result};
pub use messages::{RawResponse, Request, Response};
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use transport::{ConnectionState, Transport, UdpTransport};

/// Protocol version supported by this implementation
pub const PROTOCOL_VERSION: &str = "3";

/// Maximum UDP packet size (considering PPPoE)
pub const MAX_PACKET_SIZE: usize = 1400;

/// Default AniDB server address
pub const DEFAULT_SERVER: &str = "api.anidb.net";

/// Default AniDB UDP port
pub const DEFAULT_PORT: u16 = 9000;

/// Session timeout in seconds (30 minutes)
pub const SESSION_TIMEOUT_SECS: u64 = 1800;
