//! Shared helpers for integration tests

#![allow(dead_code)]

use anidb_udp_core::protocol::messages::AuthRequest;
use anidb_udp_core::protocol::{ConnectionHandler, HandlerTimeouts, RateLimitConfig, RateLimiter};
use anidb_udp_test_utils::ScriptedTransport;
use std::time::Duration;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
pub const SESSION_TIMEOUT: Duration = Duration::from_secs(1800);

/// Route library logs to the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn auth_request() -> AuthRequest {
    AuthRequest::new("testuser", "testpass", "anidbudp", 1)
}

/// Handler with production rate limits over a scripted transport
pub fn scripted_handler(transport: &ScriptedTransport) -> ConnectionHandler<ScriptedTransport> {
    init_logging();
    ConnectionHandler::new(
        transport.clone(),
        RateLimiter::new(RateLimitConfig::default()),
        auth_request(),
        HandlerTimeouts {
            request: REQUEST_TIMEOUT,
            session: SESSION_TIMEOUT,
        },
    )
}
