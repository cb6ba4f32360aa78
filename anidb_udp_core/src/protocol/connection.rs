//! Session-owning connection handler
//!
//! The handler owns the transport, the rate limiter and the session. Every
//! datagram goes out through [`RateLimiter::gate`], so the limiter's lock
//! also serializes access to the socket and to session state changes made
//! while a request is in flight.

use crate::config::ClientSettings;
use crate::protocol::codec::{decode_datagram, encode_command};
use crate::protocol::codes::{CodeCategory, ReturnCode};
use crate::protocol::error::{ProtocolError, Result};
use crate::protocol::messages::{
    AuthRequest, AuthResult, LogoutRequest, PingRequest, RawResponse, Request, Response,
    dispatch, render, render_masked,
};
use crate::protocol::rate_limiter::RateLimiter;
use crate::protocol::transport::{ConnectionState, StateTransition, Transport, UdpTransport};
use log::{debug, info, trace, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, timeout};

/// Replies never exceed the protocol MTU; leave room for the tag
const RECV_BUFFER_SIZE: usize = 2048;

#[derive(Debug)]
struct Session {
    state: ConnectionState,
    last_activity: Option<Instant>,
}

/// Where the session key for a request comes from
#[derive(Clone, Copy)]
enum SessionSource<'a> {
    /// Sent without a session
    None,
    /// Sent with a key the caller already holds (LOGOUT)
    Fixed(&'a str),
    /// Take the live session and mark it busy while the request is in flight
    Active,
}

/// Restores `Authenticated` when a request leaves `Sending`, unless the
/// session was torn down meanwhile. Runs on cancellation too.
struct InFlight<'a> {
    session: &'a Mutex<Session>,
    key: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut session = lock(self.session);
        if matches!(session.state, ConnectionState::Sending { .. }) {
            trace!("State transition: Sending -> Authenticated");
            session.state = ConnectionState::Authenticated {
                session: self.key.clone(),
            };
        }
    }
}

/// Falls back to `Disconnected` when a login or logout is abandoned before
/// it settles, e.g. on cancellation.
struct Settling<'a> {
    session: &'a Mutex<Session>,
}

impl Drop for Settling<'_> {
    fn drop(&mut self) {
        let mut session = lock(self.session);
        if matches!(
            session.state,
            ConnectionState::Connecting | ConnectionState::LoggingOut
        ) {
            trace!("State transition: {} -> Disconnected", session.state);
            session.state = ConnectionState::Disconnected;
            session.last_activity = None;
        }
    }
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Connection timing knobs
#[derive(Debug, Clone, Copy)]
pub struct HandlerTimeouts {
    /// Wait for a matching reply this long
    pub request: Duration,
    /// Consider the session gone after this much idle time
    pub session: Duration,
}

/// AniDB UDP session handler
pub struct ConnectionHandler<T = UdpTransport> {
    transport: T,
    limiter: RateLimiter,
    auth: AuthRequest,
    timeouts: HandlerTimeouts,
    session: Mutex<Session>,
    next_tag: AtomicU64,
}

impl ConnectionHandler<UdpTransport> {
    /// Validate settings, bind a UDP transport and build a handler
    ///
    /// Settings below the protocol's rate floor are refused before any socket
    /// is opened. [`ConnectionHandler::new`] takes the parts unchecked.
    pub async fn connect(settings: &ClientSettings) -> Result<Self> {
        settings.validate()?;
        let transport = UdpTransport::bind(&settings.network).await?;
        Ok(Self::new(
            transport,
            RateLimiter::new(settings.rate_limit.to_config()),
            settings.auth_request(),
            HandlerTimeouts {
                request: settings.network.request_timeout(),
                session: settings.network.session_timeout(),
            },
        ))
    }
}

impl<T: Transport> ConnectionHandler<T> {
    /// Create a handler around a transport and a rate limiter
    pub fn new(
        transport: T,
        limiter: RateLimiter,
        auth: AuthRequest,
        timeouts: HandlerTimeouts,
    ) -> Self {
        Self {
            transport,
            limiter,
            auth,
            timeouts,
            session: Mutex::new(Session {
                state: ConnectionState::Disconnected,
                last_activity: None,
            }),
            next_tag: AtomicU64::new(1),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        lock(&self.session).state.clone()
    }

    /// Session key, while authenticated
    pub fn session_id(&self) -> Option<String> {
        lock(&self.session).state.session().map(str::to_string)
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.session).state.is_authenticated()
    }

    /// The limiter gating this endpoint
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Open a session
    ///
    /// Only valid from `Disconnected`. The state change happens under the
    /// rate limiter, so a login queues behind requests already in flight. On
    /// any failure the handler is back in `Disconnected`; a rejected login
    /// surfaces as [`ProtocolError::AuthenticationFailed`], a ban as
    /// [`ProtocolError::SessionInvalidated`].
    pub async fn login(&self) -> Result<AuthResult> {
        self.limiter.gate(|| self.open_session(), false).await
    }

    /// Send a command and parse its reply
    ///
    /// Session commands need an authenticated session and hold the handler
    /// in `Sending` while in flight. A failed request leaves the session
    /// intact unless the server declared it invalid or banned the client.
    pub async fn send<R: Request>(&self, request: &R) -> Result<Response<R::Payload>> {
        let source = if R::REQUIRES_SESSION {
            self.check_session()?;
            SessionSource::Active
        } else {
            SessionSource::None
        };
        self.exchange(request, source).await
    }

    /// Close the session. Queues behind requests in flight; once the
    /// LOGOUT goes out the handler ends up `Disconnected` whatever the server
    /// answers.
    pub async fn logout(&self) -> Result<()> {
        self.limiter.gate(|| self.close_session(), false).await
    }

    /// Keep-alive. Works in any state.
    pub async fn ping(&self) -> Result<Option<u16>> {
        let request = if self.auth.nat {
            PingRequest::new().with_nat()
        } else {
            PingRequest::new()
        };
        Ok(self.send(&request).await?.into_payload())
    }

    async fn open_session(&self) -> Result<AuthResult> {
        self.transition(ConnectionState::Connecting)?;
        let _settling = Settling {
            session: &self.session,
        };
        info!("Logging in to AniDB as {}", self.auth.user);

        let outcome = self
            .transact(&self.auth, SessionSource::None)
            .await
            .and_then(|raw| dispatch(&self.auth, &raw))
            .and_then(|response| {
                response.payload.ok_or_else(|| {
                    ProtocolError::malformed(AuthRequest::COMMAND, response.code, "session", "")
                })
            });

        match outcome {
            Ok(result) => {
                if result.new_version_available {
                    warn!("AniDB reports a newer version of client {}", self.auth.client);
                }
                if let Some(address) = &result.nat_address {
                    debug!("Public address reported by AniDB: {address}");
                }
                self.transition(ConnectionState::Authenticated {
                    session: result.session.clone(),
                })?;
                lock(&self.session).last_activity = Some(Instant::now());
                info!("Logged in to AniDB");
                Ok(result)
            }
            Err(err) => {
                self.set_disconnected();
                let err = match err {
                    ProtocolError::UnexpectedResponse { code, body, .. }
                        if code.category() == CodeCategory::Fatal =>
                    {
                        let message = body.lines().next().unwrap_or_default().to_string();
                        ProtocolError::authentication_failed(code, message)
                    }
                    other => other,
                };
                warn!("Login failed: {err}");
                Err(err)
            }
        }
    }

    async fn close_session(&self) -> Result<()> {
        let key = self.session_id().ok_or(ProtocolError::NotAuthenticated)?;
        self.transition(ConnectionState::LoggingOut)?;
        let _settling = Settling {
            session: &self.session,
        };

        let result = self
            .transact(&LogoutRequest, SessionSource::Fixed(&key))
            .await
            .and_then(|raw| dispatch(&LogoutRequest, &raw));
        self.set_disconnected();

        match result {
            Ok(_) => {
                info!("Logged out of AniDB");
                Ok(())
            }
            // Already gone on the server side
            Err(err @ ProtocolError::SessionInvalidated { .. }) if !err.is_ban() => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn exchange<R: Request>(
        &self,
        request: &R,
        source: SessionSource<'_>,
    ) -> Result<Response<R::Payload>> {
        let raw = self
            .limiter
            .gate(|| self.transact(request, source), R::FORCE_SHORT_DELAY)
            .await?;
        dispatch(request, &raw)
    }

    /// One round trip, run while holding the rate limiter
    async fn transact<R: Request>(
        &self,
        request: &R,
        source: SessionSource<'_>,
    ) -> Result<RawResponse> {
        let in_flight = match source {
            SessionSource::Active => Some(self.begin_sending()?),
            _ => None,
        };
        let key = match source {
            SessionSource::None => None,
            SessionSource::Fixed(key) => Some(key),
            SessionSource::Active => in_flight.as_ref().map(|f| f.key.as_str()),
        };

        let tag = format!("t{}", self.next_tag.fetch_add(1, Ordering::Relaxed));
        let command = render(request, key, Some(&tag));
        debug!(
            "AniDB request: {}",
            render_masked(request, key.map(|_| "***"), Some(&tag))
        );
        let packet = encode_command(&command)?;

        let raw = timeout(self.timeouts.request, self.round_trip(&packet, &tag))
            .await
            .map_err(|_| {
                warn!(
                    "No reply to {} after {:?}",
                    R::COMMAND,
                    self.timeouts.request
                );
                ProtocolError::Timeout(self.timeouts.request)
            })??;

        trace!("AniDB response: {} {}", raw.code, raw.body);
        self.screen::<R>(&raw)?;
        Ok(raw)
    }

    /// Send and wait for the reply carrying our tag
    async fn round_trip(&self, packet: &[u8], tag: &str) -> Result<RawResponse> {
        self.transport.send(packet).await?;

        let mut buffer = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            let len = self.transport.recv(&mut buffer).await?;
            let raw = RawResponse::parse(&decode_datagram(&buffer[..len])?)?;
            lock(&self.session).last_activity = Some(Instant::now());

            match raw.tag.as_deref() {
                // Untagged replies can only answer the request in flight
                None => return Ok(raw),
                Some(reply_tag) if reply_tag == tag => return Ok(raw),
                Some(reply_tag) => {
                    warn!("Discarding stale AniDB reply tagged {reply_tag} (waiting for {tag})");
                }
            }
        }
    }

    /// Intercept codes that concern the session rather than the command
    fn screen<R: Request>(&self, raw: &RawResponse) -> Result<()> {
        if R::ACCEPTED.contains(&raw.code) {
            return Ok(());
        }

        match raw.code.category() {
            CodeCategory::SessionInvalid | CodeCategory::Banned => {
                warn!("AniDB session lost on {}: {}", R::COMMAND, raw.code);
                self.drop_session();
                Err(ProtocolError::session_invalidated(
                    raw.code,
                    raw.message().to_string(),
                ))
            }
            CodeCategory::Retryable => {
                warn!("AniDB busy on {}: {}", R::COMMAND, raw.code);
                Err(ProtocolError::ServerBusy { code: raw.code })
            }
            _ => Ok(()),
        }
    }

    /// Fail fast when there is no usable session
    fn check_session(&self) -> Result<()> {
        let mut session = lock(&self.session);
        if !session.state.is_authenticated() {
            return Err(ProtocolError::NotAuthenticated);
        }

        let idle = session
            .last_activity
            .map(|last| Instant::now().saturating_duration_since(last))
            .unwrap_or_default();
        if idle > self.timeouts.session {
            warn!("AniDB session idle for {idle:?}, treating it as expired");
            session.state = ConnectionState::Disconnected;
            session.last_activity = None;
            return Err(ProtocolError::session_invalidated(
                ReturnCode::LoginFirst,
                format!("session expired after {idle:?} idle"),
            ));
        }
        Ok(())
    }

    fn begin_sending(&self) -> Result<InFlight<'_>> {
        self.check_session()?;

        let mut guard = lock(&self.session);
        let key = match &guard.state {
            ConnectionState::Authenticated { session } => session.clone(),
            _ => return Err(ProtocolError::NotAuthenticated),
        };
        let to = ConnectionState::Sending {
            session: key.clone(),
        };
        validate(&guard.state, &to)?;
        trace!("State transition: {} -> {to}", guard.state);
        guard.state = to;

        Ok(InFlight {
            session: &self.session,
            key,
        })
    }

    fn transition(&self, to: ConnectionState) -> Result<()> {
        let mut session = lock(&self.session);
        validate(&session.state, &to)?;
        debug!("State transition: {} -> {to}", session.state);
        session.state = to;
        Ok(())
    }

    /// Server invalidated the session
    fn drop_session(&self) {
        let mut session = lock(&self.session);
        if session.state.is_authenticated() {
            debug!("State transition: {} -> Disconnected", session.state);
            session.state = ConnectionState::Disconnected;
            session.last_activity = None;
        }
    }

    fn set_disconnected(&self) {
        let mut session = lock(&self.session);
        if session.state != ConnectionState::Disconnected {
            debug!("State transition: {} -> Disconnected", session.state);
        }
        session.state = ConnectionState::Disconnected;
        session.last_activity = None;
    }
}

fn validate(from: &ConnectionState, to: &ConnectionState) -> Result<()> {
    StateTransition::new(from, to).check()
}
