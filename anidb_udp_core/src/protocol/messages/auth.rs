//! Session commands: AUTH, LOGOUT and PING

use crate::protocol::PROTOCOL_VERSION;
use crate::protocol::codes::ReturnCode;
use crate::protocol::error::{ProtocolError, Result};
use crate::protocol::messages::Request;
use crate::security::SecureString;

/// AUTH command for opening a session
#[derive(Clone)]
pub struct AuthRequest {
    pub user: String,
    pub pass: SecureString,
    pub client: String,
    pub clientver: u32,
    /// Ask the server to report our public address
    pub nat: bool,
    pub mtu: Option<u16>,
}

impl std::fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRequest")
            .field("user", &self.user)
            .field("pass", &"***")
            .field("client", &self.client)
            .field("clientver", &self.clientver)
            .field("nat", &self.nat)
            .field("mtu", &self.mtu)
            .finish()
    }
}

impl AuthRequest {
    /// Create a new AUTH request
    pub fn new(
        user: impl Into<String>,
        pass: impl Into<SecureString>,
        client: impl Into<String>,
        clientver: u32,
    ) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
            client: client.into(),
            clientver,
            nat: false,
            mtu: None,
        }
    }

    /// Enable NAT mode
    pub fn with_nat(mut self) -> Self {
        self.nat = true;
        self
    }

    /// Set MTU size
    pub fn with_mtu(mut self, mtu: u16) -> Self {
        self.mtu = Some(mtu);
        self
    }
}

/// Outcome of a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    /// Session key to attach to every later command
    pub session: String,
    /// Public `ip:port` as seen by the server, in NAT mode
    pub nat_address: Option<String>,
    /// Server reported 201: a newer client version exists
    pub new_version_available: bool,
}

impl Request for AuthRequest {
    type Payload = AuthResult;

    const COMMAND: &'static str = "AUTH";
    const ACCEPTED: &'static [ReturnCode] = &[
        ReturnCode::LoginAccepted,
        ReturnCode::LoginAcceptedNewVersion,
    ];
    const REQUIRES_SESSION: bool = false;
    const SENSITIVE: &'static [&'static str] = &["pass"];

    fn parameters(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("user", self.user.clone()),
            ("pass", self.pass.expose_secret().to_string()),
            ("protover", PROTOCOL_VERSION.to_string()),
            ("client", self.client.clone()),
            ("clientver", self.clientver.to_string()),
        ];
        if self.nat {
            params.push(("nat", "1".to_string()));
        }
        params.push(("enc", "utf8".to_string()));
        if let Some(mtu) = self.mtu {
            params.push(("mtu", mtu.to_string()));
        }
        params
    }

    fn parse(&self, code: ReturnCode, body: &str) -> Result<Option<AuthResult>> {
        // "{session} LOGIN ACCEPTED" or, in NAT mode, "{session} {ip}:{port} LOGIN ACCEPTED"
        let line = body.lines().next().unwrap_or("");
        let mut tokens = line.split_whitespace();

        let session = tokens
            .next()
            .filter(|token| *token != "LOGIN")
            .ok_or_else(|| ProtocolError::malformed(Self::COMMAND, code, "session", body))?;
        let nat_address = tokens
            .next()
            .filter(|token| token.contains(':'))
            .map(str::to_string);

        Ok(Some(AuthResult {
            session: session.to_string(),
            nat_address,
            new_version_available: code == ReturnCode::LoginAcceptedNewVersion,
        }))
    }
}

/// LOGOUT command
#[derive(Debug, Clone, Copy, Default)]
pub struct LogoutRequest;

impl Request for LogoutRequest {
    type Payload = ();

    const COMMAND: &'static str = "LOGOUT";
    const ACCEPTED: &'static [ReturnCode] = &[ReturnCode::LoggedOut, ReturnCode::NotLoggedIn];

    fn parameters(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn parse(&self, _code: ReturnCode, _body: &str) -> Result<Option<()>> {
        Ok(None)
    }
}

/// PING command, used as a keep-alive
#[derive(Debug, Clone, Copy, Default)]
pub struct PingRequest {
    /// Ask for the public port as seen by the server
    pub nat: bool,
}

impl PingRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nat(mut self) -> Self {
        self.nat = true;
        self
    }
}

impl Request for PingRequest {
    /// Public port, when requested with `nat=1`
    type Payload = u16;

    const COMMAND: &'static str = "PING";
    const ACCEPTED: &'static [ReturnCode] = &[ReturnCode::Pong];
    const REQUIRES_SESSION: bool = false;
    const FORCE_SHORT_DELAY: bool = true;

    fn parameters(&self) -> Vec<(&'static str, String)> {
        if self.nat {
            vec![("nat", "1".to_string())]
        } else {
            Vec::new()
        }
    }

    fn parse(&self, code: ReturnCode, body: &str) -> Result<Option<u16>> {
        if !self.nat {
            return Ok(None);
        }
        match body.lines().nth(1) {
            Some(port) => port
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ProtocolError::malformed(Self::COMMAND, code, "port", body)),
            None => Ok(None),
        }
    }
}
