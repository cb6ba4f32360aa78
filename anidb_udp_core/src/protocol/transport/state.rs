//! Connection state management
//!
//! Lifecycle of an AniDB session:
//! `Disconnected -> Connecting -> Authenticated -> (Sending <-> Authenticated) -> LoggingOut -> Disconnected`.

use crate::protocol::error::{ProtocolError, Result};
use std::fmt;

/// Session lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session
    Disconnected,
    /// AUTH in flight
    Connecting,
    /// Holding a valid session, idle
    Authenticated { session: String },
    /// A session command is in flight
    Sending { session: String },
    /// LOGOUT in flight
    LoggingOut,
}

impl ConnectionState {
    /// Check if the connection holds a session
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            ConnectionState::Authenticated { .. } | ConnectionState::Sending { .. }
        )
    }

    /// Get the session key if there is one
    pub fn session(&self) -> Option<&str> {
        match self {
            ConnectionState::Authenticated { session } | ConnectionState::Sending { session } => {
                Some(session)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Authenticated { .. } => write!(f, "Authenticated"),
            ConnectionState::Sending { .. } => write!(f, "Sending"),
            ConnectionState::LoggingOut => write!(f, "LoggingOut"),
        }
    }
}

/// State transition validator
pub struct StateTransition<'a> {
    from: &'a ConnectionState,
    to: &'a ConnectionState,
}

impl<'a> StateTransition<'a> {
    /// Create a new state transition
    pub fn new(from: &'a ConnectionState, to: &'a ConnectionState) -> Self {
        Self { from, to }
    }

    /// Check if the transition is allowed
    pub fn is_valid(&self) -> bool {
        use ConnectionState::*;

        match (self.from, self.to) {
            (Disconnected, Connecting) => true,

            // Login outcome
            (Connecting, Authenticated { .. }) => true,
            (Connecting, Disconnected) => true,

            (Authenticated { .. }, Sending { .. }) => true,
            (Authenticated { .. }, LoggingOut) => true,
            // Session expired while idle
            (Authenticated { .. }, Disconnected) => true,

            (Sending { .. }, Authenticated { .. }) => true,
            // Session invalidated or banned
            (Sending { .. }, Disconnected) => true,

            (LoggingOut, Disconnected) => true,

            _ => false,
        }
    }

    /// Refuse the transition with [`ProtocolError::InvalidState`] unless
    /// it is allowed
    pub fn check(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ProtocolError::InvalidState {
                from: self.from.to_string(),
                to: self.to.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticated() -> ConnectionState {
        ConnectionState::Authenticated {
            session: "abc123".to_string(),
        }
    }

    fn sending() -> ConnectionState {
        ConnectionState::Sending {
            session: "abc123".to_string(),
        }
    }

    #[test]
    fn test_state_capabilities() {
        let state = ConnectionState::Disconnected;
        assert!(!state.is_authenticated());
        assert_eq!(state.session(), None);

        let state = authenticated();
        assert!(state.is_authenticated());
        assert_eq!(state.session(), Some("abc123"));

        let state = sending();
        assert!(state.is_authenticated());
        assert_eq!(state.session(), Some("abc123"));

        assert_eq!(ConnectionState::LoggingOut.session(), None);
    }

    #[test]
    fn test_valid_transitions() {
        let valid_transitions = vec![
            (ConnectionState::Disconnected, ConnectionState::Connecting),
            (ConnectionState::Connecting, authenticated()),
            (ConnectionState::Connecting, ConnectionState::Disconnected),
            (authenticated(), sending()),
            (sending(), authenticated()),
            (sending(), ConnectionState::Disconnected),
            (authenticated(), ConnectionState::Disconnected),
            (authenticated(), ConnectionState::LoggingOut),
            (ConnectionState::LoggingOut, ConnectionState::Disconnected),
        ];

        for (from, to) in valid_transitions {
            let transition = StateTransition::new(&from, &to);
            assert!(
                transition.is_valid(),
                "Transition from {from:?} to {to:?} should be valid"
            );
            assert!(transition.check().is_ok());
        }
    }

    #[test]
    fn test_invalid_transitions() {
        let invalid_transitions = vec![
            (ConnectionState::Disconnected, authenticated()),
            (ConnectionState::Disconnected, sending()),
            (ConnectionState::Connecting, sending()),
            (authenticated(), ConnectionState::Connecting),
            (sending(), sending()),
            (sending(), ConnectionState::LoggingOut),
            (ConnectionState::LoggingOut, authenticated()),
            (ConnectionState::Disconnected, ConnectionState::LoggingOut),
        ];

        for (from, to) in invalid_transitions {
            let transition = StateTransition::new(&from, &to);
            assert!(
                !transition.is_valid(),
                "Transition from {from:?} to {to:?} should be invalid"
            );
            match transition.check() {
                Err(ProtocolError::InvalidState { from: f, to: t }) => {
                    assert_eq!(f, from.to_string());
                    assert_eq!(t, to.to_string());
                }
                other => panic!("Expected InvalidState, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "Disconnected");
        assert_eq!(ConnectionState::Connecting.to_string(), "Connecting");
        assert_eq!(authenticated().to_string(), "Authenticated");
        assert_eq!(sending().to_string(), "Sending");
        assert_eq!(ConnectionState::LoggingOut.to_string(), "LoggingOut");
    }

    #[test]
    fn test_session_not_leaked_in_display() {
        assert!(!authenticated().to_string().contains("abc123"));
    }
}
