//! Password holder with memory zeroing
//!
//! [`SecureString`] keeps the AniDB password out of logs and wipes it when
//! dropped. It deserializes from plain strings so it can sit directly in
//! settings, but never serializes back.

use serde::{Deserialize, Deserializer};
use std::fmt;
use zeroize::Zeroize;

/// A string that zeros its memory when dropped
///
/// `Debug` and `Display` are masked.
#[derive(Clone, Default)]
pub struct SecureString {
    inner: String,
}

impl SecureString {
    /// Wrap a secret
    pub fn new(s: impl Into<String>) -> Self {
        Self { inner: s.into() }
    }

    /// Borrow the secret for rendering onto the wire
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    /// True when no secret is held
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Drop for SecureString {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureString(***)")
    }
}

impl fmt::Display for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***")
    }
}

impl From<String> for SecureString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecureString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for SecureString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_string_debug() {
        let secure = SecureString::new("secret password");
        let debug_str = format!("{secure:?}");
        assert_eq!(debug_str, "SecureString(***)");
        assert!(!debug_str.contains("secret"));
    }

    #[test]
    fn test_secure_string_display() {
        let secure = SecureString::new("secret password");
        assert_eq!(format!("{secure}"), "***");
    }

    #[test]
    fn test_zeroized_on_drop_leaves_clone_intact() {
        let original = SecureString::from("hunter2".to_string());
        let copy = original.clone();
        drop(original);
        assert_eq!(copy.expose_secret(), "hunter2");
    }

    #[test]
    fn test_expose_secret() {
        let secure = SecureString::new("sensitive data");
        assert_eq!(secure.expose_secret(), "sensitive data");
        assert!(!secure.is_empty());
        assert!(SecureString::default().is_empty());
    }
}
