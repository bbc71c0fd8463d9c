//! Error types for mtgram-client.

use std::{fmt, io};

// ─── RpcError ─────────────────────────────────────────────────────────────────

/// An error returned by the server in response to an RPC call.
///
/// Numeric values are stripped from the name and placed in [`RpcError::value`].
///
/// # Example
/// `FLOOD_WAIT_30` → `RpcError { code: 420, name: "FLOOD_WAIT", value: Some(30) }`
#[derive(Clone, Debug, PartialEq)]
pub struct RpcError {
    /// HTTP-like status code.
    pub code: i32,
    /// Error name in SCREAMING_SNAKE_CASE with digits removed.
    pub name: String,
    /// Numeric suffix extracted from the name, if any.
    pub value: Option<u32>,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RPC {}: {}", self.code, self.name)?;
        if let Some(v) = self.value {
            write!(f, " (value: {v})")?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcError {}

impl RpcError {
    /// Parse a raw server error message like `"FLOOD_WAIT_30"`.
    pub fn from_server(code: i32, message: &str) -> Self {
        // Numeric suffix after the last underscore, e.g. "FLOOD_WAIT_30"
        // → name = "FLOOD_WAIT", value = Some(30).
        if let Some(idx) = message.rfind('_') {
            let suffix = &message[idx + 1..];
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(v) = suffix.parse::<u32>() {
                    let name = message[..idx].to_string();
                    return Self { code, name, value: Some(v) };
                }
            }
        }
        Self { code, name: message.to_string(), value: None }
    }

    /// Match on the error name, with optional wildcard prefix/suffix `'*'`.
    ///
    /// # Examples
    /// - `err.is("FLOOD_WAIT")` — exact match
    /// - `err.is("PHONE_*")` — starts-with match
    /// - `err.is("*_MIGRATE")` — ends-with match
    pub fn is(&self, pattern: &str) -> bool {
        if let Some(prefix) = pattern.strip_suffix('*') {
            self.name.starts_with(prefix)
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            self.name.ends_with(suffix)
        } else {
            self.name == pattern
        }
    }

    /// The target DC, if this error moves the account's home DC
    /// (`PHONE_MIGRATE_X`, `NETWORK_MIGRATE_X`, `USER_MIGRATE_X`).
    ///
    /// `FILE_MIGRATE_X` (the file lives on a media DC) and `STATS_MIGRATE_X`
    /// point at auxiliary DCs and are left for the caller to handle.
    pub fn migrate_dc(&self) -> Option<i32> {
        if self.is("*_MIGRATE") && !self.is("FILE_MIGRATE") && !self.is("STATS_MIGRATE") {
            self.value.map(|v| v as i32)
        } else {
            None
        }
    }

    /// The flood-wait duration in seconds, if this is a FLOOD_WAIT error.
    pub fn flood_wait_seconds(&self) -> Option<u64> {
        if self.code == 420 && self.name == "FLOOD_WAIT" {
            self.value.map(|v| v as u64)
        } else {
            None
        }
    }
}

// ─── InvocationError ──────────────────────────────────────────────────────────

/// The error type returned from any method that talks to the server.
#[derive(Debug)]
pub enum InvocationError {
    /// The server rejected the request.
    Rpc(RpcError),
    /// Network / I/O failure.
    Io(io::Error),
    /// Response deserialization failed.
    Deserialize(String),
    /// The request was dropped before a reply arrived (the session shut
    /// down mid-call).
    Dropped,
    /// The resend budget ran out; the transport never produced a reply.
    Transport,
    /// The connection was closed while the call was in flight.
    ConnectionClosed,
    /// DC migration required — handled by [`crate::Telegram`], surfaced only
    /// from a bare [`crate::DataCenter`].
    Migrate(i32),
    /// The auth-key handshake failed.
    Handshake(mtgram_mtproto::handshake::Error),
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rpc(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Deserialize(s) => write!(f, "deserialize error: {s}"),
            Self::Dropped => write!(f, "request dropped"),
            Self::Transport => write!(f, "transport failed after retries"),
            Self::ConnectionClosed => write!(f, "connection closed"),
            Self::Migrate(dc) => write!(f, "DC migration to {dc}"),
            Self::Handshake(e) => write!(f, "handshake: {e}"),
        }
    }
}

impl std::error::Error for InvocationError {}

impl From<io::Error> for InvocationError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<mtgram_tl::deserialize::Error> for InvocationError {
    fn from(e: mtgram_tl::deserialize::Error) -> Self {
        Self::Deserialize(e.to_string())
    }
}

impl From<mtgram_mtproto::handshake::Error> for InvocationError {
    fn from(e: mtgram_mtproto::handshake::Error) -> Self {
        Self::Handshake(e)
    }
}

impl InvocationError {
    /// `true` if this is the named RPC error (supports `'*'` wildcards).
    pub fn is(&self, pattern: &str) -> bool {
        match self {
            Self::Rpc(e) => e.is(pattern),
            _ => false,
        }
    }

    /// If this is a FLOOD_WAIT error, how many seconds to wait.
    pub fn flood_wait_seconds(&self) -> Option<u64> {
        match self {
            Self::Rpc(e) => e.flood_wait_seconds(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_suffix() {
        let e = RpcError::from_server(420, "FLOOD_WAIT_30");
        assert_eq!(e.name, "FLOOD_WAIT");
        assert_eq!(e.value, Some(30));
        assert_eq!(e.flood_wait_seconds(), Some(30));
    }

    #[test]
    fn keeps_plain_names() {
        let e = RpcError::from_server(401, "AUTH_KEY_UNREGISTERED");
        assert_eq!(e.name, "AUTH_KEY_UNREGISTERED");
        assert_eq!(e.value, None);
    }

    #[test]
    fn migrate_errors_carry_target_dc() {
        let e = RpcError::from_server(303, "PHONE_MIGRATE_4");
        assert_eq!(e.migrate_dc(), Some(4));
        let e = RpcError::from_server(303, "USER_MIGRATE_2");
        assert_eq!(e.migrate_dc(), Some(2));
        let e = RpcError::from_server(420, "FLOOD_WAIT_4");
        assert_eq!(e.migrate_dc(), None);
    }

    #[test]
    fn auxiliary_dc_errors_do_not_move_home() {
        let e = RpcError::from_server(303, "FILE_MIGRATE_5");
        assert_eq!(e.migrate_dc(), None);
        let e = RpcError::from_server(303, "STATS_MIGRATE_3");
        assert_eq!(e.migrate_dc(), None);
    }

    #[test]
    fn wildcard_matching() {
        let e = RpcError::from_server(303, "NETWORK_MIGRATE_1");
        assert!(e.is("*_MIGRATE"));
        assert!(e.is("NETWORK_*"));
        assert!(!e.is("MIGRATE"));
    }
}
