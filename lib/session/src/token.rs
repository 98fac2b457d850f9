//! Session token generation.
//!
//! A session token is the secret handed to the browser. It carries 160 bits
//! from the operating system CSPRNG and is encoded as lower-case base32
//! without padding, which keeps it URL and cookie safe. Only the SHA-256
//! digest of the token (see [`SessionId::from_token`](crate::SessionId::from_token))
//! ever reaches storage.

use rand::RngCore;
use rootcause::prelude::Report;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::SessionError;

/// Number of random bytes in a session token.
pub const SESSION_TOKEN_BYTES: usize = 20;

/// Length of an encoded session token.
pub const SESSION_TOKEN_LEN: usize = 32;

const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// The raw secret a client presents to prove it owns a session.
///
/// `Debug` is redacted so tokens do not end up in logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wraps a token received from a client.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self(token)
    }

    /// Parses a token received from a client, rejecting anything that could
    /// not have come from [`generate_session_token`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidToken`] on a wrong length or alphabet.
    pub fn parse(token: &str) -> Result<Self, Report<SessionError>> {
        if token.len() != SESSION_TOKEN_LEN {
            return Err(SessionError::InvalidToken {
                reason: format!("expected {SESSION_TOKEN_LEN} characters, got {}", token.len()),
            }
            .into());
        }
        if !token.bytes().all(|b| BASE32_ALPHABET.contains(&b)) {
            return Err(SessionError::InvalidToken {
                reason: "not lower-case base32".to_string(),
            }
            .into());
        }
        Ok(Self(token.to_string()))
    }

    /// Returns the token as presented to the client.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the lower-case hex SHA-256 digest of the token.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

impl From<String> for SessionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Generates a fresh session token.
#[must_use]
pub fn generate_session_token() -> SessionToken {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    SessionToken(encode_base32_lower_no_padding(&bytes))
}

/// Base32 (RFC 4648 alphabet, lower case) without `=` padding.
pub(crate) fn encode_base32_lower_no_padding(data: &[u8]) -> String {
    let mut result = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer = 0u32;
    let mut bits_in_buffer = 0u8;

    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits_in_buffer += 8;

        while bits_in_buffer >= 5 {
            bits_in_buffer -= 5;
            let index = ((buffer >> bits_in_buffer) & 0x1F) as usize;
            result.push(BASE32_ALPHABET[index] as char);
        }
        buffer &= (1 << bits_in_buffer) - 1;
    }

    if bits_in_buffer > 0 {
        let index = ((buffer << (5 - bits_in_buffer)) & 0x1F) as usize;
        result.push(BASE32_ALPHABET[index] as char);
    }

    result
}
