//! Optional credential check for side-effecting commands.
//!
//! The gate never stores the configured credential itself, only its SHA-256
//! digest, and compares digests without early exit so the time taken does not
//! depend on how much of a supplied value is correct.

use std::fmt;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::SecurityConfig;

type CredentialDigest = [u8; 32];

/// Verifies the `verification` field of command payloads.
#[derive(Clone, Default)]
pub struct SecurityGate {
    expected: Option<CredentialDigest>,
}

impl SecurityGate {
    /// A gate that accepts everything.
    #[must_use]
    pub const fn open() -> Self { Self { expected: None } }

    /// A gate that requires `credential`.
    #[must_use]
    pub fn with_credential(credential: &str) -> Self {
        Self {
            expected: Some(digest(credential)),
        }
    }

    /// Builds the gate described by the security section of the config.
    #[must_use]
    pub fn from_config(config: &SecurityConfig) -> Self {
        config.credential.as_deref().map_or_else(Self::open, Self::with_credential)
    }

    /// Whether a credential is configured.
    #[must_use]
    pub const fn is_enforced(&self) -> bool { self.expected.is_some() }

    /// Checks a supplied verification value.
    ///
    /// Accepts either a bare string or an object with a `token` string. With no
    /// credential configured every value, including none, passes.
    #[must_use]
    pub fn verify(&self, supplied: Option<&Value>) -> bool {
        let Some(expected) = &self.expected else {
            return true;
        };

        let token = match supplied {
            Some(Value::String(token)) => token.as_str(),
            Some(Value::Object(fields)) => match fields.get("token") {
                Some(Value::String(token)) => token.as_str(),
                _ => return false,
            },
            _ => return false,
        };

        constant_time_eq(expected, &digest(token))
    }
}

impl fmt::Debug for SecurityGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityGate")
            .field("enforced", &self.is_enforced())
            .finish_non_exhaustive()
    }
}

fn digest(value: &str) -> CredentialDigest { Sha256::digest(value.as_bytes()).into() }

fn constant_time_eq(a: &CredentialDigest, b: &CredentialDigest) -> bool {
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
