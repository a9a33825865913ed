//! Process session identity.
//!
//! # Responsibility
//! - Identify one running process instance for the lifetime of the service.
//!
//! # Invariants
//! - A session token is fixed at service construction and never changes.
//! - Tokens are derived from process start time, so a restart always yields
//!   a different token.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Identity stamped into running records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One process lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: SessionToken,
    started_at_ms: i64,
}

impl Session {
    /// Begins a session that started at `started_at_ms` epoch milliseconds.
    pub fn begin(started_at_ms: i64) -> Self {
        Self {
            token: SessionToken::new(started_at_ms.to_string()),
            started_at_ms,
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn started_at_ms(&self) -> i64 {
        self.started_at_ms
    }

    /// Returns whether `token` was issued by this session.
    pub fn owns(&self, token: Option<&SessionToken>) -> bool {
        token == Some(&self.token)
    }
}
