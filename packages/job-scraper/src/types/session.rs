//! Persisted authenticated browsing state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque authenticated state captured from a browser context.
///
/// The contents belong to the driver that produced them (cookies, local
/// storage, tokens). The core only stores and hands them back; it never reads
/// or patches them. A re-login replaces the whole value.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session {
    state: serde_json::Value,
}

impl Session {
    pub fn new(state: serde_json::Value) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &serde_json::Value {
        &self.state
    }
}

// Session state carries auth cookies; never print it.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &"[REDACTED]")
            .finish()
    }
}
