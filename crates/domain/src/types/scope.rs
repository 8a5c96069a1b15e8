//! Sequence/session scope identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Environment;

/// Key for sequence and session state: one remote device per
/// taxpayer + branch + environment.
///
/// Sales submissions sharing a scope must be serialized; unrelated scopes
/// may run fully in parallel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceScope {
    pub tin: String,
    pub branch_id: String,
    pub environment: Environment,
}

impl SequenceScope {
    pub fn new(tin: impl Into<String>, branch_id: impl Into<String>, environment: Environment) -> Self {
        Self { tin: tin.into(), branch_id: branch_id.into(), environment }
    }
}

impl fmt::Display for SequenceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.tin, self.branch_id, self.environment.as_str())
    }
}

/// Request headers carried on every provider call.
///
/// Device verification is the one exchange made without a session key, before
/// the device holds one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RequestHeaders {
    pub tin: String,
    pub branch_id: String,
    /// Rotating communication key issued at device initialization.
    pub session_key: Option<String>,
}

impl RequestHeaders {
    pub fn new(tin: impl Into<String>, branch_id: impl Into<String>, session_key: impl Into<String>) -> Self {
        Self { tin: tin.into(), branch_id: branch_id.into(), session_key: Some(session_key.into()) }
    }

    /// Headers for the device-verification handshake, which precedes any key.
    pub fn unauthenticated(tin: impl Into<String>, branch_id: impl Into<String>) -> Self {
        Self { tin: tin.into(), branch_id: branch_id.into(), session_key: None }
    }
}
