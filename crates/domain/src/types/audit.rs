//! Audit trail record for outbound exchanges.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::EtimsError;

/// Terminal status of an audit record.
///
/// A record is created implicitly `Pending` and moved to exactly one of the
/// terminal states after the exchange resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuditStatus::Pending => "Pending",
            AuditStatus::Completed => "Completed",
            AuditStatus::Failed => "Failed",
        };
        f.write_str(label)
    }
}

impl FromStr for AuditStatus {
    type Err = EtimsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(AuditStatus::Pending),
            "Completed" => Ok(AuditStatus::Completed),
            "Failed" => Ok(AuditStatus::Failed),
            other => Err(EtimsError::InvalidInput(format!("unknown audit status {other:?}"))),
        }
    }
}

/// Reference back to the business document that triggered a call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DocumentRef {
    pub doctype: Option<String>,
    pub name: Option<String>,
}

impl DocumentRef {
    pub fn new(doctype: impl Into<String>, name: impl Into<String>) -> Self {
        Self { doctype: Some(doctype.into()), name: Some(name.into()) }
    }

    /// Reference for calls not tied to a single document (code refreshes,
    /// searches).
    pub fn none() -> Self {
        Self::default()
    }
}

/// Durable evidence of one outbound request and its outcome.
///
/// Lifecycle is create-then-finalize: persisted before the network call,
/// mutated to a terminal status exactly once after it resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: String,
    pub is_remote: bool,
    pub url: String,
    pub request_headers: String,
    pub request_body: String,
    pub status: AuditStatus,
    pub output: Option<String>,
    pub error: Option<String>,
    pub reference: DocumentRef,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    /// New pending record for an outbound exchange.
    pub fn outbound(
        url: impl Into<String>,
        request_headers: impl Into<String>,
        request_body: impl Into<String>,
        reference: DocumentRef,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            is_remote: true,
            url: url.into(),
            request_headers: request_headers.into(),
            request_body: request_body.into(),
            status: AuditStatus::Pending,
            output: None,
            error: None,
            reference,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [AuditStatus::Pending, AuditStatus::Completed, AuditStatus::Failed] {
            assert_eq!(status.to_string().parse::<AuditStatus>().unwrap(), status);
        }
        assert!("Bogus".parse::<AuditStatus>().is_err());
    }

    #[test]
    fn outbound_records_start_pending() {
        let record =
            AuditRecord::outbound("http://x/y", "{}", "{}", DocumentRef::new("Sales Invoice", "SI-1"));
        assert!(record.is_remote);
        assert_eq!(record.status, AuditStatus::Pending);
        assert!(record.output.is_none());
        assert!(record.error.is_none());
    }
}
