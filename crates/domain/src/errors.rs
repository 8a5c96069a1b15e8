//! Error types used throughout the connector

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the eTIMS bridge.
///
/// Provider-level rejections (`resultCd != "000"`) are deliberately *not*
/// represented here: they are an expected business outcome routed through the
/// error-handler side of the dispatch pipeline, never raised as an `Err`.
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum EtimsError {
    /// Missing or invalid setup: envelope fields, credentials, device state.
    /// Fatal, never retried automatically, never consumes a sequence number.
    #[error("Setup error: {0}")]
    Config(String),

    /// Connection refused/reset or timeout while talking to the remote
    /// endpoint. Neither outcome handler runs for these.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for connector operations
pub type Result<T> = std::result::Result<T, EtimsError>;
