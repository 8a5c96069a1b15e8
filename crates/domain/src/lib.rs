//! # eTims Domain
//!
//! Business domain types and models for the eTIMS bridge.
//!
//! This crate contains:
//! - Wire payload schemas (exact provider field names via serde renames)
//! - Provider response envelope and typed response data
//! - Audit record, sequence/session scope, document snapshots
//! - Domain error types and Result definitions
//! - Shared numeric and date encoding helpers
//!
//! ## Architecture
//! - No dependencies on other workspace crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod encoding;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
