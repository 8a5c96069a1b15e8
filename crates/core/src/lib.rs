//! # eTIMS Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Payload builders (host document snapshot -> typed wire payload)
//! - The dispatch pipeline (envelope, exchange, outcome handling, audit)
//! - Port/adapter interfaces (traits)
//! - The submission service tying the above together
//!
//! ## Architecture Principles
//! - Only depends on `etims-domain`
//! - No database or HTTP code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod dispatch;
pub mod outcome;
pub mod payload;
pub mod ports;
pub mod submission;

// Re-export specific items to avoid ambiguity
pub use dispatch::{DispatchOutcome, Dispatcher, EnvelopeBuilder, SubmissionEnvelope};
pub use outcome::{DocumentUpdate, OutcomeHandler, ReceiptFields, TransactionKind};
pub use payload::{
    build_branch_customer, build_branch_user, build_item_composition, build_item_registration,
    build_purchase_invoice, build_sales_invoice, build_stock_movement, movement_type_code,
};
pub use ports::{
    AuditTrail, CodeListStore, DocumentStore, EtimsState, RegistryStore, RouteTable, TaxGateway,
};
pub use submission::{ResendReport, SubmissionService, SubmissionStatus};
