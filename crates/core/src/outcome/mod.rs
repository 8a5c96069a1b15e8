//! Outcome handling: what happens after the provider answers.
//!
//! Submission-style operations write results back onto the host document
//! that triggered them; search-style operations ingest the response data
//! into local stores. Either way the dispatcher invokes exactly one of the
//! two callbacks per completed exchange.

mod ingest;
mod receipt;

pub use ingest::{
    BranchListOutcome, CodeListOutcome, ImportedItemsOutcome, ItemClassificationsOutcome,
    NoticesOutcome, PurchasesOutcome, StockMovesOutcome,
};
pub use receipt::{verification_url, MarkSubmittedOutcome, SalesOutcome};

use async_trait::async_trait;
use etims_domain::types::EtimsResponse;
use etims_domain::Result;

/// Per-exchange outcome callbacks, driven by the dispatcher.
///
/// A handler must be idempotent on the success side: replaying the same
/// accepted response leaves documents and state unchanged.
#[async_trait]
pub trait OutcomeHandler: Send + Sync {
    async fn on_success(&self, response: &EtimsResponse) -> Result<()>;

    async fn on_failure(&self, response: &EtimsResponse) -> Result<()>;
}

/// The kinds of document-backed submissions the connector makes; carries
/// the doctype label used in audit references and write-backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    SalesInvoice,
    PosInvoice,
    PurchaseInvoice,
    StockMovement,
    ItemRegistration,
    ItemComposition,
    BranchCustomer,
    BranchUser,
}

impl TransactionKind {
    pub fn doctype(self) -> &'static str {
        match self {
            TransactionKind::SalesInvoice => "Sales Invoice",
            TransactionKind::PosInvoice => "POS Invoice",
            TransactionKind::PurchaseInvoice => "Purchase Invoice",
            TransactionKind::StockMovement => "Stock Ledger Entry",
            TransactionKind::ItemRegistration => "Item",
            TransactionKind::ItemComposition => "BOM",
            TransactionKind::BranchCustomer => "Customer",
            TransactionKind::BranchUser => "User",
        }
    }
}

/// Receipt fields written onto an accepted sales invoice.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReceiptFields {
    pub current_receipt_no: i64,
    pub total_receipt_no: i64,
    pub internal_data: String,
    pub receipt_signature: String,
    pub control_unit_datetime: String,
    /// Accepted submission sequence number (the payload's `invcNo`).
    pub sequence: i64,
    /// Public portal link encoding taxpayer, branch and signature.
    pub verification_url: String,
}

/// One write-back onto a host document, applied through
/// [`crate::ports::DocumentStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentUpdate {
    /// Flag a document as accepted by the provider.
    MarkSubmitted { doctype: &'static str, name: String },
    /// Attach receipt data to an accepted sales invoice (implies submitted).
    SalesReceipt { doctype: &'static str, name: String, receipt: ReceiptFields },
    /// Record a business-level rejection for operator follow-up.
    RecordRejection { doctype: &'static str, name: String, code: String, message: String },
}
