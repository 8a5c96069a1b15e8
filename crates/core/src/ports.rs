//! Port interfaces the infrastructure layer implements.

use async_trait::async_trait;
use etims_domain::types::{
    AuditRecord, AuditStatus, BranchRecord, CodeDetail, EtimsResponse, ImportedItem,
    InvoiceDocument, InvoiceKind, ItemClassification, Notice, PurchaseInvoiceDocument,
    RegisteredPurchase, RegisteredStockMovement, RequestHeaders, SequenceScope,
    StockMovementDocument,
};
use etims_domain::Result;

use crate::outcome::DocumentUpdate;

/// Trait for the outbound HTTP exchange with the tax authority.
///
/// Implementations return `Ok` for any well-formed provider response,
/// including business-level rejections; `Err` is reserved for transport
/// failures (timeout, connect, malformed body).
#[async_trait]
pub trait TaxGateway: Send + Sync {
    async fn exchange(
        &self,
        url: &str,
        headers: &RequestHeaders,
        body: &serde_json::Value,
    ) -> Result<EtimsResponse>;
}

/// Trait for the durable audit trail of outbound exchanges.
#[async_trait]
pub trait AuditTrail: Send + Sync {
    /// Persist a new pending record before the network call.
    async fn open(&self, record: &AuditRecord) -> Result<()>;

    /// Move a record to its terminal status. Called at most once per record.
    async fn finalize(
        &self,
        id: &str,
        status: AuditStatus,
        output: Option<&str>,
        error: Option<&str>,
    ) -> Result<()>;
}

/// Trait for per-scope device state: sales sequence, session key and the
/// per-operation "last request date" cursors.
#[async_trait]
pub trait EtimsState: Send + Sync {
    /// Highest sales sequence number the provider has accepted for a scope.
    /// Zero when no invoice was ever accepted.
    async fn most_recent_sales_sequence(&self, scope: &SequenceScope) -> Result<i64>;

    /// Record a provider-accepted sales sequence. Implementations must keep
    /// the stored value monotonic: a commit below the current value is a
    /// no-op.
    async fn commit_sales_sequence(&self, scope: &SequenceScope, sequence: i64) -> Result<()>;

    /// Communication key issued at device initialization, if any.
    async fn session_key(&self, scope: &SequenceScope) -> Result<Option<String>>;

    async fn store_session_key(&self, scope: &SequenceScope, key: &str) -> Result<()>;

    /// Cursor for a "fetch since" operation; the epoch sentinel when the
    /// operation never succeeded for this scope.
    async fn last_request_date(&self, scope: &SequenceScope, operation: &str) -> Result<String>;

    /// Advance a cursor to the `resultDt` of a successful exchange.
    /// Implementations must never move a cursor backwards.
    async fn advance_last_request_date(
        &self,
        scope: &SequenceScope,
        operation: &str,
        result_dt: &str,
    ) -> Result<()>;
}

/// Trait for resolving a logical operation to its URL path.
#[async_trait]
pub trait RouteTable: Send + Sync {
    /// Path for an operation (e.g. `TrnsSalesSaveWrReq` -> `/saveTrnsSalesOsdc`).
    async fn path_for(&self, operation: &str) -> Result<String>;
}

/// Trait for the staged host documents: outcome write-backs plus the
/// backlog queries the resend pass runs on.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Apply one write-back. Implementations must be idempotent: replaying
    /// an update already applied leaves the document unchanged.
    async fn apply(&self, update: &DocumentUpdate) -> Result<()>;

    /// Sales and POS invoices not yet accepted by the provider.
    async fn pending_invoices(&self) -> Result<Vec<(InvoiceKind, InvoiceDocument)>>;

    /// Purchase invoices not yet accepted.
    async fn pending_purchase_invoices(&self) -> Result<Vec<PurchaseInvoiceDocument>>;

    /// Stock movements not yet accepted.
    async fn pending_stock_movements(&self) -> Result<Vec<StockMovementDocument>>;
}

/// Trait for persisting downloaded reference code lists.
#[async_trait]
pub trait CodeListStore: Send + Sync {
    async fn store_code_details(&self, details: &[CodeDetail]) -> Result<()>;

    async fn store_item_classifications(&self, items: &[ItemClassification]) -> Result<()>;
}

/// Trait for persisting provider-side records pulled down by search
/// operations.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn store_purchases(&self, purchases: &[RegisteredPurchase]) -> Result<()>;

    async fn store_stock_movements(&self, movements: &[RegisteredStockMovement]) -> Result<()>;

    async fn store_notices(&self, notices: &[Notice]) -> Result<()>;

    async fn store_imported_items(&self, items: &[ImportedItem]) -> Result<()>;

    async fn store_branches(&self, branches: &[BranchRecord]) -> Result<()>;
}
