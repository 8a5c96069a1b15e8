//! Snapshots of host ERP documents.
//!
//! The connector never owns these records; the host hands over an immutable
//! snapshot carrying exactly the fields payload construction needs, plus the
//! small set of result flags the outcome handlers write back.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Itemised tax breakup over the provider's five taxation buckets (A-E).
///
/// Computed by the host's tax engine; the connector only quantizes and
/// forwards it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct TaxBreakup {
    pub taxable: [f64; 5],
    pub tax: [f64; 5],
}

/// Taxation bucket index, provider codes "A" through "E".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxBucket {
    A,
    B,
    C,
    D,
    E,
}

impl TaxBucket {
    pub const ALL: [TaxBucket; 5] = [TaxBucket::A, TaxBucket::B, TaxBucket::C, TaxBucket::D, TaxBucket::E];

    pub fn index(self) -> usize {
        match self {
            TaxBucket::A => 0,
            TaxBucket::B => 1,
            TaxBucket::C => 2,
            TaxBucket::D => 3,
            TaxBucket::E => 4,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            TaxBucket::A => "A",
            TaxBucket::B => "B",
            TaxBucket::C => "C",
            TaxBucket::D => "D",
            TaxBucket::E => "E",
        }
    }

    /// Statutory VAT rate for a bucket, emitted only when the bucket carries
    /// a non-zero amount (B = 16%, E = 8%, the rest zero-rated or exempt).
    pub fn statutory_rate(self) -> f64 {
        match self {
            TaxBucket::B => 16.0,
            TaxBucket::E => 8.0,
            _ => 0.0,
        }
    }
}

impl TaxBreakup {
    pub fn taxable_for(&self, bucket: TaxBucket) -> f64 {
        self.taxable[bucket.index()]
    }

    pub fn tax_for(&self, bucket: TaxBucket) -> f64 {
        self.tax[bucket.index()]
    }
}

/// Resolved eTIMS codes every submittable line item must carry.
///
/// These come from the host's item master (classification, packaging,
/// quantity-unit and taxation-type templates); a line missing any of them
/// fails the whole payload build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LineItemCodes {
    pub classification: Option<String>,
    pub packaging_unit: Option<String>,
    pub quantity_unit: Option<String>,
    pub taxation_type: Option<String>,
}

/// One invoice line as snapshotted from the host document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    /// 1-based position in the document.
    pub idx: i64,
    pub item_name: String,
    pub etims_item_code: Option<String>,
    pub qty: f64,
    pub rate: f64,
    pub amount: f64,
    pub discount_rate: f64,
    pub discount_amount: f64,
    pub taxable_amount: f64,
    pub tax_amount: f64,
    pub codes: LineItemCodes,
}

/// Which sales document family an invoice snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceKind {
    Sales,
    Pos,
}

impl InvoiceKind {
    pub fn doctype(self) -> &'static str {
        match self {
            InvoiceKind::Sales => "Sales Invoice",
            InvoiceKind::Pos => "POS Invoice",
        }
    }
}

/// Snapshot of a sales or POS invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDocument {
    pub name: String,
    pub company: String,
    pub branch_id: String,
    pub customer_name: String,
    pub customer_tin: Option<String>,
    pub posting_date: NaiveDate,
    pub posting_time: NaiveTime,
    pub is_return: bool,
    pub payment_type_code: String,
    pub net_total: f64,
    pub total_tax: f64,
    pub grand_total: f64,
    pub tax_breakup: TaxBreakup,
    pub items: Vec<InvoiceLine>,
    pub owner: String,
    pub modified_by: String,
    /// Host modification timestamp, part of the in-flight dedup key.
    pub modified: String,
    /// Terminal submission flag; set at most once.
    pub submitted: bool,
}

/// Snapshot of a purchase invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseInvoiceDocument {
    pub name: String,
    pub company: String,
    pub branch_id: String,
    /// Numeric series extracted from the document name (e.g. PINV-0042 -> 42).
    pub series_no: i64,
    pub supplier_name: String,
    pub supplier_tin: Option<String>,
    pub supplier_branch_id: Option<String>,
    pub supplier_invoice_no: Option<String>,
    pub purchase_type_code: String,
    pub receipt_type_code: String,
    pub payment_type_code: String,
    pub purchase_status_code: String,
    pub posting_date: NaiveDate,
    pub is_return: bool,
    pub update_stock: bool,
    pub net_total: f64,
    pub total_tax: f64,
    pub grand_total: f64,
    pub tax_breakup: TaxBreakup,
    pub items: Vec<InvoiceLine>,
    pub owner: String,
    pub modified_by: String,
    pub modified: String,
    pub submitted: bool,
}

/// Stock reconciliation purpose, as declared on the host voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconPurpose {
    OpeningStock,
    Other,
}

/// Stock entry sub-type on the host voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEntryType {
    MaterialReceipt,
    MaterialTransfer,
    Manufacture,
    MaterialIssue,
    SendToSubcontractor,
    Repack,
}

/// The voucher family and sub-condition behind a stock ledger entry; the
/// movement-type decision table keys off this.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StockVoucher {
    Reconciliation { purpose: ReconPurpose, quantity_difference: f64 },
    Entry { entry_type: StockEntryType, actual_qty: f64 },
    Purchase { is_return: bool, imported: bool },
    SalesDelivery { is_return: bool, actual_qty: f64 },
}

/// One stock movement line as snapshotted from the host voucher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLine {
    pub idx: i64,
    pub item_name: String,
    pub qty: f64,
    pub rate: f64,
    pub taxable_amount: f64,
    pub tax_amount: f64,
    pub codes: LineItemCodes,
}

/// Snapshot of a stock ledger entry plus its originating voucher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovementDocument {
    pub name: String,
    pub company: String,
    /// Branch id of the warehouse the entry touches ("00" when unmapped).
    pub warehouse_branch_id: String,
    /// Numeric series of the originating voucher, reused as sarNo.
    pub series_no: i64,
    pub voucher: StockVoucher,
    pub customer_name: Option<String>,
    pub customer_tin: Option<String>,
    pub posting_date: NaiveDate,
    pub items: Vec<StockLine>,
    pub owner: String,
    pub modified_by: String,
    pub modified: String,
    pub submitted: bool,
}

/// Snapshot of an item master record for registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDocument {
    pub name: String,
    pub item_name: String,
    pub etims_code: String,
    pub classification_code: String,
    pub product_type_code: String,
    pub origin_country_code: String,
    pub packaging_unit_code: String,
    pub quantity_unit_code: String,
    pub taxation_type_code: Option<String>,
    pub valuation_rate: f64,
    pub owner: String,
    pub modified_by: String,
    pub modified: String,
    pub registered: bool,
}

/// Snapshot of a bill of materials for item-composition submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomDocument {
    pub name: String,
    pub item_etims_code: String,
    pub components: Vec<BomComponent>,
    pub owner: String,
    pub modified: String,
    pub submitted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomComponent {
    pub etims_code: String,
    pub qty: f64,
}

/// Snapshot of a customer record for branch-customer submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDocument {
    pub name: String,
    pub customer_no: String,
    pub tin: String,
    pub customer_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub owner: String,
    pub modified_by: String,
    pub modified: String,
    pub submitted: bool,
}

/// Snapshot of an ERP user for branch-user submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDocument {
    pub name: String,
    pub user_id: String,
    pub full_name: String,
    pub address: Option<String>,
    pub contact: Option<String>,
    pub owner: String,
    pub modified_by: String,
    pub modified: String,
    pub submitted: bool,
}
