//! Locally persisted records pulled down from the provider.
//!
//! Search-style operations ingest their response data into these shapes so
//! the host can browse registered purchases, stock movements, notices and
//! reference codes without further network calls.

use serde::{Deserialize, Serialize};

/// A code list entry, keyed by its class (payment types, packaging units,
/// countries and so on).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDetail {
    pub class_code: String,
    pub class_name: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i64,
}

/// UNSPSC-style item classification entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemClassification {
    pub code: String,
    pub name: String,
    pub level: Option<i64>,
    pub taxation_type: Option<String>,
    pub is_major_target: bool,
    pub in_use: bool,
}

/// A purchase registered against our TIN on the provider side, awaiting
/// acceptance in the host ERP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredPurchase {
    pub supplier_tin: String,
    pub supplier_name: String,
    pub supplier_branch_id: String,
    pub supplier_invoice_no: i64,
    pub receipt_type_code: String,
    pub payment_type_code: String,
    pub sale_date: String,
    pub total_item_count: i64,
    pub total_taxable_amount: f64,
    pub total_tax_amount: f64,
    pub total_amount: f64,
    pub remark: Option<String>,
    pub items: Vec<RegisteredPurchaseItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredPurchaseItem {
    pub item_seq: i64,
    pub item_code: Option<String>,
    pub item_classification_code: Option<String>,
    pub item_name: String,
    pub packaging_unit_code: String,
    pub quantity_unit_code: String,
    pub qty: f64,
    pub unit_price: f64,
    pub supply_amount: f64,
    pub discount_rate: f64,
    pub discount_amount: f64,
    pub taxation_type_code: String,
    pub taxable_amount: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
}

/// A stock movement recorded by another branch of the same taxpayer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredStockMovement {
    pub customer_tin: String,
    pub customer_branch_id: String,
    pub stored_and_released_no: i64,
    pub occurred_date: String,
    pub total_item_count: i64,
    pub total_taxable_amount: f64,
    pub total_tax_amount: f64,
    pub total_amount: f64,
    pub remark: Option<String>,
    pub items: Vec<RegisteredStockItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredStockItem {
    pub item_seq: i64,
    pub item_code: Option<String>,
    pub item_classification_code: Option<String>,
    pub item_name: String,
    pub packaging_unit_code: String,
    pub quantity_unit_code: String,
    pub qty: f64,
    pub unit_price: f64,
    pub supply_amount: f64,
    pub taxation_type_code: String,
    pub taxable_amount: f64,
    pub tax_amount: f64,
    pub total_amount: f64,
}

/// Administrative notice published by the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub notice_no: i64,
    pub title: String,
    pub contents: String,
    pub detail_url: Option<String>,
    pub registration_name: Option<String>,
    pub registration_date: String,
}

/// Imported item declared at customs, pending local conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedItem {
    pub task_code: String,
    pub declaration_date: String,
    pub item_seq: i64,
    pub declaration_no: String,
    pub hs_code: String,
    pub item_name: String,
    pub origin_country_code: String,
    pub export_country_code: String,
    pub package_qty: f64,
    pub packaging_unit_code: String,
    pub qty: f64,
    pub quantity_unit_code: String,
    pub gross_weight: f64,
    pub net_weight: f64,
    pub supplier_name: Option<String>,
    pub agent_name: Option<String>,
    pub invoice_foreign_currency_amount: f64,
    pub invoice_foreign_currency: String,
    pub invoice_exchange_rate: f64,
}

/// Branch registered under the taxpayer's TIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRecord {
    pub tin: String,
    pub branch_id: String,
    pub name: String,
    pub status_code: Option<String>,
    pub county_name: Option<String>,
    pub locality_name: Option<String>,
    pub location_description: Option<String>,
    pub manager_name: Option<String>,
    pub manager_contact: Option<String>,
    pub manager_email: Option<String>,
    pub is_headquarters: bool,
}
