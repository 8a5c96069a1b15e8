//! Typed wire payloads, one struct per provider operation.
//!
//! Field names are fixed by the remote schema; serde renames keep the Rust
//! side readable while guaranteeing the exact wire keys. A missing field is
//! a compile error here, not a silent null on the wire.

use serde::{Deserialize, Serialize};

/// Device-verification handshake request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceVerificationPayload {
    pub tin: String,
    pub bhf_id: String,
    pub dvc_srl_no: String,
}

/// "Fetch since" request used by code, notice, branch and search routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinceRequestPayload {
    pub last_req_dt: String,
}

/// Customer lookup by taxpayer PIN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSearchPayload {
    pub custm_tin: String,
}

/// One line of a sales or purchase invoice payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLinePayload {
    pub item_seq: i64,
    pub item_cd: Option<String>,
    pub item_cls_cd: String,
    pub item_nm: String,
    pub bcd: Option<String>,
    pub pkg_unit_cd: String,
    pub pkg: f64,
    pub qty_unit_cd: String,
    pub qty: f64,
    pub prc: f64,
    pub sply_amt: f64,
    pub dc_rt: f64,
    pub dc_amt: f64,
    pub tax_ty_cd: String,
    pub taxbl_amt: f64,
    pub tax_amt: f64,
    pub tot_amt: f64,
    pub item_expr_dt: Option<String>,
}

/// Sales (or credit-note) invoice submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesInvoicePayload {
    pub invc_no: i64,
    pub org_invc_no: i64,
    pub cust_tin: Option<String>,
    pub cust_nm: Option<String>,
    pub sales_ty_cd: String,
    /// "S" for a sale, "C" for a credit note.
    pub rcpt_ty_cd: String,
    pub pmt_ty_cd: String,
    pub sales_stts_cd: String,
    pub cfm_dt: String,
    pub sales_dt: String,
    pub stock_rls_dt: Option<String>,
    pub cncl_req_dt: Option<String>,
    pub cncl_dt: Option<String>,
    pub rfd_dt: Option<String>,
    pub rfd_rsn_cd: Option<String>,
    pub tot_item_cnt: i64,
    pub taxbl_amt_a: f64,
    pub taxbl_amt_b: f64,
    pub taxbl_amt_c: f64,
    pub taxbl_amt_d: f64,
    pub taxbl_amt_e: f64,
    pub tax_rt_a: f64,
    pub tax_rt_b: f64,
    pub tax_rt_c: f64,
    pub tax_rt_d: f64,
    pub tax_rt_e: f64,
    pub tax_amt_a: f64,
    pub tax_amt_b: f64,
    pub tax_amt_c: f64,
    pub tax_amt_d: f64,
    pub tax_amt_e: f64,
    pub tot_taxbl_amt: f64,
    pub tot_tax_amt: f64,
    pub tot_amt: f64,
    pub prchr_acptc_yn: String,
    pub remark: Option<String>,
    pub regr_id: String,
    pub regr_nm: String,
    pub modr_id: String,
    pub modr_nm: String,
    pub item_list: Vec<InvoiceLinePayload>,
}

/// Purchase invoice submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseInvoicePayload {
    pub invc_no: i64,
    pub org_invc_no: i64,
    pub spplr_tin: Option<String>,
    pub spplr_bhf_id: Option<String>,
    pub spplr_nm: Option<String>,
    pub spplr_invc_no: Option<String>,
    pub reg_ty_cd: String,
    pub pchs_ty_cd: String,
    pub rcpt_ty_cd: String,
    pub pmt_ty_cd: String,
    pub pchs_stts_cd: String,
    pub cfm_dt: Option<String>,
    pub pchs_dt: String,
    pub wrhs_dt: Option<String>,
    pub cncl_req_dt: Option<String>,
    pub cncl_dt: Option<String>,
    pub rfd_dt: Option<String>,
    pub tot_item_cnt: i64,
    pub taxbl_amt_a: f64,
    pub taxbl_amt_b: f64,
    pub taxbl_amt_c: f64,
    pub taxbl_amt_d: f64,
    pub taxbl_amt_e: f64,
    pub tax_rt_a: f64,
    pub tax_rt_b: f64,
    pub tax_rt_c: f64,
    pub tax_rt_d: f64,
    pub tax_rt_e: f64,
    pub tax_amt_a: f64,
    pub tax_amt_b: f64,
    pub tax_amt_c: f64,
    pub tax_amt_d: f64,
    pub tax_amt_e: f64,
    pub tot_taxbl_amt: f64,
    pub tot_tax_amt: f64,
    pub tot_amt: f64,
    pub remark: Option<String>,
    pub regr_id: String,
    pub regr_nm: String,
    pub modr_id: String,
    pub modr_nm: String,
    pub item_list: Vec<InvoiceLinePayload>,
}

/// One line of a stock movement payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLinePayload {
    pub item_seq: i64,
    pub item_cd: Option<String>,
    pub item_cls_cd: String,
    pub item_nm: String,
    pub bcd: Option<String>,
    pub pkg_unit_cd: String,
    pub pkg: f64,
    pub qty_unit_cd: String,
    pub qty: f64,
    pub item_expr_dt: Option<String>,
    pub prc: f64,
    pub sply_amt: f64,
    pub tot_dc_amt: f64,
    pub tax_ty_cd: String,
    pub taxbl_amt: f64,
    pub tax_amt: f64,
    pub tot_amt: f64,
}

/// Stock movement (stored-and-released) submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovementPayload {
    pub sar_no: i64,
    pub org_sar_no: i64,
    pub reg_ty_cd: String,
    pub cust_tin: Option<String>,
    pub cust_nm: Option<String>,
    pub cust_bhf_id: String,
    /// Movement-type code from the decision table; carries direction, the
    /// quantities themselves are absolute.
    pub sar_ty_cd: String,
    pub ocrn_dt: String,
    pub tot_item_cnt: i64,
    pub tot_taxbl_amt: f64,
    pub tot_tax_amt: f64,
    pub tot_amt: f64,
    pub remark: Option<String>,
    pub regr_id: String,
    pub regr_nm: String,
    pub modr_id: String,
    pub modr_nm: String,
    pub item_list: Vec<StockLinePayload>,
}

/// Item master-data registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRegistrationPayload {
    pub item_cd: String,
    pub item_cls_cd: String,
    pub item_ty_cd: String,
    pub item_nm: String,
    pub item_std_nm: Option<String>,
    pub orgn_nat_cd: String,
    pub pkg_unit_cd: String,
    pub qty_unit_cd: String,
    pub tax_ty_cd: String,
    pub btch_no: Option<String>,
    pub bcd: Option<String>,
    pub dft_prc: f64,
    pub grp_prc_l1: Option<f64>,
    pub grp_prc_l2: Option<f64>,
    pub grp_prc_l3: Option<f64>,
    pub grp_prc_l4: Option<f64>,
    pub grp_prc_l5: Option<f64>,
    pub add_info: Option<String>,
    pub sfty_qty: Option<f64>,
    pub isrc_aplcb_yn: String,
    pub use_yn: String,
    pub regr_id: String,
    pub regr_nm: String,
    pub modr_id: String,
    pub modr_nm: String,
}

/// One component of an item composition (bill of materials).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCompositionPayload {
    pub item_cd: String,
    pub cpst_item_cd: String,
    pub cpst_qty: f64,
    pub regr_id: String,
    pub regr_nm: String,
}

/// Branch customer master-data submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchCustomerPayload {
    pub cust_no: String,
    pub cust_tin: String,
    pub cust_nm: String,
    pub adrs: Option<String>,
    pub tel_no: Option<String>,
    pub email: Option<String>,
    pub fax_no: Option<String>,
    pub use_yn: String,
    pub remark: Option<String>,
    pub regr_id: String,
    pub regr_nm: String,
    pub modr_id: String,
    pub modr_nm: String,
}

/// Branch user master-data submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchUserPayload {
    pub user_id: String,
    pub user_nm: String,
    pub adrs: Option<String>,
    pub cntc: Option<String>,
    pub auth_cd: Option<String>,
    pub remark: Option<String>,
    pub use_yn: String,
    pub regr_id: String,
    pub regr_nm: String,
    pub modr_id: String,
    pub modr_nm: String,
}
