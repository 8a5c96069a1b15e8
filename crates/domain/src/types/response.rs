//! Provider response envelope and typed response payloads.

use serde::{Deserialize, Serialize};

use crate::constants::{RESULT_INVALID_KEY, RESULT_OK};
use crate::errors::{EtimsError, Result};

/// The fixed response envelope every provider endpoint returns.
///
/// `result_cd == "000"` is the only success signal; HTTP status is always
/// 200 for business-level rejections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtimsResponse {
    pub result_cd: String,
    pub result_msg: String,
    pub result_dt: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl EtimsResponse {
    pub fn is_success(&self) -> bool {
        self.result_cd == RESULT_OK
    }

    /// Whether the rejection signals an invalid/expired communication key.
    pub fn is_session_key_rejection(&self) -> bool {
        RESULT_INVALID_KEY.contains(&self.result_cd.as_str())
    }

    /// Deserialize the `data` member into a typed response body.
    pub fn parse_data<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let data = self
            .data
            .clone()
            .ok_or_else(|| EtimsError::InvalidInput("response carries no data member".into()))?;
        serde_json::from_value(data)
            .map_err(|e| EtimsError::InvalidInput(format!("malformed response data: {e}")))
    }
}

/// `data` body of a successful sales submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReceiptData {
    pub cur_rcpt_no: i64,
    pub tot_rcpt_no: i64,
    pub intrl_data: String,
    pub rcpt_sign: String,
    pub sdc_date_time: String,
}

/// `data` body of a device-verification handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInitData {
    pub info: DeviceInitInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInitInfo {
    pub cmc_key: String,
}

/// `data` body of a code-list search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSearchData {
    pub cls_list: Vec<CodeClass>,
}

/// One code class (e.g. "Quantity Unit") with its detail codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeClass {
    pub cd_cls: String,
    pub cd_cls_nm: String,
    pub dtl_list: Vec<CodeDetailData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeDetailData {
    pub cd: String,
    pub cd_nm: String,
    #[serde(default)]
    pub cd_desc: Option<String>,
    pub srt_ord: i64,
    #[serde(default)]
    pub use_yn: Option<String>,
    #[serde(default)]
    pub user_dfn_cd1: Option<String>,
    #[serde(default)]
    pub user_dfn_cd2: Option<String>,
    #[serde(default)]
    pub user_dfn_cd3: Option<String>,
}

/// `data` body of an item-classification search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemClsSearchData {
    pub item_cls_list: Vec<ItemClassificationData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemClassificationData {
    pub item_cls_cd: String,
    pub item_cls_lvl: i64,
    pub item_cls_nm: String,
    #[serde(default)]
    pub tax_ty_cd: Option<String>,
    #[serde(default)]
    pub use_yn: Option<String>,
    #[serde(default)]
    pub mjr_tg_yn: Option<String>,
}

/// `data` body of a customer search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSearchData {
    pub taxpr_nm: String,
    pub taxpr_stts_cd: String,
    #[serde(default)]
    pub prvnc_nm: Option<String>,
    #[serde(default)]
    pub dstrt_nm: Option<String>,
    #[serde(default)]
    pub sctr_nm: Option<String>,
    #[serde(default)]
    pub loc_desc: Option<String>,
}

/// `data` body of a branch search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchSearchData {
    pub bhf_list: Vec<BranchData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchData {
    pub bhf_id: String,
    pub tin: String,
    pub bhf_nm: String,
    pub bhf_stts_cd: String,
    #[serde(default)]
    pub prvnc_nm: Option<String>,
    #[serde(default)]
    pub dstrt_nm: Option<String>,
    #[serde(default)]
    pub sctr_nm: Option<String>,
    #[serde(default)]
    pub loc_desc: Option<String>,
    #[serde(default)]
    pub mgr_nm: Option<String>,
    #[serde(default)]
    pub mgr_tel_no: Option<String>,
    #[serde(default)]
    pub mgr_email: Option<String>,
    #[serde(default)]
    pub hq_yn: Option<String>,
}

/// `data` body of a notices search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeSearchData {
    pub notice_list: Vec<NoticeData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeData {
    pub notice_no: i64,
    pub title: String,
    #[serde(default)]
    pub regr_nm: Option<String>,
    #[serde(default)]
    pub dtl_url: Option<String>,
    pub reg_dt: String,
    #[serde(default)]
    pub cont: Option<String>,
}

/// `data` body of a registered-purchases search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSearchData {
    pub sale_list: Vec<PurchaseSaleData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSaleData {
    pub spplr_tin: String,
    pub spplr_nm: String,
    pub spplr_bhf_id: String,
    pub spplr_invc_no: i64,
    pub rcpt_ty_cd: String,
    pub pmt_ty_cd: String,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub cfm_dt: Option<String>,
    pub sales_dt: String,
    #[serde(default)]
    pub stock_rls_dt: Option<String>,
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
    pub item_list: Vec<PurchaseSaleItemData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSaleItemData {
    pub item_seq: i64,
    #[serde(default)]
    pub item_cd: Option<String>,
    pub item_cls_cd: String,
    pub item_nm: String,
    #[serde(default)]
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
}

/// `data` body of a registered stock-movement search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMoveSearchData {
    pub stock_list: Vec<StockMoveData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMoveData {
    pub cust_tin: String,
    pub cust_bhf_id: String,
    pub sar_no: i64,
    pub ocrn_dt: String,
    pub tot_item_cnt: i64,
    pub tot_taxbl_amt: f64,
    pub tot_tax_amt: f64,
    pub tot_amt: f64,
    #[serde(default)]
    pub remark: Option<String>,
    pub item_list: Vec<StockMoveItemData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMoveItemData {
    pub item_seq: i64,
    #[serde(default)]
    pub item_cd: Option<String>,
    pub item_cls_cd: String,
    pub item_nm: String,
    #[serde(default)]
    pub bcd: Option<String>,
    pub pkg_unit_cd: String,
    pub pkg: f64,
    pub qty_unit_cd: String,
    pub qty: f64,
    #[serde(default)]
    pub item_expr_dt: Option<String>,
    pub prc: f64,
    pub sply_amt: f64,
    pub tot_dc_amt: f64,
    pub tax_ty_cd: String,
    pub taxbl_amt: f64,
    pub tax_amt: f64,
    pub tot_amt: f64,
}

/// `data` body of an imported-items search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedItemSearchData {
    pub item_list: Vec<ImportedItemData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedItemData {
    pub task_cd: String,
    pub dcl_de: String,
    pub item_seq: i64,
    pub dcl_no: String,
    pub hs_cd: String,
    pub item_nm: String,
    pub orgn_nat_cd: String,
    pub expt_nat_cd: String,
    pub pkg: f64,
    pub pkg_unit_cd: String,
    pub qty: f64,
    pub qty_unit_cd: String,
    pub tot_wt: f64,
    pub net_wt: f64,
    #[serde(default)]
    pub spplr_nm: Option<String>,
    #[serde(default)]
    pub agnt_nm: Option<String>,
    pub invc_fcur_amt: f64,
    pub invc_fcur_cd: String,
    pub invc_fcur_excrt: f64,
}
