//! Outcome handlers for search-style operations: ingest response data into
//! the local stores.
//!
//! Search rejections reference no host document, so the failure side only
//! logs; the audit trail already carries the full response. An accepted
//! response without a `data` member means nothing new since the cursor and
//! ingests nothing.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use etims_domain::types::{
    BranchRecord, BranchSearchData, CodeDetail, CodeSearchData, EtimsResponse, ImportedItem,
    ImportedItemSearchData, ItemClassification, ItemClsSearchData, Notice, NoticeSearchData,
    PurchaseSearchData, RegisteredPurchase, RegisteredPurchaseItem, RegisteredStockItem,
    RegisteredStockMovement, StockMoveSearchData,
};
use etims_domain::Result;

use crate::outcome::OutcomeHandler;
use crate::ports::{CodeListStore, RegistryStore};

fn parse_optional<T: serde::de::DeserializeOwned>(response: &EtimsResponse) -> Result<Option<T>> {
    if response.data.is_none() {
        return Ok(None);
    }
    response.parse_data().map(Some)
}

fn log_search_rejection(operation: &str, response: &EtimsResponse) {
    warn!(
        operation,
        result_cd = %response.result_cd,
        result_msg = %response.result_msg,
        "search rejected by the provider"
    );
}

fn yes(flag: Option<&str>) -> bool {
    flag == Some("Y")
}

/// Ingests reference code lists (payment types, units, countries, ...).
pub struct CodeListOutcome {
    codes: Arc<dyn CodeListStore>,
}

impl CodeListOutcome {
    pub fn new(codes: Arc<dyn CodeListStore>) -> Self {
        Self { codes }
    }
}

#[async_trait]
impl OutcomeHandler for CodeListOutcome {
    async fn on_success(&self, response: &EtimsResponse) -> Result<()> {
        let Some(data) = parse_optional::<CodeSearchData>(response)? else {
            debug!("code search returned no new classes");
            return Ok(());
        };

        let mut details = Vec::new();
        for class in &data.cls_list {
            for detail in &class.dtl_list {
                details.push(CodeDetail {
                    class_code: class.cd_cls.clone(),
                    class_name: class.cd_cls_nm.clone(),
                    code: detail.cd.clone(),
                    name: detail.cd_nm.clone(),
                    description: detail.cd_desc.clone(),
                    sort_order: detail.srt_ord,
                });
            }
        }
        debug!(count = details.len(), "ingesting code details");
        self.codes.store_code_details(&details).await
    }

    async fn on_failure(&self, response: &EtimsResponse) -> Result<()> {
        log_search_rejection("CodeSearchReq", response);
        Ok(())
    }
}

/// Ingests UNSPSC item classifications.
pub struct ItemClassificationsOutcome {
    codes: Arc<dyn CodeListStore>,
}

impl ItemClassificationsOutcome {
    pub fn new(codes: Arc<dyn CodeListStore>) -> Self {
        Self { codes }
    }
}

#[async_trait]
impl OutcomeHandler for ItemClassificationsOutcome {
    async fn on_success(&self, response: &EtimsResponse) -> Result<()> {
        let Some(data) = parse_optional::<ItemClsSearchData>(response)? else {
            debug!("classification search returned no new entries");
            return Ok(());
        };

        let items: Vec<ItemClassification> = data
            .item_cls_list
            .iter()
            .map(|cls| ItemClassification {
                code: cls.item_cls_cd.clone(),
                name: cls.item_cls_nm.clone(),
                level: Some(cls.item_cls_lvl),
                taxation_type: cls.tax_ty_cd.clone(),
                is_major_target: yes(cls.mjr_tg_yn.as_deref()),
                in_use: yes(cls.use_yn.as_deref()),
            })
            .collect();
        debug!(count = items.len(), "ingesting item classifications");
        self.codes.store_item_classifications(&items).await
    }

    async fn on_failure(&self, response: &EtimsResponse) -> Result<()> {
        log_search_rejection("ItemClsSearchReq", response);
        Ok(())
    }
}

/// Ingests administrative notices.
pub struct NoticesOutcome {
    registry: Arc<dyn RegistryStore>,
}

impl NoticesOutcome {
    pub fn new(registry: Arc<dyn RegistryStore>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl OutcomeHandler for NoticesOutcome {
    async fn on_success(&self, response: &EtimsResponse) -> Result<()> {
        let Some(data) = parse_optional::<NoticeSearchData>(response)? else {
            debug!("notice search returned nothing new");
            return Ok(());
        };

        let notices: Vec<Notice> = data
            .notice_list
            .iter()
            .map(|notice| Notice {
                notice_no: notice.notice_no,
                title: notice.title.clone(),
                contents: notice.cont.clone().unwrap_or_default(),
                detail_url: notice.dtl_url.clone(),
                registration_name: notice.regr_nm.clone(),
                registration_date: notice.reg_dt.clone(),
            })
            .collect();
        self.registry.store_notices(&notices).await
    }

    async fn on_failure(&self, response: &EtimsResponse) -> Result<()> {
        log_search_rejection("NoticeSearchReq", response);
        Ok(())
    }
}

/// Ingests purchases registered against the taxpayer.
pub struct PurchasesOutcome {
    registry: Arc<dyn RegistryStore>,
}

impl PurchasesOutcome {
    pub fn new(registry: Arc<dyn RegistryStore>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl OutcomeHandler for PurchasesOutcome {
    async fn on_success(&self, response: &EtimsResponse) -> Result<()> {
        let Some(data) = parse_optional::<PurchaseSearchData>(response)? else {
            debug!("purchase search returned nothing new");
            return Ok(());
        };

        let purchases: Vec<RegisteredPurchase> = data
            .sale_list
            .iter()
            .map(|sale| RegisteredPurchase {
                supplier_tin: sale.spplr_tin.clone(),
                supplier_name: sale.spplr_nm.clone(),
                supplier_branch_id: sale.spplr_bhf_id.clone(),
                supplier_invoice_no: sale.spplr_invc_no,
                receipt_type_code: sale.rcpt_ty_cd.clone(),
                payment_type_code: sale.pmt_ty_cd.clone(),
                sale_date: sale.sales_dt.clone(),
                total_item_count: sale.tot_item_cnt,
                total_taxable_amount: sale.tot_taxbl_amt,
                total_tax_amount: sale.tot_tax_amt,
                total_amount: sale.tot_amt,
                remark: sale.remark.clone(),
                items: sale
                    .item_list
                    .iter()
                    .map(|item| RegisteredPurchaseItem {
                        item_seq: item.item_seq,
                        item_code: item.item_cd.clone(),
                        item_classification_code: Some(item.item_cls_cd.clone()),
                        item_name: item.item_nm.clone(),
                        packaging_unit_code: item.pkg_unit_cd.clone(),
                        quantity_unit_code: item.qty_unit_cd.clone(),
                        qty: item.qty,
                        unit_price: item.prc,
                        supply_amount: item.sply_amt,
                        discount_rate: item.dc_rt,
                        discount_amount: item.dc_amt,
                        taxation_type_code: item.tax_ty_cd.clone(),
                        taxable_amount: item.taxbl_amt,
                        tax_amount: item.tax_amt,
                        total_amount: item.tot_amt,
                    })
                    .collect(),
            })
            .collect();
        self.registry.store_purchases(&purchases).await
    }

    async fn on_failure(&self, response: &EtimsResponse) -> Result<()> {
        log_search_rejection("TrnsPurchaseSalesReq", response);
        Ok(())
    }
}

/// Ingests stock movements recorded by sibling branches.
pub struct StockMovesOutcome {
    registry: Arc<dyn RegistryStore>,
}

impl StockMovesOutcome {
    pub fn new(registry: Arc<dyn RegistryStore>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl OutcomeHandler for StockMovesOutcome {
    async fn on_success(&self, response: &EtimsResponse) -> Result<()> {
        let Some(data) = parse_optional::<StockMoveSearchData>(response)? else {
            debug!("stock movement search returned nothing new");
            return Ok(());
        };

        let movements: Vec<RegisteredStockMovement> = data
            .stock_list
            .iter()
            .map(|movement| RegisteredStockMovement {
                customer_tin: movement.cust_tin.clone(),
                customer_branch_id: movement.cust_bhf_id.clone(),
                stored_and_released_no: movement.sar_no,
                occurred_date: movement.ocrn_dt.clone(),
                total_item_count: movement.tot_item_cnt,
                total_taxable_amount: movement.tot_taxbl_amt,
                total_tax_amount: movement.tot_tax_amt,
                total_amount: movement.tot_amt,
                remark: movement.remark.clone(),
                items: movement
                    .item_list
                    .iter()
                    .map(|item| RegisteredStockItem {
                        item_seq: item.item_seq,
                        item_code: item.item_cd.clone(),
                        item_classification_code: Some(item.item_cls_cd.clone()),
                        item_name: item.item_nm.clone(),
                        packaging_unit_code: item.pkg_unit_cd.clone(),
                        quantity_unit_code: item.qty_unit_cd.clone(),
                        qty: item.qty,
                        unit_price: item.prc,
                        supply_amount: item.sply_amt,
                        taxation_type_code: item.tax_ty_cd.clone(),
                        taxable_amount: item.taxbl_amt,
                        tax_amount: item.tax_amt,
                        total_amount: item.tot_amt,
                    })
                    .collect(),
            })
            .collect();
        self.registry.store_stock_movements(&movements).await
    }

    async fn on_failure(&self, response: &EtimsResponse) -> Result<()> {
        log_search_rejection("StockMoveReq", response);
        Ok(())
    }
}

/// Ingests customs-declared imported items.
pub struct ImportedItemsOutcome {
    registry: Arc<dyn RegistryStore>,
}

impl ImportedItemsOutcome {
    pub fn new(registry: Arc<dyn RegistryStore>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl OutcomeHandler for ImportedItemsOutcome {
    async fn on_success(&self, response: &EtimsResponse) -> Result<()> {
        let Some(data) = parse_optional::<ImportedItemSearchData>(response)? else {
            debug!("imported item search returned nothing new");
            return Ok(());
        };

        let items: Vec<ImportedItem> = data
            .item_list
            .iter()
            .map(|item| ImportedItem {
                task_code: item.task_cd.clone(),
                declaration_date: item.dcl_de.clone(),
                item_seq: item.item_seq,
                declaration_no: item.dcl_no.clone(),
                hs_code: item.hs_cd.clone(),
                item_name: item.item_nm.clone(),
                origin_country_code: item.orgn_nat_cd.clone(),
                export_country_code: item.expt_nat_cd.clone(),
                package_qty: item.pkg,
                packaging_unit_code: item.pkg_unit_cd.clone(),
                qty: item.qty,
                quantity_unit_code: item.qty_unit_cd.clone(),
                gross_weight: item.tot_wt,
                net_weight: item.net_wt,
                supplier_name: item.spplr_nm.clone(),
                agent_name: item.agnt_nm.clone(),
                invoice_foreign_currency_amount: item.invc_fcur_amt,
                invoice_foreign_currency: item.invc_fcur_cd.clone(),
                invoice_exchange_rate: item.invc_fcur_excrt,
            })
            .collect();
        self.registry.store_imported_items(&items).await
    }

    async fn on_failure(&self, response: &EtimsResponse) -> Result<()> {
        log_search_rejection("ImportItemSearchReq", response);
        Ok(())
    }
}

/// Ingests the taxpayer's registered branch list.
pub struct BranchListOutcome {
    registry: Arc<dyn RegistryStore>,
}

impl BranchListOutcome {
    pub fn new(registry: Arc<dyn RegistryStore>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl OutcomeHandler for BranchListOutcome {
    async fn on_success(&self, response: &EtimsResponse) -> Result<()> {
        let Some(data) = parse_optional::<BranchSearchData>(response)? else {
            debug!("branch search returned nothing new");
            return Ok(());
        };

        let branches: Vec<BranchRecord> = data
            .bhf_list
            .iter()
            .map(|branch| BranchRecord {
                tin: branch.tin.clone(),
                branch_id: branch.bhf_id.clone(),
                name: branch.bhf_nm.clone(),
                status_code: Some(branch.bhf_stts_cd.clone()),
                county_name: branch.prvnc_nm.clone(),
                locality_name: branch.sctr_nm.clone(),
                location_description: branch.loc_desc.clone(),
                manager_name: branch.mgr_nm.clone(),
                manager_contact: branch.mgr_tel_no.clone(),
                manager_email: branch.mgr_email.clone(),
                is_headquarters: yes(branch.hq_yn.as_deref()),
            })
            .collect();
        self.registry.store_branches(&branches).await
    }

    async fn on_failure(&self, response: &EtimsResponse) -> Result<()> {
        log_search_rejection("BhfSearchReq", response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingCodes {
        details: Mutex<Vec<CodeDetail>>,
        classifications: Mutex<Vec<ItemClassification>>,
    }

    #[async_trait]
    impl CodeListStore for RecordingCodes {
        async fn store_code_details(&self, details: &[CodeDetail]) -> Result<()> {
            self.details.lock().unwrap().extend_from_slice(details);
            Ok(())
        }

        async fn store_item_classifications(&self, items: &[ItemClassification]) -> Result<()> {
            self.classifications.lock().unwrap().extend_from_slice(items);
            Ok(())
        }
    }

    fn response(body: &str) -> EtimsResponse {
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn code_search_flattens_classes_into_details() {
        let codes = Arc::new(RecordingCodes::default());
        let handler = CodeListOutcome::new(codes.clone());

        handler
            .on_success(&response(
                r#"{
                    "resultCd": "000",
                    "resultMsg": "Succeeded",
                    "resultDt": "20240307140509",
                    "data": {
                        "clsList": [{
                            "cdCls": "07",
                            "cdClsNm": "Payment Type",
                            "dtlList": [
                                {"cd": "01", "cdNm": "CASH", "srtOrd": 1},
                                {"cd": "02", "cdNm": "CREDIT", "srtOrd": 2}
                            ]
                        }]
                    }
                }"#,
            ))
            .await
            .unwrap();

        let details = codes.details.lock().unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].class_code, "07");
        assert_eq!(details[1].code, "02");
    }

    #[tokio::test]
    async fn missing_data_member_ingests_nothing() {
        let codes = Arc::new(RecordingCodes::default());
        let handler = CodeListOutcome::new(codes.clone());
        handler
            .on_success(&response(
                r#"{"resultCd":"000","resultMsg":"ok","resultDt":"20240307140509"}"#,
            ))
            .await
            .unwrap();
        assert!(codes.details.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejection_only_logs() {
        let codes = Arc::new(RecordingCodes::default());
        let handler = CodeListOutcome::new(codes.clone());
        handler
            .on_failure(&response(
                r#"{"resultCd":"801","resultMsg":"no data","resultDt":"20240307140509"}"#,
            ))
            .await
            .unwrap();
        assert!(codes.details.lock().unwrap().is_empty());
    }
}
