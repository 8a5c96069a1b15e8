//! Purchase invoice payload construction.

use etims_domain::encoding::{quantize, user_id_from_email, wire_date};
use etims_domain::types::{PurchaseInvoiceDocument, PurchaseInvoicePayload};
use etims_domain::Result;

use super::{bucket_rates, bucket_tax, bucket_taxable, invoice_line};

/// Build a purchase submission payload.
///
/// Purchases carry the document's own numeric series as `invcNo`; the
/// provider does not sequence them, so there is nothing to commit on
/// success.
pub fn build_purchase_invoice(doc: &PurchaseInvoiceDocument) -> Result<PurchaseInvoicePayload> {
    let items = doc
        .items
        .iter()
        .map(|line| invoice_line(line, false))
        .collect::<Result<Vec<_>>>()?;

    let taxable = bucket_taxable(&doc.tax_breakup, false);
    let tax = bucket_tax(&doc.tax_breakup, false);
    let rates = bucket_rates(&doc.tax_breakup);

    Ok(PurchaseInvoicePayload {
        invc_no: doc.series_no,
        org_invc_no: 0,
        spplr_tin: doc.supplier_tin.clone(),
        spplr_bhf_id: doc.supplier_branch_id.clone(),
        spplr_nm: Some(doc.supplier_name.clone()),
        spplr_invc_no: doc.supplier_invoice_no.clone(),
        reg_ty_cd: "A".into(),
        pchs_ty_cd: doc.purchase_type_code.clone(),
        rcpt_ty_cd: doc.receipt_type_code.clone(),
        pmt_ty_cd: doc.payment_type_code.clone(),
        pchs_stts_cd: doc.purchase_status_code.clone(),
        cfm_dt: None,
        pchs_dt: wire_date(doc.posting_date),
        wrhs_dt: None,
        cncl_req_dt: None,
        cncl_dt: None,
        rfd_dt: None,
        tot_item_cnt: items.len() as i64,
        taxbl_amt_a: taxable[0],
        taxbl_amt_b: taxable[1],
        taxbl_amt_c: taxable[2],
        taxbl_amt_d: taxable[3],
        taxbl_amt_e: taxable[4],
        tax_rt_a: rates[0],
        tax_rt_b: rates[1],
        tax_rt_c: rates[2],
        tax_rt_d: rates[3],
        tax_rt_e: rates[4],
        tax_amt_a: tax[0],
        tax_amt_b: tax[1],
        tax_amt_c: tax[2],
        tax_amt_d: tax[3],
        tax_amt_e: tax[4],
        tot_taxbl_amt: quantize(doc.net_total),
        tot_tax_amt: quantize(doc.total_tax),
        tot_amt: quantize(doc.grand_total),
        remark: None,
        regr_id: user_id_from_email(&doc.owner),
        regr_nm: doc.owner.clone(),
        modr_id: user_id_from_email(&doc.modified_by),
        modr_nm: doc.modified_by.clone(),
        item_list: items,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use etims_domain::types::{InvoiceLine, LineItemCodes, TaxBreakup};

    use super::*;

    fn sample_purchase() -> PurchaseInvoiceDocument {
        PurchaseInvoiceDocument {
            name: "ACC-PINV-2024-00007".into(),
            company: "Acme Traders".into(),
            branch_id: "00".into(),
            series_no: 7,
            supplier_name: "Wholesale Ltd".into(),
            supplier_tin: Some("A000987654C".into()),
            supplier_branch_id: Some("00".into()),
            supplier_invoice_no: Some("INV-881".into()),
            purchase_type_code: "N".into(),
            receipt_type_code: "P".into(),
            payment_type_code: "01".into(),
            purchase_status_code: "02".into(),
            posting_date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            is_return: false,
            update_stock: true,
            net_total: 500.0,
            total_tax: 80.0,
            grand_total: 580.0,
            tax_breakup: TaxBreakup {
                taxable: [0.0, 500.0, 0.0, 0.0, 0.0],
                tax: [0.0, 80.0, 0.0, 0.0, 0.0],
            },
            items: vec![InvoiceLine {
                idx: 1,
                item_name: "Crate".into(),
                etims_item_code: Some("KE2NTXU0000009".into()),
                qty: 10.0,
                rate: 50.0,
                amount: 500.0,
                discount_rate: 0.0,
                discount_amount: 0.0,
                taxable_amount: 500.0,
                tax_amount: 80.0,
                codes: LineItemCodes {
                    classification: Some("24101500".into()),
                    packaging_unit: Some("NT".into()),
                    quantity_unit: Some("U".into()),
                    taxation_type: Some("B".into()),
                },
            }],
            owner: "stores@example.com".into(),
            modified_by: "stores@example.com".into(),
            modified: "2024-03-07 10:00:00.000001".into(),
            submitted: false,
        }
    }

    #[test]
    fn purchase_uses_document_series_as_invoice_no() {
        let payload = build_purchase_invoice(&sample_purchase()).unwrap();
        assert_eq!(payload.invc_no, 7);
        assert_eq!(payload.org_invc_no, 0);
        assert_eq!(payload.reg_ty_cd, "A");
        assert_eq!(payload.pchs_dt, "20240307");
        assert_eq!(payload.tot_amt, 580.0);
        assert_eq!(payload.tax_rt_b, 16.0);
    }
}
