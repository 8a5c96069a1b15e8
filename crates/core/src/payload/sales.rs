//! Sales invoice payload construction.

use etims_domain::encoding::{quantize, user_id_from_email, wire_date, wire_datetime};
use etims_domain::types::{InvoiceDocument, SalesInvoicePayload};
use etims_domain::Result;

use super::{bucket_rates, bucket_tax, bucket_taxable, invoice_line};

/// Build a sales submission payload.
///
/// `invc_no` is the next sequence number for the document's scope, read but
/// not yet committed; `org_invc_no` is zero for a regular sale and the
/// accepted sequence number of the original invoice for a credit note.
pub fn build_sales_invoice(
    doc: &InvoiceDocument,
    invc_no: i64,
    org_invc_no: i64,
) -> Result<SalesInvoicePayload> {
    let absolute = doc.is_return;
    let items = doc
        .items
        .iter()
        .map(|line| invoice_line(line, absolute))
        .collect::<Result<Vec<_>>>()?;

    let taxable = bucket_taxable(&doc.tax_breakup, absolute);
    let tax = bucket_tax(&doc.tax_breakup, absolute);
    let rates = bucket_rates(&doc.tax_breakup);
    let sign = |v: f64| if absolute { v.abs() } else { v };

    Ok(SalesInvoicePayload {
        invc_no,
        org_invc_no,
        cust_tin: doc.customer_tin.clone(),
        cust_nm: Some(doc.customer_name.clone()),
        sales_ty_cd: "N".into(),
        rcpt_ty_cd: if doc.is_return { "C" } else { "S" }.into(),
        pmt_ty_cd: doc.payment_type_code.clone(),
        sales_stts_cd: "02".into(),
        cfm_dt: wire_datetime(doc.posting_date, doc.posting_time),
        sales_dt: wire_date(doc.posting_date),
        stock_rls_dt: None,
        cncl_req_dt: None,
        cncl_dt: None,
        rfd_dt: None,
        rfd_rsn_cd: None,
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
        tot_taxbl_amt: quantize(sign(doc.net_total)),
        tot_tax_amt: quantize(sign(doc.total_tax)),
        tot_amt: quantize(sign(doc.grand_total)),
        prchr_acptc_yn: "N".into(),
        remark: None,
        regr_id: user_id_from_email(&doc.owner),
        regr_nm: doc.owner.clone(),
        modr_id: user_id_from_email(&doc.modified_by),
        modr_nm: doc.modified_by.clone(),
        item_list: items,
    })
}
