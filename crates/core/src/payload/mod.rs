//! Payload builders: host document snapshots to typed wire payloads.
//!
//! Builders are pure functions. They validate that every line carries its
//! resolved eTIMS codes, quantize every monetary field, and never perform
//! I/O; a snapshot that cannot produce a complete payload fails the whole
//! build with [`EtimsError::InvalidInput`].

mod master;
mod purchase;
mod sales;
mod stock;

pub use master::{
    build_branch_customer, build_branch_user, build_item_composition, build_item_registration,
};
pub use purchase::build_purchase_invoice;
pub use sales::build_sales_invoice;
pub use stock::{build_stock_movement, movement_type_code};

use etims_domain::encoding::quantize;
use etims_domain::types::{InvoiceLine, InvoiceLinePayload, LineItemCodes, TaxBreakup, TaxBucket};
use etims_domain::{EtimsError, Result};

/// Resolve a mandatory line-item code, naming the item and the missing code
/// in the error.
fn require_code(code: Option<&str>, item_name: &str, which: &str) -> Result<String> {
    code.map(str::to_owned).ok_or_else(|| {
        EtimsError::InvalidInput(format!("item {item_name:?} has no {which} code assigned"))
    })
}

fn resolved_codes(codes: &LineItemCodes, item_name: &str) -> Result<(String, String, String, String)> {
    Ok((
        require_code(codes.classification.as_deref(), item_name, "classification")?,
        require_code(codes.packaging_unit.as_deref(), item_name, "packaging unit")?,
        require_code(codes.quantity_unit.as_deref(), item_name, "quantity unit")?,
        require_code(codes.taxation_type.as_deref(), item_name, "taxation type")?,
    ))
}

/// Convert one invoice line. Credit notes report absolute quantities and
/// amounts; direction lives in the receipt type code, not the numbers.
fn invoice_line(line: &InvoiceLine, absolute: bool) -> Result<InvoiceLinePayload> {
    let (classification, packaging, quantity_unit, taxation) =
        resolved_codes(&line.codes, &line.item_name)?;
    let sign = |v: f64| if absolute { v.abs() } else { v };

    Ok(InvoiceLinePayload {
        item_seq: line.idx,
        item_cd: line.etims_item_code.clone(),
        item_cls_cd: classification,
        item_nm: line.item_name.clone(),
        bcd: None,
        pkg_unit_cd: packaging,
        pkg: sign(line.qty),
        qty_unit_cd: quantity_unit,
        qty: sign(line.qty),
        prc: quantize(line.rate),
        sply_amt: quantize(sign(line.amount)),
        dc_rt: quantize(line.discount_rate),
        dc_amt: quantize(sign(line.discount_amount)),
        tax_ty_cd: taxation,
        taxbl_amt: quantize(sign(line.taxable_amount)),
        tax_amt: quantize(sign(line.tax_amount)),
        tot_amt: quantize(sign(line.taxable_amount) + sign(line.tax_amount)),
        item_expr_dt: None,
    })
}

/// Per-bucket taxable amounts, quantized.
fn bucket_taxable(breakup: &TaxBreakup, absolute: bool) -> [f64; 5] {
    let mut out = [0.0; 5];
    for bucket in TaxBucket::ALL {
        let v = breakup.taxable_for(bucket);
        out[bucket.index()] = quantize(if absolute { v.abs() } else { v });
    }
    out
}

/// Per-bucket tax amounts, quantized.
fn bucket_tax(breakup: &TaxBreakup, absolute: bool) -> [f64; 5] {
    let mut out = [0.0; 5];
    for bucket in TaxBucket::ALL {
        let v = breakup.tax_for(bucket);
        out[bucket.index()] = quantize(if absolute { v.abs() } else { v });
    }
    out
}

/// Per-bucket rates: the statutory rate for buckets carrying tax, zero for
/// the rest.
fn bucket_rates(breakup: &TaxBreakup) -> [f64; 5] {
    let mut out = [0.0; 5];
    for bucket in TaxBucket::ALL {
        if breakup.tax_for(bucket) != 0.0 {
            out[bucket.index()] = bucket.statutory_rate();
        }
    }
    out
}
