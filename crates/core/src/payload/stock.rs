//! Stock movement payload construction, including the movement-type
//! decision table.

use etims_domain::encoding::{quantize, user_id_from_email, wire_date};
use etims_domain::types::{
    ReconPurpose, StockEntryType, StockLine, StockLinePayload, StockMovementDocument,
    StockMovementPayload, StockVoucher,
};
use etims_domain::Result;

use super::resolved_codes;

/// Provider stored-and-released type code for a voucher.
///
/// Quantities on the wire are always absolute; this code alone tells the
/// provider whether stock moved in or out and why.
pub fn movement_type_code(voucher: &StockVoucher) -> &'static str {
    match *voucher {
        StockVoucher::Reconciliation { purpose: ReconPurpose::OpeningStock, .. } => "06",
        StockVoucher::Reconciliation { quantity_difference, .. } => {
            if quantity_difference < 0.0 {
                "16"
            } else {
                "06"
            }
        }
        StockVoucher::Entry { entry_type, actual_qty } => match entry_type {
            StockEntryType::MaterialReceipt => "04",
            StockEntryType::MaterialTransfer => {
                if actual_qty < 0.0 {
                    "13"
                } else {
                    "04"
                }
            }
            StockEntryType::Manufacture | StockEntryType::Repack => {
                if actual_qty < 0.0 {
                    "14"
                } else {
                    "05"
                }
            }
            StockEntryType::MaterialIssue | StockEntryType::SendToSubcontractor => "13",
        },
        StockVoucher::Purchase { is_return, imported } => {
            if is_return {
                "12"
            } else if imported {
                "01"
            } else {
                "02"
            }
        }
        StockVoucher::SalesDelivery { is_return, actual_qty } => {
            if is_return && actual_qty > 0.0 {
                "03"
            } else {
                "11"
            }
        }
    }
}

fn stock_line(line: &StockLine) -> Result<StockLinePayload> {
    let (classification, packaging, quantity_unit, taxation) =
        resolved_codes(&line.codes, &line.item_name)?;

    Ok(StockLinePayload {
        item_seq: line.idx,
        item_cd: None,
        item_cls_cd: classification,
        item_nm: line.item_name.clone(),
        bcd: None,
        pkg_unit_cd: packaging,
        pkg: line.qty.abs(),
        qty_unit_cd: quantity_unit,
        qty: line.qty.abs(),
        item_expr_dt: None,
        prc: quantize(line.rate),
        sply_amt: quantize(line.rate * line.qty.abs()),
        tot_dc_amt: 0.0,
        tax_ty_cd: taxation,
        taxbl_amt: quantize(line.taxable_amount.abs()),
        tax_amt: quantize(line.tax_amount.abs()),
        tot_amt: quantize(line.taxable_amount.abs() + line.tax_amount.abs()),
    })
}

/// Build a stored-and-released submission payload.
pub fn build_stock_movement(doc: &StockMovementDocument) -> Result<StockMovementPayload> {
    let items = doc.items.iter().map(stock_line).collect::<Result<Vec<_>>>()?;

    let tot_taxbl_amt = quantize(items.iter().map(|i| i.taxbl_amt).sum());
    let tot_tax_amt = quantize(items.iter().map(|i| i.tax_amt).sum());
    let tot_amt = quantize(items.iter().map(|i| i.tot_amt).sum());

    Ok(StockMovementPayload {
        sar_no: doc.series_no,
        org_sar_no: doc.series_no,
        reg_ty_cd: "M".into(),
        cust_tin: doc.customer_tin.clone(),
        cust_nm: doc.customer_name.clone(),
        cust_bhf_id: doc.warehouse_branch_id.clone(),
        sar_ty_cd: movement_type_code(&doc.voucher).into(),
        ocrn_dt: wire_date(doc.posting_date),
        tot_item_cnt: items.len() as i64,
        tot_taxbl_amt,
        tot_tax_amt,
        tot_amt,
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
    use etims_domain::types::LineItemCodes;

    use super::*;

    #[test]
    fn movement_table_covers_every_voucher_shape() {
        let cases: &[(StockVoucher, &str)] = &[
            (
                StockVoucher::Reconciliation {
                    purpose: ReconPurpose::OpeningStock,
                    quantity_difference: -3.0,
                },
                "06",
            ),
            (
                StockVoucher::Reconciliation {
                    purpose: ReconPurpose::Other,
                    quantity_difference: -3.0,
                },
                "16",
            ),
            (
                StockVoucher::Reconciliation {
                    purpose: ReconPurpose::Other,
                    quantity_difference: 3.0,
                },
                "06",
            ),
            (
                StockVoucher::Entry {
                    entry_type: StockEntryType::MaterialReceipt,
                    actual_qty: -1.0,
                },
                "04",
            ),
            (
                StockVoucher::Entry {
                    entry_type: StockEntryType::MaterialTransfer,
                    actual_qty: -1.0,
                },
                "13",
            ),
            (
                StockVoucher::Entry {
                    entry_type: StockEntryType::MaterialTransfer,
                    actual_qty: 1.0,
                },
                "04",
            ),
            (
                StockVoucher::Entry { entry_type: StockEntryType::Manufacture, actual_qty: 1.0 },
                "05",
            ),
            (
                StockVoucher::Entry { entry_type: StockEntryType::Manufacture, actual_qty: -1.0 },
                "14",
            ),
            (
                StockVoucher::Entry { entry_type: StockEntryType::MaterialIssue, actual_qty: 1.0 },
                "13",
            ),
            (
                StockVoucher::Entry {
                    entry_type: StockEntryType::SendToSubcontractor,
                    actual_qty: -1.0,
                },
                "13",
            ),
            (StockVoucher::Entry { entry_type: StockEntryType::Repack, actual_qty: 1.0 }, "05"),
            (StockVoucher::Entry { entry_type: StockEntryType::Repack, actual_qty: -1.0 }, "14"),
            (StockVoucher::Purchase { is_return: true, imported: true }, "12"),
            (StockVoucher::Purchase { is_return: false, imported: true }, "01"),
            (StockVoucher::Purchase { is_return: false, imported: false }, "02"),
            (StockVoucher::SalesDelivery { is_return: true, actual_qty: 1.0 }, "03"),
            (StockVoucher::SalesDelivery { is_return: true, actual_qty: -1.0 }, "11"),
            (StockVoucher::SalesDelivery { is_return: false, actual_qty: -1.0 }, "11"),
        ];

        for (voucher, expected) in cases {
            assert_eq!(movement_type_code(voucher), *expected, "{voucher:?}");
        }
    }

    #[test]
    fn payload_quantities_are_absolute() {
        let doc = StockMovementDocument {
            name: "SLE-0001".into(),
            company: "Acme Traders".into(),
            warehouse_branch_id: "00".into(),
            series_no: 15,
            voucher: StockVoucher::SalesDelivery { is_return: false, actual_qty: -4.0 },
            customer_name: Some("John Mwangi".into()),
            customer_tin: Some("A000123456B".into()),
            posting_date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            items: vec![StockLine {
                idx: 1,
                item_name: "Widget".into(),
                qty: -4.0,
                rate: 250.0,
                taxable_amount: -1000.0,
                tax_amount: -160.0,
                codes: LineItemCodes {
                    classification: Some("73131600".into()),
                    packaging_unit: Some("NT".into()),
                    quantity_unit: Some("U".into()),
                    taxation_type: Some("B".into()),
                },
            }],
            owner: "jane@example.com".into(),
            modified_by: "jane@example.com".into(),
            modified: "2024-03-07 14:05:09.000001".into(),
            submitted: false,
        };

        let payload = build_stock_movement(&doc).unwrap();
        assert_eq!(payload.sar_ty_cd, "11");
        assert_eq!(payload.sar_no, 15);
        assert_eq!(payload.org_sar_no, 15);
        assert_eq!(payload.item_list[0].qty, 4.0);
        assert_eq!(payload.tot_taxbl_amt, 1000.0);
        assert_eq!(payload.tot_amt, 1160.0);
        assert_eq!(payload.ocrn_dt, "20240307");
    }
}
