//! Master-data payload construction: items, compositions, branch customers
//! and branch users.

use etims_domain::encoding::{quantize, user_id_from_email};
use etims_domain::types::{
    BomComponent, BomDocument, BranchCustomerPayload, BranchUserPayload, CustomerDocument,
    ItemCompositionPayload, ItemDocument, ItemRegistrationPayload, UserDocument,
};
use etims_domain::Result;

/// Build an item registration payload from the host item master.
pub fn build_item_registration(doc: &ItemDocument) -> Result<ItemRegistrationPayload> {
    Ok(ItemRegistrationPayload {
        item_cd: doc.etims_code.clone(),
        item_cls_cd: doc.classification_code.clone(),
        item_ty_cd: doc.product_type_code.clone(),
        item_nm: doc.item_name.clone(),
        item_std_nm: None,
        orgn_nat_cd: doc.origin_country_code.clone(),
        pkg_unit_cd: doc.packaging_unit_code.clone(),
        qty_unit_cd: doc.quantity_unit_code.clone(),
        tax_ty_cd: doc.taxation_type_code.clone().unwrap_or_else(|| "B".into()),
        btch_no: None,
        bcd: None,
        dft_prc: quantize(doc.valuation_rate),
        grp_prc_l1: None,
        grp_prc_l2: None,
        grp_prc_l3: None,
        grp_prc_l4: None,
        grp_prc_l5: None,
        add_info: None,
        sfty_qty: None,
        isrc_aplcb_yn: "Y".into(),
        use_yn: "Y".into(),
        regr_id: user_id_from_email(&doc.owner),
        regr_nm: doc.owner.clone(),
        modr_id: user_id_from_email(&doc.modified_by),
        modr_nm: doc.modified_by.clone(),
    })
}

/// Build composition payloads, one per BOM component.
pub fn build_item_composition(doc: &BomDocument) -> Result<Vec<ItemCompositionPayload>> {
    Ok(doc
        .components
        .iter()
        .map(|component: &BomComponent| ItemCompositionPayload {
            item_cd: doc.item_etims_code.clone(),
            cpst_item_cd: component.etims_code.clone(),
            cpst_qty: component.qty,
            regr_id: user_id_from_email(&doc.owner),
            regr_nm: doc.owner.clone(),
        })
        .collect())
}

/// Build a branch-customer registration payload.
pub fn build_branch_customer(doc: &CustomerDocument) -> Result<BranchCustomerPayload> {
    Ok(BranchCustomerPayload {
        cust_no: doc.customer_no.clone(),
        cust_tin: doc.tin.clone(),
        cust_nm: doc.customer_name.clone(),
        adrs: doc.address.clone(),
        tel_no: doc.phone.clone(),
        email: doc.email.clone(),
        fax_no: None,
        use_yn: "Y".into(),
        remark: None,
        regr_id: user_id_from_email(&doc.owner),
        regr_nm: doc.owner.clone(),
        modr_id: user_id_from_email(&doc.modified_by),
        modr_nm: doc.modified_by.clone(),
    })
}

/// Build a branch-user registration payload.
pub fn build_branch_user(doc: &UserDocument) -> Result<BranchUserPayload> {
    Ok(BranchUserPayload {
        user_id: doc.user_id.clone(),
        user_nm: doc.full_name.clone(),
        adrs: doc.address.clone(),
        cntc: doc.contact.clone(),
        auth_cd: None,
        remark: None,
        use_yn: "Y".into(),
        regr_id: user_id_from_email(&doc.owner),
        regr_nm: doc.owner.clone(),
        modr_id: user_id_from_email(&doc.modified_by),
        modr_nm: doc.modified_by.clone(),
    })
}
