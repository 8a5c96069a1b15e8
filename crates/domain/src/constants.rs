//! Domain constants: provider result codes, server URLs, route operations.

/// Provider result code signalling a successful exchange.
pub const RESULT_OK: &str = "000";

/// Result codes the provider uses for an invalid or expired communication
/// key. Submissions failing with one of these need a device re-initialisation.
pub const RESULT_INVALID_KEY: &[&str] = &["901", "902"];

/// Sandbox (test) environment base URL.
pub const SANDBOX_SERVER_URL: &str = "https://etims-api-sbx.kra.go.ke/etims-api";

/// Production environment base URL.
pub const PRODUCTION_SERVER_URL: &str = "https://etims-api.kra.go.ke/etims-api";

/// Public receipt verification portal, sandbox environment.
pub const SANDBOX_RECEIPT_URL: &str =
    "https://etims-sbx.kra.go.ke/common/link/etims/receipt/indexEtimsReceiptData";

/// Public receipt verification portal, production environment.
pub const PRODUCTION_RECEIPT_URL: &str =
    "https://etims.kra.go.ke/common/link/etims/receipt/indexEtimsReceiptData";

/// Cursor value submitted when no previous request date is recorded for a
/// "fetch since" route; early enough to return the full data set.
pub const EPOCH_REQUEST_DATE: &str = "20000101000000";

/// Wire encoding for date-only fields (`YYYYMMDD`).
pub const WIRE_DATE_FORMAT: &str = "%Y%m%d";

/// Wire encoding for datetime fields (`YYYYMMDDHHMMSS`).
pub const WIRE_DATETIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// Logical route operation names, as keyed in the route table.
pub mod ops {
    pub const DEVICE_VERIFICATION: &str = "DeviceVerificationReq";
    pub const CODE_SEARCH: &str = "CodeSearchReq";
    pub const ITEM_CLS_SEARCH: &str = "ItemClsSearchReq";
    pub const ITEM_SAVE: &str = "ItemSaveReq";
    pub const ITEM_COMPOSITION_SAVE: &str = "SaveItemCompositionReq";
    pub const BRANCH_SEARCH: &str = "BhfSearchReq";
    pub const BRANCH_CUSTOMER_SAVE: &str = "BhfCustSaveReq";
    pub const BRANCH_USER_SAVE: &str = "BhfUserSaveReq";
    pub const NOTICE_SEARCH: &str = "NoticeSearchReq";
    pub const CUSTOMER_SEARCH: &str = "CustSearchReq";
    pub const SALES_SAVE: &str = "TrnsSalesSaveWrReq";
    pub const PURCHASE_SAVE: &str = "TrnsPurchaseSaveReq";
    pub const PURCHASE_SALES_SEARCH: &str = "TrnsPurchaseSalesReq";
    pub const STOCK_IO_SAVE: &str = "StockIOSaveReq";
    pub const STOCK_MOVE_SEARCH: &str = "StockMoveReq";
    pub const IMPORTED_ITEM_SEARCH: &str = "ImportItemSearchReq";
}

/// Default operation -> URL path mapping; the route table repository seeds
/// itself from this and operators may override individual paths.
pub const DEFAULT_ROUTES: &[(&str, &str)] = &[
    (ops::DEVICE_VERIFICATION, "/selectInitOsdcInfo"),
    (ops::CODE_SEARCH, "/selectCodeList"),
    (ops::ITEM_CLS_SEARCH, "/selectItemClsList"),
    (ops::ITEM_SAVE, "/saveItem"),
    (ops::ITEM_COMPOSITION_SAVE, "/saveItemComposition"),
    (ops::BRANCH_SEARCH, "/selectBhfList"),
    (ops::BRANCH_CUSTOMER_SAVE, "/saveBhfCustomer"),
    (ops::BRANCH_USER_SAVE, "/saveBhfUser"),
    (ops::NOTICE_SEARCH, "/selectNoticeList"),
    (ops::CUSTOMER_SEARCH, "/selectCustomer"),
    (ops::SALES_SAVE, "/saveTrnsSalesOsdc"),
    (ops::PURCHASE_SAVE, "/insertTrnsPurchase"),
    (ops::PURCHASE_SALES_SEARCH, "/selectTrnsPurchaseSalesList"),
    (ops::STOCK_IO_SAVE, "/insertStockIO"),
    (ops::STOCK_MOVE_SEARCH, "/selectStockMoveList"),
    (ops::IMPORTED_ITEM_SEARCH, "/selectImportItemList"),
];
