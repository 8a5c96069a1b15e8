//! End-to-end submission flows over a mock provider and a real SQLite state
//! database: the full service wiring the host would run, minus the network.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use etims_core::{DocumentStore, EtimsState, ReceiptFields, SubmissionService, SubmissionStatus};
use etims_domain::config::{ConnectorConfig, DatabaseConfig, Environment};
use etims_domain::constants::ops;
use etims_domain::types::{
    InvoiceDocument, InvoiceKind, InvoiceLine, LineItemCodes, SequenceScope, TaxBreakup,
};
use etims_domain::EtimsError;
use etims_infra::database::{
    DbManager, SqliteAuditTrail, SqliteCodeListStore, SqliteDocumentStore, SqliteRegistryStore,
    SqliteRouteTable, SqliteStateRepository,
};
use etims_infra::http::EtimsGateway;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    _temp_dir: TempDir,
    db: Arc<DbManager>,
    service: SubmissionService,
    state: Arc<SqliteStateRepository>,
    documents: Arc<SqliteDocumentStore>,
    scope: SequenceScope,
}

async fn harness(server_url: &str) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("state.db");
    let db = Arc::new(DbManager::new(&db_path, 4).unwrap());
    db.run_migrations().unwrap();

    let routes = SqliteRouteTable::new(db.clone());
    routes.seed_defaults().await.unwrap();
    let state = Arc::new(SqliteStateRepository::new(db.clone()));
    let documents = Arc::new(SqliteDocumentStore::new(db.clone()));

    let config = ConnectorConfig {
        company: "Acme Traders".into(),
        tin: "A123456789B".into(),
        branch_id: "00".into(),
        device_serial: "SN-0001".into(),
        environment: Environment::Sandbox,
        server_url: Some(server_url.to_string()),
        request_timeout_secs: 2,
        database: DatabaseConfig { path: db_path.display().to_string(), pool_size: 4 },
    };
    let scope = SequenceScope::new(&config.tin, &config.branch_id, config.environment);

    let service = SubmissionService::new(
        config,
        Arc::new(EtimsGateway::with_timeout(Duration::from_secs(2)).unwrap()),
        Arc::new(SqliteAuditTrail::new(db.clone())),
        state.clone(),
        Arc::new(routes),
        documents.clone(),
        Arc::new(SqliteCodeListStore::new(db.clone())),
        Arc::new(SqliteRegistryStore::new(db.clone())),
    )
    .unwrap();

    Harness { _temp_dir: temp_dir, db, service, state, documents, scope }
}

fn invoice(name: &str) -> InvoiceDocument {
    InvoiceDocument {
        name: name.into(),
        company: "Acme Traders".into(),
        branch_id: "00".into(),
        customer_name: "John Mwangi".into(),
        customer_tin: None,
        posting_date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
        posting_time: NaiveTime::from_hms_opt(14, 5, 9).unwrap(),
        is_return: false,
        payment_type_code: "01".into(),
        net_total: 1000.0,
        total_tax: 160.0,
        grand_total: 1160.0,
        tax_breakup: TaxBreakup {
            taxable: [0.0, 1000.0, 0.0, 0.0, 0.0],
            tax: [0.0, 160.0, 0.0, 0.0, 0.0],
        },
        items: vec![InvoiceLine {
            idx: 1,
            item_name: "Widget".into(),
            etims_item_code: None,
            qty: 2.0,
            rate: 500.0,
            amount: 1000.0,
            discount_rate: 0.0,
            discount_amount: 0.0,
            taxable_amount: 1000.0,
            tax_amount: 160.0,
            codes: LineItemCodes {
                classification: Some("73131600".into()),
                packaging_unit: Some("NT".into()),
                quantity_unit: Some("U".into()),
                taxation_type: Some("B".into()),
            },
        }],
        owner: "jane@example.com".into(),
        modified_by: "jane@example.com".into(),
        modified: format!("2024-03-07 14:05:09 {name}"),
        submitted: false,
    }
}

fn accepted_sale_body() -> serde_json::Value {
    serde_json::json!({
        "resultCd": "000",
        "resultMsg": "Succeeded",
        "resultDt": "20240307140509",
        "data": {
            "curRcptNo": 42,
            "totRcptNo": 99,
            "intrlData": "INTERNAL-DATA",
            "rcptSign": "ABC123",
            "sdcDateTime": "20240307140509"
        }
    })
}

fn audit_statuses(db: &DbManager) -> Vec<String> {
    let conn = db.get_connection().unwrap();
    let mut stmt = conn.prepare("SELECT status FROM audit_log ORDER BY created_at").unwrap();
    let rows = stmt.query_map([], |row| row.get::<_, String>(0)).unwrap();
    rows.collect::<rusqlite::Result<Vec<_>>>().unwrap()
}

#[tokio::test]
async fn accepted_sale_uses_the_next_sequence_and_stores_the_receipt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/saveTrnsSalesOsdc"))
        .and(header("tin", "A123456789B"))
        .and(header("bhfId", "00"))
        .and(header("cmcKey", "CMC-KEY"))
        .and(body_partial_json(serde_json::json!({"invcNo": 42})))
        .respond_with(ResponseTemplate::new(200).set_body_json(accepted_sale_body()))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri()).await;
    h.state.store_session_key(&h.scope, "CMC-KEY").await.unwrap();
    // The device has already been issued 41 accepted invoices.
    h.state.commit_sales_sequence(&h.scope, 41).await.unwrap();
    let doc = invoice("SI-0042");
    h.documents.stage_invoice(InvoiceKind::Sales, &doc).await.unwrap();

    let status = h.service.submit_sales_invoice(&doc, InvoiceKind::Sales, None).await.unwrap();
    assert_eq!(status, SubmissionStatus::Submitted { sequence: Some(42) });
    assert_eq!(h.state.most_recent_sales_sequence(&h.scope).await.unwrap(), 42);

    let receipt_json = h.documents.receipt_json("SI-0042").await.unwrap().unwrap();
    let receipt: ReceiptFields = serde_json::from_str(&receipt_json).unwrap();
    assert_eq!(receipt.receipt_signature, "ABC123");
    assert_eq!(receipt.sequence, 42);
    assert!(receipt.verification_url.contains("Data=A123456789B00ABC123"));

    assert!(h.documents.pending_invoices().await.unwrap().is_empty());
    assert_eq!(audit_statuses(&h.db), vec!["Completed".to_string()]);
}

#[tokio::test]
async fn rejected_sale_leaves_sequence_and_backlog_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/saveTrnsSalesOsdc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "resultCd": "001",
            "resultMsg": "Invalid item code",
            "resultDt": "20240307140509"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri()).await;
    h.state.store_session_key(&h.scope, "CMC-KEY").await.unwrap();
    h.state.commit_sales_sequence(&h.scope, 41).await.unwrap();
    let doc = invoice("SI-0042");
    h.documents.stage_invoice(InvoiceKind::Sales, &doc).await.unwrap();

    let status = h.service.submit_sales_invoice(&doc, InvoiceKind::Sales, None).await.unwrap();
    assert_eq!(
        status,
        SubmissionStatus::Rejected { code: "001".into(), message: "Invalid item code".into() }
    );

    assert_eq!(h.state.most_recent_sales_sequence(&h.scope).await.unwrap(), 41);
    assert_eq!(h.documents.pending_invoices().await.unwrap().len(), 1);
    assert!(h.documents.receipt_json("SI-0042").await.unwrap().is_none());
    assert_eq!(audit_statuses(&h.db), vec!["Failed".to_string()]);

    let conn = h.db.get_connection().unwrap();
    let (code, message): (String, String) = conn
        .query_row(
            "SELECT rejection_code, rejection_message FROM documents WHERE name = 'SI-0042'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(code, "001");
    assert_eq!(message, "Invalid item code");
}

#[tokio::test]
async fn transport_failure_writes_nothing_back() {
    // Nothing listens here; the connection is refused.
    let h = harness("http://127.0.0.1:9").await;
    h.state.store_session_key(&h.scope, "CMC-KEY").await.unwrap();
    h.state.commit_sales_sequence(&h.scope, 41).await.unwrap();
    let doc = invoice("SI-0042");
    h.documents.stage_invoice(InvoiceKind::Sales, &doc).await.unwrap();

    let err = h.service.submit_sales_invoice(&doc, InvoiceKind::Sales, None).await.unwrap_err();
    assert!(matches!(err, EtimsError::Transport(_)));

    assert_eq!(h.state.most_recent_sales_sequence(&h.scope).await.unwrap(), 41);
    assert_eq!(h.documents.pending_invoices().await.unwrap().len(), 1);
    assert!(h.documents.receipt_json("SI-0042").await.unwrap().is_none());
    assert_eq!(audit_statuses(&h.db), vec!["Failed".to_string()]);
}

#[tokio::test]
async fn device_initialization_stores_the_issued_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/selectInitOsdcInfo"))
        .and(body_partial_json(serde_json::json!({
            "tin": "A123456789B",
            "bhfId": "00",
            "dvcSrlNo": "SN-0001"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "resultCd": "000",
            "resultMsg": "Succeeded",
            "resultDt": "20240307140509",
            "data": {"info": {"cmcKey": "FRESH-KEY"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri()).await;
    h.service.initialize_device().await.unwrap();

    assert_eq!(h.state.session_key(&h.scope).await.unwrap().as_deref(), Some("FRESH-KEY"));
}

#[tokio::test]
async fn code_refresh_ingests_details_and_advances_the_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/selectCodeList"))
        .and(body_partial_json(serde_json::json!({"lastReqDt": "20000101000000"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
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
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/selectItemClsList"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "resultCd": "000",
            "resultMsg": "Succeeded",
            "resultDt": "20240307140510",
            "data": {
                "itemClsList": [{
                    "itemClsCd": "73131600",
                    "itemClsLvl": 4,
                    "itemClsNm": "Fasteners",
                    "taxTyCd": "B",
                    "useYn": "Y"
                }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server.uri()).await;
    h.state.store_session_key(&h.scope, "CMC-KEY").await.unwrap();

    h.service.refresh_code_lists().await.unwrap();

    let conn = h.db.get_connection().unwrap();
    let codes: i64 =
        conn.query_row("SELECT COUNT(*) FROM code_details", [], |row| row.get(0)).unwrap();
    assert_eq!(codes, 2);
    let classifications: i64 = conn
        .query_row("SELECT COUNT(*) FROM item_classifications", [], |row| row.get(0))
        .unwrap();
    assert_eq!(classifications, 1);

    assert_eq!(
        h.state.last_request_date(&h.scope, ops::CODE_SEARCH).await.unwrap(),
        "20240307140509"
    );
    assert_eq!(
        h.state.last_request_date(&h.scope, ops::ITEM_CLS_SEARCH).await.unwrap(),
        "20240307140510"
    );
}
