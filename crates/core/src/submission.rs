//! The submission service: entry points the host calls when documents are
//! submitted and when scheduled refreshes fire.
//!
//! Sequence discipline lives here. Sales submissions read the next sequence
//! number under a per-scope lock and hold that lock across the exchange, so
//! two sales for the same device can never race each other; the number is
//! committed only when the provider accepts. A per-document in-flight guard
//! keeps retries of the same snapshot from stacking up.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument, warn};

use etims_domain::constants::ops;
use etims_domain::types::{
    BomDocument, CustomerDocument, CustomerSearchPayload, CustomerSearchData,
    DeviceInitData, DeviceVerificationPayload, DocumentRef, EtimsResponse, InvoiceDocument,
    InvoiceKind, ItemDocument, PurchaseInvoiceDocument, RequestHeaders, SequenceScope,
    SinceRequestPayload, StockMovementDocument, UserDocument,
};
use etims_domain::{ConnectorConfig, EtimsError, Result};

use crate::dispatch::{DispatchOutcome, Dispatcher, EnvelopeBuilder, SubmissionEnvelope};
use crate::outcome::{
    BranchListOutcome, CodeListOutcome, DocumentUpdate, ImportedItemsOutcome,
    ItemClassificationsOutcome, MarkSubmittedOutcome, NoticesOutcome, OutcomeHandler,
    PurchasesOutcome, SalesOutcome, StockMovesOutcome, TransactionKind,
};
use crate::payload::{
    build_branch_customer, build_branch_user, build_item_composition, build_item_registration,
    build_purchase_invoice, build_sales_invoice, build_stock_movement,
};
use crate::ports::{
    AuditTrail, CodeListStore, DocumentStore, EtimsState, RegistryStore, RouteTable, TaxGateway,
};

/// How a submission request resolved from the caller's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionStatus {
    /// The provider accepted; any consumed sequence number is included.
    Submitted { sequence: Option<i64> },
    /// Business-level rejection; the document stays unsubmitted.
    Rejected { code: String, message: String },
    /// The document was already flagged submitted; nothing was sent.
    AlreadySubmitted,
    /// The same document snapshot is mid-flight; nothing was sent.
    InFlight,
    /// The document is not eligible for this operation.
    Skipped { reason: String },
}

/// Counts from one resend pass over the staged backlog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResendReport {
    pub attempted: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl ResendReport {
    fn tally(&mut self, result: Result<SubmissionStatus>, document: &str) {
        self.attempted += 1;
        match result {
            Ok(SubmissionStatus::Submitted { .. }) => self.accepted += 1,
            Ok(SubmissionStatus::Rejected { .. }) => self.rejected += 1,
            Ok(_) => {}
            Err(err) => {
                self.failed += 1;
                warn!(document, error = %err, "resend attempt failed");
            }
        }
    }
}

/// Handler for exchanges whose success effect is handled by the caller
/// (device init, ad-hoc lookups).
struct LogOnlyOutcome {
    operation: &'static str,
}

#[async_trait]
impl OutcomeHandler for LogOnlyOutcome {
    async fn on_success(&self, _response: &EtimsResponse) -> Result<()> {
        Ok(())
    }

    async fn on_failure(&self, response: &EtimsResponse) -> Result<()> {
        warn!(
            operation = self.operation,
            result_cd = %response.result_cd,
            result_msg = %response.result_msg,
            "exchange rejected"
        );
        Ok(())
    }
}

/// Removes its job key from the in-flight set when dropped, so the guard
/// releases on every exit path.
struct InFlightGuard {
    key: String,
    set: Arc<StdMutex<HashSet<String>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.key);
    }
}

fn job_key(name: &str, modified: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(modified.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct SubmissionService {
    config: ConnectorConfig,
    dispatcher: Dispatcher,
    state: Arc<dyn EtimsState>,
    routes: Arc<dyn RouteTable>,
    documents: Arc<dyn DocumentStore>,
    codes: Arc<dyn CodeListStore>,
    registry: Arc<dyn RegistryStore>,
    scope_locks: StdMutex<HashMap<SequenceScope, Arc<AsyncMutex<()>>>>,
    in_flight: Arc<StdMutex<HashSet<String>>>,
}

impl SubmissionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ConnectorConfig,
        gateway: Arc<dyn TaxGateway>,
        audit: Arc<dyn AuditTrail>,
        state: Arc<dyn EtimsState>,
        routes: Arc<dyn RouteTable>,
        documents: Arc<dyn DocumentStore>,
        codes: Arc<dyn CodeListStore>,
        registry: Arc<dyn RegistryStore>,
    ) -> Result<Self> {
        config.validate()?;
        let dispatcher = Dispatcher::new(gateway, audit, state.clone());
        Ok(Self {
            config,
            dispatcher,
            state,
            routes,
            documents,
            codes,
            registry,
            scope_locks: StdMutex::new(HashMap::new()),
            in_flight: Arc::new(StdMutex::new(HashSet::new())),
        })
    }

    fn scope(&self) -> SequenceScope {
        SequenceScope::new(&self.config.tin, &self.config.branch_id, self.config.environment)
    }

    /// Serialization handle for a scope; one lazily-created mutex per scope.
    fn scope_lock(&self, scope: &SequenceScope) -> Arc<AsyncMutex<()>> {
        let mut locks = self.scope_locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(scope.clone()).or_default().clone()
    }

    /// Claim the in-flight slot for a document snapshot, or report that an
    /// identical submission is already running.
    fn claim_in_flight(&self, name: &str, modified: &str) -> Option<InFlightGuard> {
        let key = job_key(name, modified);
        let mut set = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard { key, set: self.in_flight.clone() })
    }

    async fn resolve_url(&self, operation: &str) -> Result<String> {
        let path = self.routes.path_for(operation).await?;
        Ok(format!("{}{}", self.config.server_url(), path))
    }

    /// Authenticated headers; an error here means the device was never
    /// initialised for this scope.
    async fn headers(&self) -> Result<RequestHeaders> {
        let scope = self.scope();
        let key = self.state.session_key(&scope).await?.ok_or_else(|| {
            EtimsError::Config(format!(
                "no communication key for {scope}; run device initialisation first"
            ))
        })?;
        Ok(RequestHeaders::new(&self.config.tin, &self.config.branch_id, key))
    }

    async fn envelope<T: serde::Serialize>(
        &self,
        operation: &str,
        payload: &T,
        reference: DocumentRef,
    ) -> Result<SubmissionEnvelope> {
        EnvelopeBuilder::new()
            .operation(operation)
            .url(self.resolve_url(operation).await?)
            .headers(self.headers().await?)
            .payload(payload)?
            .reference(reference)
            .scope(self.scope())
            .build()
    }

    fn status_of(outcome: DispatchOutcome, sequence: Option<i64>) -> SubmissionStatus {
        match outcome {
            DispatchOutcome::Accepted(_) => SubmissionStatus::Submitted { sequence },
            DispatchOutcome::Rejected(response) => SubmissionStatus::Rejected {
                code: response.result_cd,
                message: response.result_msg,
            },
        }
    }

    /// Verify the device with the provider and store the communication key
    /// it issues. This is the one unauthenticated exchange.
    #[instrument(skip(self))]
    pub async fn initialize_device(&self) -> Result<()> {
        let payload = DeviceVerificationPayload {
            tin: self.config.tin.clone(),
            bhf_id: self.config.branch_id.clone(),
            dvc_srl_no: self.config.device_serial.clone(),
        };
        let envelope = EnvelopeBuilder::new()
            .operation(ops::DEVICE_VERIFICATION)
            .url(self.resolve_url(ops::DEVICE_VERIFICATION).await?)
            .headers(RequestHeaders::unauthenticated(&self.config.tin, &self.config.branch_id))
            .payload(&payload)?
            .reference(DocumentRef::none())
            .scope(self.scope())
            .build()?;

        let handler = LogOnlyOutcome { operation: ops::DEVICE_VERIFICATION };
        match self.dispatcher.dispatch(envelope, &handler).await? {
            DispatchOutcome::Accepted(response) => {
                let data: DeviceInitData = response.parse_data()?;
                self.state.store_session_key(&self.scope(), &data.info.cmc_key).await?;
                info!("device verified; communication key stored");
                Ok(())
            }
            DispatchOutcome::Rejected(response) => Err(EtimsError::Config(format!(
                "device verification rejected: {} {}",
                response.result_cd, response.result_msg
            ))),
        }
    }

    /// Submit a sales or POS invoice, consuming the next sequence number on
    /// acceptance only. Credit notes pass the accepted sequence number of
    /// the invoice they reverse.
    #[instrument(skip(self, doc), fields(document = %doc.name))]
    pub async fn submit_sales_invoice(
        &self,
        doc: &InvoiceDocument,
        kind: InvoiceKind,
        original_sequence: Option<i64>,
    ) -> Result<SubmissionStatus> {
        if doc.submitted {
            return Ok(SubmissionStatus::AlreadySubmitted);
        }
        if doc.is_return && original_sequence.is_none() {
            return Err(EtimsError::InvalidInput(format!(
                "credit note {} has no accepted original sequence",
                doc.name
            )));
        }
        let Some(_guard) = self.claim_in_flight(&doc.name, &doc.modified) else {
            return Ok(SubmissionStatus::InFlight);
        };

        let scope = SequenceScope::new(&self.config.tin, &doc.branch_id, self.config.environment);
        let lock = self.scope_lock(&scope);
        let _serialized = lock.lock().await;

        let next = self.state.most_recent_sales_sequence(&scope).await? + 1;
        let payload = build_sales_invoice(doc, next, original_sequence.unwrap_or(0))?;

        let transaction = match kind {
            InvoiceKind::Sales => TransactionKind::SalesInvoice,
            InvoiceKind::Pos => TransactionKind::PosInvoice,
        };
        let envelope = self
            .envelope(ops::SALES_SAVE, &payload, DocumentRef::new(kind.doctype(), &doc.name))
            .await?;
        let handler = SalesOutcome::new(
            self.documents.clone(),
            self.state.clone(),
            transaction,
            &doc.name,
            scope,
            next,
            self.config.environment.receipt_url(),
        );

        let outcome = self.dispatcher.dispatch(envelope, &handler).await?;
        Ok(Self::status_of(outcome, Some(next)))
    }

    /// Submit a purchase invoice. Returns and invoices that do not touch
    /// stock are not reported.
    #[instrument(skip(self, doc), fields(document = %doc.name))]
    pub async fn submit_purchase_invoice(
        &self,
        doc: &PurchaseInvoiceDocument,
    ) -> Result<SubmissionStatus> {
        if doc.submitted {
            return Ok(SubmissionStatus::AlreadySubmitted);
        }
        if doc.is_return || !doc.update_stock {
            return Ok(SubmissionStatus::Skipped {
                reason: "only stock-updating, non-return purchases are reported".into(),
            });
        }
        let Some(_guard) = self.claim_in_flight(&doc.name, &doc.modified) else {
            return Ok(SubmissionStatus::InFlight);
        };

        let payload = build_purchase_invoice(doc)?;
        let envelope = self
            .envelope(
                ops::PURCHASE_SAVE,
                &payload,
                DocumentRef::new(TransactionKind::PurchaseInvoice.doctype(), &doc.name),
            )
            .await?;
        let handler = MarkSubmittedOutcome::new(
            self.documents.clone(),
            TransactionKind::PurchaseInvoice,
            &doc.name,
        );

        let outcome = self.dispatcher.dispatch(envelope, &handler).await?;
        Ok(Self::status_of(outcome, None))
    }

    /// Report a stock movement derived from a host stock ledger entry.
    #[instrument(skip(self, doc), fields(document = %doc.name))]
    pub async fn submit_stock_movement(
        &self,
        doc: &StockMovementDocument,
    ) -> Result<SubmissionStatus> {
        if doc.submitted {
            return Ok(SubmissionStatus::AlreadySubmitted);
        }
        let Some(_guard) = self.claim_in_flight(&doc.name, &doc.modified) else {
            return Ok(SubmissionStatus::InFlight);
        };

        let payload = build_stock_movement(doc)?;
        let envelope = self
            .envelope(
                ops::STOCK_IO_SAVE,
                &payload,
                DocumentRef::new(TransactionKind::StockMovement.doctype(), &doc.name),
            )
            .await?;
        let handler = MarkSubmittedOutcome::new(
            self.documents.clone(),
            TransactionKind::StockMovement,
            &doc.name,
        );

        let outcome = self.dispatcher.dispatch(envelope, &handler).await?;
        Ok(Self::status_of(outcome, None))
    }

    /// Register an item with the provider.
    #[instrument(skip(self, doc), fields(document = %doc.name))]
    pub async fn submit_item_registration(&self, doc: &ItemDocument) -> Result<SubmissionStatus> {
        if doc.registered {
            return Ok(SubmissionStatus::AlreadySubmitted);
        }
        let Some(_guard) = self.claim_in_flight(&doc.name, &doc.modified) else {
            return Ok(SubmissionStatus::InFlight);
        };

        let payload = build_item_registration(doc)?;
        let envelope = self
            .envelope(
                ops::ITEM_SAVE,
                &payload,
                DocumentRef::new(TransactionKind::ItemRegistration.doctype(), &doc.name),
            )
            .await?;
        let handler = MarkSubmittedOutcome::new(
            self.documents.clone(),
            TransactionKind::ItemRegistration,
            &doc.name,
        );

        let outcome = self.dispatcher.dispatch(envelope, &handler).await?;
        Ok(Self::status_of(outcome, None))
    }

    /// Submit a bill of materials, one composition call per component. The
    /// document is flagged submitted only after every component is accepted.
    #[instrument(skip(self, doc), fields(document = %doc.name))]
    pub async fn submit_item_composition(&self, doc: &BomDocument) -> Result<SubmissionStatus> {
        if doc.submitted {
            return Ok(SubmissionStatus::AlreadySubmitted);
        }
        let Some(_guard) = self.claim_in_flight(&doc.name, &doc.modified) else {
            return Ok(SubmissionStatus::InFlight);
        };

        let reference = DocumentRef::new(TransactionKind::ItemComposition.doctype(), &doc.name);
        for payload in build_item_composition(doc)? {
            let envelope =
                self.envelope(ops::ITEM_COMPOSITION_SAVE, &payload, reference.clone()).await?;
            let handler = LogOnlyOutcome { operation: ops::ITEM_COMPOSITION_SAVE };
            if let DispatchOutcome::Rejected(response) =
                self.dispatcher.dispatch(envelope, &handler).await?
            {
                self.documents
                    .apply(&DocumentUpdate::RecordRejection {
                        doctype: TransactionKind::ItemComposition.doctype(),
                        name: doc.name.clone(),
                        code: response.result_cd.clone(),
                        message: response.result_msg.clone(),
                    })
                    .await?;
                return Ok(SubmissionStatus::Rejected {
                    code: response.result_cd,
                    message: response.result_msg,
                });
            }
        }

        self.documents
            .apply(&DocumentUpdate::MarkSubmitted {
                doctype: TransactionKind::ItemComposition.doctype(),
                name: doc.name.clone(),
            })
            .await?;
        Ok(SubmissionStatus::Submitted { sequence: None })
    }

    /// Register a customer against the branch.
    #[instrument(skip(self, doc), fields(document = %doc.name))]
    pub async fn submit_branch_customer(&self, doc: &CustomerDocument) -> Result<SubmissionStatus> {
        if doc.submitted {
            return Ok(SubmissionStatus::AlreadySubmitted);
        }
        let Some(_guard) = self.claim_in_flight(&doc.name, &doc.modified) else {
            return Ok(SubmissionStatus::InFlight);
        };

        let payload = build_branch_customer(doc)?;
        let envelope = self
            .envelope(
                ops::BRANCH_CUSTOMER_SAVE,
                &payload,
                DocumentRef::new(TransactionKind::BranchCustomer.doctype(), &doc.name),
            )
            .await?;
        let handler = MarkSubmittedOutcome::new(
            self.documents.clone(),
            TransactionKind::BranchCustomer,
            &doc.name,
        );

        let outcome = self.dispatcher.dispatch(envelope, &handler).await?;
        Ok(Self::status_of(outcome, None))
    }

    /// Register an ERP user against the branch.
    #[instrument(skip(self, doc), fields(document = %doc.name))]
    pub async fn submit_branch_user(&self, doc: &UserDocument) -> Result<SubmissionStatus> {
        if doc.submitted {
            return Ok(SubmissionStatus::AlreadySubmitted);
        }
        let Some(_guard) = self.claim_in_flight(&doc.name, &doc.modified) else {
            return Ok(SubmissionStatus::InFlight);
        };

        let payload = build_branch_user(doc)?;
        let envelope = self
            .envelope(
                ops::BRANCH_USER_SAVE,
                &payload,
                DocumentRef::new(TransactionKind::BranchUser.doctype(), &doc.name),
            )
            .await?;
        let handler =
            MarkSubmittedOutcome::new(self.documents.clone(), TransactionKind::BranchUser, &doc.name);

        let outcome = self.dispatcher.dispatch(envelope, &handler).await?;
        Ok(Self::status_of(outcome, None))
    }

    /// Fetch-since exchange shared by all search operations.
    async fn fetch_since(&self, operation: &str, handler: &dyn OutcomeHandler) -> Result<()> {
        let cursor = self.state.last_request_date(&self.scope(), operation).await?;
        let payload = SinceRequestPayload { last_req_dt: cursor };
        let envelope = self.envelope(operation, &payload, DocumentRef::none()).await?;
        self.dispatcher.dispatch(envelope, handler).await?;
        Ok(())
    }

    /// Refresh reference code lists and item classifications.
    #[instrument(skip(self))]
    pub async fn refresh_code_lists(&self) -> Result<()> {
        self.fetch_since(ops::CODE_SEARCH, &CodeListOutcome::new(self.codes.clone())).await?;
        self.fetch_since(
            ops::ITEM_CLS_SEARCH,
            &ItemClassificationsOutcome::new(self.codes.clone()),
        )
        .await
    }

    /// Pull administrative notices published since the last successful run.
    #[instrument(skip(self))]
    pub async fn perform_notice_search(&self) -> Result<()> {
        self.fetch_since(ops::NOTICE_SEARCH, &NoticesOutcome::new(self.registry.clone())).await
    }

    /// Pull the registered branch list.
    #[instrument(skip(self))]
    pub async fn perform_branch_search(&self) -> Result<()> {
        self.fetch_since(ops::BRANCH_SEARCH, &BranchListOutcome::new(self.registry.clone())).await
    }

    /// Pull purchases registered against the taxpayer.
    #[instrument(skip(self))]
    pub async fn perform_purchase_search(&self) -> Result<()> {
        self.fetch_since(
            ops::PURCHASE_SALES_SEARCH,
            &PurchasesOutcome::new(self.registry.clone()),
        )
        .await
    }

    /// Pull stock movements recorded by sibling branches.
    #[instrument(skip(self))]
    pub async fn perform_stock_move_search(&self) -> Result<()> {
        self.fetch_since(ops::STOCK_MOVE_SEARCH, &StockMovesOutcome::new(self.registry.clone()))
            .await
    }

    /// Pull customs-declared imported items awaiting conversion.
    #[instrument(skip(self))]
    pub async fn perform_imported_item_search(&self) -> Result<()> {
        self.fetch_since(
            ops::IMPORTED_ITEM_SEARCH,
            &ImportedItemsOutcome::new(self.registry.clone()),
        )
        .await
    }

    /// Retry every staged document the provider has not yet accepted.
    ///
    /// Transport failures and rejections are counted, logged and skipped so
    /// one bad document cannot stall the rest of the backlog. Credit notes
    /// are left alone: their original sequence mapping is host-driven.
    #[instrument(skip(self))]
    pub async fn resend_pending(&self) -> Result<ResendReport> {
        let mut report = ResendReport::default();

        for (kind, doc) in self.documents.pending_invoices().await? {
            if doc.is_return {
                continue;
            }
            report.tally(self.submit_sales_invoice(&doc, kind, None).await, &doc.name);
        }
        for doc in self.documents.pending_purchase_invoices().await? {
            report.tally(self.submit_purchase_invoice(&doc).await, &doc.name);
        }
        for doc in self.documents.pending_stock_movements().await? {
            report.tally(self.submit_stock_movement(&doc).await, &doc.name);
        }

        info!(
            attempted = report.attempted,
            accepted = report.accepted,
            rejected = report.rejected,
            failed = report.failed,
            "resend pass finished"
        );
        Ok(report)
    }

    /// Look up a taxpayer by PIN. Returns `None` when the provider rejects
    /// the lookup (unknown or deregistered PIN).
    #[instrument(skip(self))]
    pub async fn perform_customer_search(&self, tin: &str) -> Result<Option<CustomerSearchData>> {
        let payload = CustomerSearchPayload { custm_tin: tin.to_string() };
        let envelope =
            self.envelope(ops::CUSTOMER_SEARCH, &payload, DocumentRef::none()).await?;
        let handler = LogOnlyOutcome { operation: ops::CUSTOMER_SEARCH };
        match self.dispatcher.dispatch(envelope, &handler).await? {
            DispatchOutcome::Accepted(response) => Ok(Some(response.parse_data()?)),
            DispatchOutcome::Rejected(_) => Ok(None),
        }
    }
}
