//! The dispatch pipeline: one envelope in, exactly one resolved outcome out.
//!
//! Every outbound exchange follows the same shape: persist a pending audit
//! record, perform the HTTP exchange, hand the response to exactly one of
//! the success/failure handlers, then finalize the audit record exactly
//! once. A transport failure resolves the exchange without invoking either
//! handler.

use std::sync::Arc;

use tracing::{instrument, warn};

use etims_domain::types::{
    AuditRecord, AuditStatus, DocumentRef, EtimsResponse, RequestHeaders, SequenceScope,
};
use etims_domain::{EtimsError, Result};

use crate::outcome::OutcomeHandler;
use crate::ports::{AuditTrail, EtimsState, TaxGateway};

/// One fully-described outbound call, immutable once built.
///
/// A fresh envelope is built per call; nothing here is shared or reused
/// between submissions.
#[derive(Debug, Clone)]
pub struct SubmissionEnvelope {
    /// Logical operation name, used for the last-request-date cursor.
    pub operation: String,
    /// Fully resolved URL (server base + route path).
    pub url: String,
    pub headers: RequestHeaders,
    pub payload: serde_json::Value,
    /// Host document behind the call, for the audit trail.
    pub reference: DocumentRef,
    pub scope: SequenceScope,
}

/// Step-wise construction of a [`SubmissionEnvelope`]; building with a
/// mandatory part missing is a setup error, reported before any network
/// traffic happens.
#[derive(Debug, Default)]
pub struct EnvelopeBuilder {
    operation: Option<String>,
    url: Option<String>,
    headers: Option<RequestHeaders>,
    payload: Option<serde_json::Value>,
    reference: DocumentRef,
    scope: Option<SequenceScope>,
}

impl EnvelopeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn headers(mut self, headers: RequestHeaders) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn payload<T: serde::Serialize>(mut self, payload: &T) -> Result<Self> {
        self.payload = Some(
            serde_json::to_value(payload)
                .map_err(|e| EtimsError::Internal(format!("unserializable payload: {e}")))?,
        );
        Ok(self)
    }

    pub fn reference(mut self, reference: DocumentRef) -> Self {
        self.reference = reference;
        self
    }

    pub fn scope(mut self, scope: SequenceScope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn build(self) -> Result<SubmissionEnvelope> {
        let missing = |field: &str| EtimsError::Config(format!("envelope is missing {field}"));
        Ok(SubmissionEnvelope {
            operation: self.operation.ok_or_else(|| missing("an operation"))?,
            url: self.url.ok_or_else(|| missing("a url"))?,
            headers: self.headers.ok_or_else(|| missing("request headers"))?,
            payload: self.payload.ok_or_else(|| missing("a payload"))?,
            reference: self.reference,
            scope: self.scope.ok_or_else(|| missing("a sequence scope"))?,
        })
    }
}

/// How a completed exchange resolved. Both variants mean the provider
/// answered; transport failures surface as `Err` instead.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// `resultCd == "000"`; the success handler has run and the operation
    /// cursor has advanced.
    Accepted(EtimsResponse),
    /// Business-level rejection; the failure handler has run.
    Rejected(EtimsResponse),
}

/// Runs envelopes through the exchange pipeline.
pub struct Dispatcher {
    gateway: Arc<dyn TaxGateway>,
    audit: Arc<dyn AuditTrail>,
    state: Arc<dyn EtimsState>,
}

impl Dispatcher {
    pub fn new(
        gateway: Arc<dyn TaxGateway>,
        audit: Arc<dyn AuditTrail>,
        state: Arc<dyn EtimsState>,
    ) -> Self {
        Self { gateway, audit, state }
    }

    /// Execute one exchange.
    ///
    /// On a provider answer, exactly one of the handler's callbacks runs and
    /// the audit record reaches exactly one terminal status. On a transport
    /// failure neither callback runs, the audit record is failed with the
    /// transport error, and the error propagates to the caller.
    #[instrument(skip(self, envelope, handler), fields(operation = %envelope.operation, scope = %envelope.scope))]
    pub async fn dispatch(
        &self,
        envelope: SubmissionEnvelope,
        handler: &dyn OutcomeHandler,
    ) -> Result<DispatchOutcome> {
        let record = AuditRecord::outbound(
            &envelope.url,
            serde_json::to_string(&envelope.headers)
                .map_err(|e| EtimsError::Internal(format!("unserializable headers: {e}")))?,
            envelope.payload.to_string(),
            envelope.reference.clone(),
        );
        self.audit.open(&record).await?;

        let response = match self
            .gateway
            .exchange(&envelope.url, &envelope.headers, &envelope.payload)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "exchange failed before the provider answered");
                self.audit
                    .finalize(&record.id, AuditStatus::Failed, None, Some(&err.to_string()))
                    .await?;
                return Err(err);
            }
        };

        let output = serde_json::to_string(&response)
            .map_err(|e| EtimsError::Internal(format!("unserializable response: {e}")))?;

        if response.is_success() {
            let mut resolution = handler.on_success(&response).await;
            if resolution.is_ok() {
                resolution = self
                    .state
                    .advance_last_request_date(
                        &envelope.scope,
                        &envelope.operation,
                        &response.result_dt,
                    )
                    .await;
            }
            match resolution {
                Ok(()) => {
                    self.audit
                        .finalize(&record.id, AuditStatus::Completed, Some(&output), None)
                        .await?;
                    Ok(DispatchOutcome::Accepted(response))
                }
                Err(err) => {
                    warn!(error = %err, "local handling failed after the provider accepted");
                    self.audit
                        .finalize(
                            &record.id,
                            AuditStatus::Failed,
                            Some(&output),
                            Some(&err.to_string()),
                        )
                        .await?;
                    Err(err)
                }
            }
        } else {
            if response.is_session_key_rejection() {
                warn!(
                    result_cd = %response.result_cd,
                    "provider rejected the communication key; the device needs re-initialisation"
                );
            }
            let resolution = handler.on_failure(&response).await;
            let error = format!("{} {}", response.result_cd, response.result_msg);
            self.audit
                .finalize(&record.id, AuditStatus::Failed, Some(&output), Some(&error))
                .await?;
            resolution?;
            Ok(DispatchOutcome::Rejected(response))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use etims_domain::Environment;

    use super::*;

    struct StubGateway {
        response: Mutex<Option<Result<EtimsResponse>>>,
        calls: Mutex<usize>,
    }

    impl StubGateway {
        fn answering(response: Result<EtimsResponse>) -> Self {
            Self { response: Mutex::new(Some(response)), calls: Mutex::new(0) }
        }
    }

    #[async_trait]
    impl TaxGateway for StubGateway {
        async fn exchange(
            &self,
            _url: &str,
            _headers: &RequestHeaders,
            _body: &serde_json::Value,
        ) -> Result<EtimsResponse> {
            *self.calls.lock().unwrap() += 1;
            self.response.lock().unwrap().take().unwrap()
        }
    }

    #[derive(Default)]
    struct RecordingAudit {
        opened: Mutex<Vec<String>>,
        finalized: Mutex<Vec<(String, AuditStatus)>>,
    }

    #[async_trait]
    impl AuditTrail for RecordingAudit {
        async fn open(&self, record: &AuditRecord) -> Result<()> {
            self.opened.lock().unwrap().push(record.id.clone());
            Ok(())
        }

        async fn finalize(
            &self,
            id: &str,
            status: AuditStatus,
            _output: Option<&str>,
            _error: Option<&str>,
        ) -> Result<()> {
            self.finalized.lock().unwrap().push((id.to_string(), status));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingState {
        cursors: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl EtimsState for RecordingState {
        async fn most_recent_sales_sequence(&self, _scope: &SequenceScope) -> Result<i64> {
            Ok(0)
        }

        async fn commit_sales_sequence(&self, _scope: &SequenceScope, _sequence: i64) -> Result<()> {
            Ok(())
        }

        async fn session_key(&self, _scope: &SequenceScope) -> Result<Option<String>> {
            Ok(None)
        }

        async fn store_session_key(&self, _scope: &SequenceScope, _key: &str) -> Result<()> {
            Ok(())
        }

        async fn last_request_date(
            &self,
            _scope: &SequenceScope,
            _operation: &str,
        ) -> Result<String> {
            Ok(etims_domain::constants::EPOCH_REQUEST_DATE.to_string())
        }

        async fn advance_last_request_date(
            &self,
            _scope: &SequenceScope,
            operation: &str,
            result_dt: &str,
        ) -> Result<()> {
            self.cursors.lock().unwrap().push((operation.to_string(), result_dt.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingHandler {
        successes: Mutex<usize>,
        failures: Mutex<usize>,
    }

    #[async_trait]
    impl OutcomeHandler for CountingHandler {
        async fn on_success(&self, _response: &EtimsResponse) -> Result<()> {
            *self.successes.lock().unwrap() += 1;
            Ok(())
        }

        async fn on_failure(&self, _response: &EtimsResponse) -> Result<()> {
            *self.failures.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn envelope() -> SubmissionEnvelope {
        EnvelopeBuilder::new()
            .operation("TrnsSalesSaveWrReq")
            .url("http://localhost/saveTrnsSalesOsdc")
            .headers(RequestHeaders::new("A123456789B", "00", "KEY"))
            .payload(&serde_json::json!({"invcNo": 42}))
            .unwrap()
            .reference(DocumentRef::new("Sales Invoice", "SI-1"))
            .scope(SequenceScope::new("A123456789B", "00", Environment::Sandbox))
            .build()
            .unwrap()
    }

    fn accepted() -> EtimsResponse {
        serde_json::from_str(
            r#"{"resultCd":"000","resultMsg":"Succeeded","resultDt":"20240307140509"}"#,
        )
        .unwrap()
    }

    fn rejected() -> EtimsResponse {
        serde_json::from_str(
            r#"{"resultCd":"001","resultMsg":"Invalid item code","resultDt":"20240307140509"}"#,
        )
        .unwrap()
    }

    fn pipeline(
        gateway: StubGateway,
    ) -> (Dispatcher, Arc<RecordingAudit>, Arc<RecordingState>) {
        let audit = Arc::new(RecordingAudit::default());
        let state = Arc::new(RecordingState::default());
        let dispatcher = Dispatcher::new(Arc::new(gateway), audit.clone(), state.clone());
        (dispatcher, audit, state)
    }

    #[tokio::test]
    async fn acceptance_runs_success_handler_and_advances_cursor() {
        let (dispatcher, audit, state) = pipeline(StubGateway::answering(Ok(accepted())));
        let handler = CountingHandler::default();

        let outcome = dispatcher.dispatch(envelope(), &handler).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::Accepted(_)));
        assert_eq!(*handler.successes.lock().unwrap(), 1);
        assert_eq!(*handler.failures.lock().unwrap(), 0);

        let cursors = state.cursors.lock().unwrap();
        assert_eq!(cursors.as_slice(), &[("TrnsSalesSaveWrReq".into(), "20240307140509".into())]);

        let finalized = audit.finalized.lock().unwrap();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].1, AuditStatus::Completed);
    }

    #[tokio::test]
    async fn rejection_runs_failure_handler_only() {
        let (dispatcher, audit, state) = pipeline(StubGateway::answering(Ok(rejected())));
        let handler = CountingHandler::default();

        let outcome = dispatcher.dispatch(envelope(), &handler).await.unwrap();
        assert!(matches!(outcome, DispatchOutcome::Rejected(_)));
        assert_eq!(*handler.successes.lock().unwrap(), 0);
        assert_eq!(*handler.failures.lock().unwrap(), 1);
        assert!(state.cursors.lock().unwrap().is_empty());

        let finalized = audit.finalized.lock().unwrap();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].1, AuditStatus::Failed);
    }

    #[tokio::test]
    async fn transport_failure_invokes_neither_handler() {
        let (dispatcher, audit, state) =
            pipeline(StubGateway::answering(Err(EtimsError::Transport("timed out".into()))));
        let handler = CountingHandler::default();

        let err = dispatcher.dispatch(envelope(), &handler).await.unwrap_err();
        assert!(matches!(err, EtimsError::Transport(_)));
        assert_eq!(*handler.successes.lock().unwrap(), 0);
        assert_eq!(*handler.failures.lock().unwrap(), 0);
        assert!(state.cursors.lock().unwrap().is_empty());

        let finalized = audit.finalized.lock().unwrap();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].1, AuditStatus::Failed);
    }

    struct FailingHandler;

    #[async_trait]
    impl OutcomeHandler for FailingHandler {
        async fn on_success(&self, _response: &EtimsResponse) -> Result<()> {
            Err(EtimsError::Database("receipt write-back failed".into()))
        }

        async fn on_failure(&self, _response: &EtimsResponse) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn handler_error_still_finalizes_the_audit_record() {
        let (dispatcher, audit, state) = pipeline(StubGateway::answering(Ok(accepted())));

        let err = dispatcher.dispatch(envelope(), &FailingHandler).await.unwrap_err();
        assert!(matches!(err, EtimsError::Database(_)));
        assert!(state.cursors.lock().unwrap().is_empty());

        let finalized = audit.finalized.lock().unwrap();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].1, AuditStatus::Failed);
    }

    #[tokio::test]
    async fn audit_record_opens_before_the_exchange() {
        let (dispatcher, audit, _state) = pipeline(StubGateway::answering(Ok(accepted())));
        dispatcher.dispatch(envelope(), &CountingHandler::default()).await.unwrap();
        let opened = audit.opened.lock().unwrap();
        let finalized = audit.finalized.lock().unwrap();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0], finalized[0].0);
    }

    #[test]
    fn builder_rejects_missing_parts() {
        let err = EnvelopeBuilder::new()
            .operation("CodeSearchReq")
            .url("http://localhost/selectCodeList")
            .build()
            .unwrap_err();
        assert!(matches!(err, EtimsError::Config(_)));
        assert!(err.to_string().contains("request headers"));
    }
}
