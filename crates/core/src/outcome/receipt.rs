//! Submission outcome handlers for document-backed operations.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use etims_domain::types::{EtimsResponse, SalesReceiptData, SequenceScope};
use etims_domain::Result;

use crate::outcome::{DocumentUpdate, OutcomeHandler, ReceiptFields, TransactionKind};
use crate::ports::{DocumentStore, EtimsState};

/// Public receipt verification link for an accepted sale.
///
/// The portal expects one `Data` parameter concatenating taxpayer PIN,
/// branch id and receipt signature, percent-encoded.
pub fn verification_url(receipt_base: &str, tin: &str, branch_id: &str, rcpt_sign: &str) -> String {
    let data = format!("{tin}{branch_id}{rcpt_sign}");
    format!("{receipt_base}?Data={}", urlencoding::encode(&data))
}

/// Outcome handler for sales submissions.
///
/// Success commits the consumed sequence number and writes the receipt
/// fields back onto the invoice; both effects are idempotent, so replaying
/// an accepted response is harmless.
pub struct SalesOutcome {
    store: Arc<dyn DocumentStore>,
    state: Arc<dyn EtimsState>,
    kind: TransactionKind,
    document_name: String,
    scope: SequenceScope,
    /// Sequence number the payload was built with, committed only here.
    sequence: i64,
    receipt_base: String,
}

impl SalesOutcome {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        state: Arc<dyn EtimsState>,
        kind: TransactionKind,
        document_name: impl Into<String>,
        scope: SequenceScope,
        sequence: i64,
        receipt_base: impl Into<String>,
    ) -> Self {
        Self {
            store,
            state,
            kind,
            document_name: document_name.into(),
            scope,
            sequence,
            receipt_base: receipt_base.into(),
        }
    }
}

#[async_trait]
impl OutcomeHandler for SalesOutcome {
    async fn on_success(&self, response: &EtimsResponse) -> Result<()> {
        let receipt: SalesReceiptData = response.parse_data()?;

        // Commit first: even if the write-back fails, the provider has
        // consumed this sequence number and it must never be reissued.
        self.state.commit_sales_sequence(&self.scope, self.sequence).await?;

        let url = verification_url(
            &self.receipt_base,
            &self.scope.tin,
            &self.scope.branch_id,
            &receipt.rcpt_sign,
        );
        self.store
            .apply(&DocumentUpdate::SalesReceipt {
                doctype: self.kind.doctype(),
                name: self.document_name.clone(),
                receipt: ReceiptFields {
                    current_receipt_no: receipt.cur_rcpt_no,
                    total_receipt_no: receipt.tot_rcpt_no,
                    internal_data: receipt.intrl_data,
                    receipt_signature: receipt.rcpt_sign,
                    control_unit_datetime: receipt.sdc_date_time,
                    sequence: self.sequence,
                    verification_url: url,
                },
            })
            .await?;

        info!(
            document = %self.document_name,
            sequence = self.sequence,
            "sale accepted and receipt recorded"
        );
        Ok(())
    }

    async fn on_failure(&self, response: &EtimsResponse) -> Result<()> {
        warn!(
            document = %self.document_name,
            result_cd = %response.result_cd,
            result_msg = %response.result_msg,
            "sale rejected; sequence number not consumed"
        );
        self.store
            .apply(&DocumentUpdate::RecordRejection {
                doctype: self.kind.doctype(),
                name: self.document_name.clone(),
                code: response.result_cd.clone(),
                message: response.result_msg.clone(),
            })
            .await
    }
}

/// Outcome handler for submissions whose only success effect is flagging
/// the document as submitted (purchases, stock movements, master data).
pub struct MarkSubmittedOutcome {
    store: Arc<dyn DocumentStore>,
    kind: TransactionKind,
    document_name: String,
}

impl MarkSubmittedOutcome {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        kind: TransactionKind,
        document_name: impl Into<String>,
    ) -> Self {
        Self { store, kind, document_name: document_name.into() }
    }
}

#[async_trait]
impl OutcomeHandler for MarkSubmittedOutcome {
    async fn on_success(&self, _response: &EtimsResponse) -> Result<()> {
        self.store
            .apply(&DocumentUpdate::MarkSubmitted {
                doctype: self.kind.doctype(),
                name: self.document_name.clone(),
            })
            .await
    }

    async fn on_failure(&self, response: &EtimsResponse) -> Result<()> {
        warn!(
            document = %self.document_name,
            result_cd = %response.result_cd,
            result_msg = %response.result_msg,
            "submission rejected"
        );
        self.store
            .apply(&DocumentUpdate::RecordRejection {
                doctype: self.kind.doctype(),
                name: self.document_name.clone(),
                code: response.result_cd.clone(),
                message: response.result_msg.clone(),
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_url_encodes_the_data_parameter() {
        let url = verification_url(
            "https://etims-sbx.kra.go.ke/common/link/etims/receipt/indexEtimsReceiptData",
            "A123456789B",
            "00",
            "ABC+123",
        );
        assert_eq!(
            url,
            "https://etims-sbx.kra.go.ke/common/link/etims/receipt/indexEtimsReceiptData?Data=A123456789B00ABC%2B123"
        );
    }
}
