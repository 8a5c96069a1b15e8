//! The provider gateway: JSON POST exchange implementing
//! [`TaxGateway`].

use std::time::Duration;

use async_trait::async_trait;
use etims_core::TaxGateway;
use etims_domain::types::{EtimsResponse, RequestHeaders};
use etims_domain::{EtimsError, Result};
use tracing::instrument;

use super::client::HttpClient;

const HEADER_TIN: &str = "tin";
const HEADER_BRANCH: &str = "bhfId";
const HEADER_KEY: &str = "cmcKey";

/// reqwest-backed exchange with the tax authority.
///
/// Business-level rejections come back as HTTP 200 with a non-`000`
/// `resultCd` and are returned as `Ok`; anything that keeps a well-formed
/// envelope from arriving is a transport error.
pub struct EtimsGateway {
    client: HttpClient,
}

impl EtimsGateway {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Gateway with its own client using the configured timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self { client: HttpClient::builder().timeout(timeout).build()? })
    }
}

#[async_trait]
impl TaxGateway for EtimsGateway {
    #[instrument(skip(self, headers, body))]
    async fn exchange(
        &self,
        url: &str,
        headers: &RequestHeaders,
        body: &serde_json::Value,
    ) -> Result<EtimsResponse> {
        let mut request = self
            .client
            .post_json(url, body)
            .header(HEADER_TIN, &headers.tin)
            .header(HEADER_BRANCH, &headers.branch_id);
        if let Some(key) = &headers.session_key {
            request = request.header(HEADER_KEY, key);
        }

        let response = self.client.send(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EtimsError::Transport(format!(
                "provider answered HTTP {status} for {url}"
            )));
        }

        response
            .json::<EtimsResponse>()
            .await
            .map_err(|err| EtimsError::Transport(format!("malformed provider response: {err}")))
    }
}
