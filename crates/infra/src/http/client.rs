//! Thin wrapper around `reqwest` with uniform timeouts and error mapping.
//!
//! There is deliberately no retry loop here: provider submissions are not
//! idempotent at the transport level, so retrying lives with the resend
//! scheduler, which goes back through the staged documents and their
//! submitted flags.

use std::time::Duration;

use etims_domain::{EtimsError, Result};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use tracing::debug;

/// HTTP client with a fixed per-request timeout.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Prepare a JSON POST.
    pub fn post_json<U, T>(&self, url: U, body: &T) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
        T: serde::Serialize + ?Sized,
    {
        self.client.post(url).json(body)
    }

    /// Execute a prepared request, mapping transport failures.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder
            .build()
            .map_err(|err| EtimsError::Internal(format!("malformed request: {err}")))?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, %url, status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                Err(map_transport_error(&err))
            }
        }
    }
}

fn map_transport_error(err: &reqwest::Error) -> EtimsError {
    if err.is_timeout() {
        EtimsError::Transport(format!("request timed out: {err}"))
    } else if err.is_connect() {
        EtimsError::Transport(format!("connection failed: {err}"))
    } else {
        EtimsError::Transport(err.to_string())
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(300), user_agent: None }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder
            .build()
            .map_err(|err| EtimsError::Internal(format!("http client build failed: {err}")))?;
        Ok(HttpClient { client })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn posts_json_bodies() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let response = client
            .send(client.post_json(format!("{}/echo", server.uri()), &serde_json::json!({"a": 1})))
            .await
            .unwrap();
        assert!(response.status().is_success());
    }

    #[tokio::test]
    async fn timeouts_surface_as_transport_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let client =
            HttpClient::builder().timeout(Duration::from_millis(20)).build().unwrap();
        let err = client
            .send(client.post_json(server.uri(), &serde_json::json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, EtimsError::Transport(_)));
    }
}
