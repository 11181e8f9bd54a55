use std::future::Future;
use std::time::Duration;

use chanmap_types::Snapshot;
use tracing::debug;

use crate::{CommitError, CommitRequest};

/// Default timeout for commit requests
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivers a commit request and returns the server state after it.
///
/// This is the only suspension point of the console.
pub trait CommitTransport {
    fn commit(
        &self,
        request: &CommitRequest,
    ) -> impl Future<Output = Result<Snapshot, CommitError>> + Send;
}

/// Commit transport over the publisher HTTP API.
///
/// Posts the request as JSON to `{endpoint}/{snap}/releases` and expects
/// the refreshed snapshot back.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: String,
    snap: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Transport with [`DEFAULT_TIMEOUT`]. Fails when the HTTP client
    /// cannot be built.
    pub fn new(endpoint: &str, snap: &str) -> Result<Self, CommitError> {
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            snap: snap.to_string(),
            timeout: DEFAULT_TIMEOUT,
            client: build_client(DEFAULT_TIMEOUT)?,
        })
    }

    /// Rebuild the client with a new request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, CommitError> {
        self.client = build_client(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    /// Full URL commits are posted to.
    pub fn url(&self) -> String {
        format!("{}/{}/releases", self.endpoint, self.snap)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, CommitError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("chanmap/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| CommitError::Transport(format!("failed to build HTTP client: {e}")))
}

impl CommitTransport for HttpTransport {
    async fn commit(&self, request: &CommitRequest) -> Result<Snapshot, CommitError> {
        let url = self.url();
        debug!(
            %url,
            timeout = %humantime::format_duration(self.timeout),
            releases = request.releases.len(),
            "posting commit"
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| CommitError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CommitError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CommitError::Transport(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| CommitError::Decode(e.to_string()))
    }
}
