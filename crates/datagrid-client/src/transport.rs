use std::time::Duration;

use async_trait::async_trait;
use datagrid_core::{Method, WirePage};
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::ClientError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Sends one grid request and decodes the page.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, method: Method, pairs: &[(String, String)]) -> Result<WirePage, ClientError>;
}

/// Ajax endpoint over HTTP: GET sends the pairs as the query string, POST as
/// an urlencoded form body.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Result<Self, ClientError> {
        let endpoint = Url::parse(endpoint).map_err(|err| ClientError::Endpoint(err.to_string()))?;
        Ok(Self {
            http: Client::new(),
            endpoint,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// `base` is the host root, e.g. `http://localhost:8090`; `prefix` the grid mount point.
    pub fn for_grid(base: &str, prefix: &str, grid_id: &str) -> Result<Self, ClientError> {
        let prefix = prefix.trim_matches('/');
        let path = if prefix.is_empty() {
            format!("ajax/{grid_id}")
        } else {
            format!("{prefix}/ajax/{grid_id}")
        };
        let base = Url::parse(base).map_err(|err| ClientError::Endpoint(err.to_string()))?;
        let endpoint = base
            .join(&format!("/{path}"))
            .map_err(|err| ClientError::Endpoint(err.to_string()))?;
        Ok(Self {
            http: Client::new(),
            endpoint,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, method: Method, pairs: &[(String, String)]) -> Result<WirePage, ClientError> {
        let request = match method {
            Method::Get => {
                let mut url = self.endpoint.clone();
                url.query_pairs_mut().extend_pairs(pairs);
                self.http.get(url)
            }
            Method::Post => self.http.post(self.endpoint.clone()).form(pairs),
        };
        debug!(endpoint = %self.endpoint, method = %method, params = pairs.len(), "grid request");
        let res = request
            .timeout(self.timeout)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_send_error)?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedStatus { status, body });
        }
        let bytes = res.bytes().await.map_err(map_send_error)?;
        serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode(err.to_string()))
    }
}

fn map_send_error(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout
    } else {
        ClientError::Http(err)
    }
}
