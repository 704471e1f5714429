use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status: {status} body={body}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("grid request timed out")]
    Timeout,
    #[error("grid response could not be decoded: {0}")]
    Decode(String),
    #[error("invalid grid endpoint: {0}")]
    Endpoint(String),
}
