use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum HttpMetricsError {
    #[error("{0}")]
    CanNotConnectToRemoteHost(String),
    #[error("Invalid http handshake: {0}")]
    InvalidHttpHandshake(String),
    #[error("Can not execute request: {0}")]
    CanNotExecuteRequest(String),
    #[error("Request timeout: {0:?}")]
    RequestTimeout(Duration),
    #[error("Http client is disposed")]
    Disposed,
}
