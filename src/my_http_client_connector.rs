use rust_extensions::StrOrString;

use crate::HttpMetricsError;

#[async_trait::async_trait]
pub trait MyHttpClientConnector<TStream: tokio::io::AsyncRead + tokio::io::AsyncWrite> {
    async fn connect(&self) -> Result<TStream, HttpMetricsError>;
    fn get_remote_host(&self) -> StrOrString;
    /// Streams are TLS sessions, connection completion is reported as a secure connect.
    fn is_secure(&self) -> bool {
        false
    }
}
