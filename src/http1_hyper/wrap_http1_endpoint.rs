use std::sync::Arc;

use hyper::client::conn::http1::SendRequest;
use hyper_util::rt::TokioIo;

use crate::{ConnectionEvent, HttpMetricsError, TrackedConnection};

use super::{MetricsRequestBody, MyHttpMetricsClientInner};

pub async fn wrap_http1_endpoint<
    TStream: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
>(
    stream: TStream,
    remote_host: &str,
    inner: Arc<MyHttpMetricsClientInner>,
    connection: Arc<TrackedConnection>,
    connection_id: u64,
) -> Result<SendRequest<MetricsRequestBody>, HttpMetricsError> {
    let io = TokioIo::new(stream);
    let handshake_result = hyper::client::conn::http1::handshake(io).await;
    match handshake_result {
        Ok((mut sender, conn)) => {
            let remote_host_spawned = remote_host.to_string();
            tokio::task::spawn(async move {
                if let Err(err) = conn.await {
                    error!(
                        "Http connection to {} is failed: {:?}",
                        remote_host_spawned, err
                    );
                }

                connection.emit(ConnectionEvent::Close);
                inner.disconnect(connection_id).await;
            });

            if let Err(err) = sender.ready().await {
                return Err(HttpMetricsError::CanNotConnectToRemoteHost(format!(
                    "Can not establish Http connection to '{remote_host}'. Http handshake Error: {}",
                    err
                )));
            }

            Ok(sender)
        }
        Err(err) => Err(HttpMetricsError::InvalidHttpHandshake(format!("{}", err))),
    }
}
