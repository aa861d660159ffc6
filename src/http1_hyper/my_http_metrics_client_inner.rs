use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::client::conn::http1::SendRequest;
use tokio::sync::Mutex;

use crate::{MetricsBody, RequestBodyObserver, TrackedConnection};

pub type MetricsRequestBody = MetricsBody<Full<Bytes>, RequestBodyObserver>;

pub enum MyHttpMetricsConnectionState {
    Disconnected,
    Connected {
        current_connection_id: u64,
        connection: Arc<TrackedConnection>,
        send_request: SendRequest<MetricsRequestBody>,
    },
    Disposed,
}

impl MyHttpMetricsConnectionState {
    pub fn is_connected(&self) -> bool {
        match self {
            Self::Connected { .. } => true,
            _ => false,
        }
    }

    pub fn is_disposed(&self) -> bool {
        match self {
            Self::Disposed => true,
            _ => false,
        }
    }
}

pub struct MyHttpMetricsClientInner {
    pub state: Mutex<MyHttpMetricsConnectionState>,
    pub name: String,
}

impl MyHttpMetricsClientInner {
    pub fn new(name: String) -> Self {
        Self {
            state: Mutex::new(MyHttpMetricsConnectionState::Disconnected),
            name,
        }
    }

    pub async fn disconnect(&self, connection_id: u64) {
        let mut state = self.state.lock().await;

        match &*state {
            MyHttpMetricsConnectionState::Connected {
                current_connection_id,
                ..
            } => {
                if *current_connection_id != connection_id {
                    return;
                }

                debug!(
                    "[{}] Connection {} is disconnected",
                    self.name, connection_id
                );
            }
            MyHttpMetricsConnectionState::Disconnected => {
                return;
            }
            MyHttpMetricsConnectionState::Disposed => {
                return;
            }
        }

        *state = MyHttpMetricsConnectionState::Disconnected;
    }

    /// Dropping the `SendRequest` lets the connection task finish and report `Close`.
    pub async fn dispose(&self) {
        let mut state = self.state.lock().await;
        *state = MyHttpMetricsConnectionState::Disposed;
    }
}
