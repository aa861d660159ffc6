use std::sync::{Arc, Mutex, MutexGuard};

use http::{HeaderMap, StatusCode};

use crate::{
    ConnectionContext, HttpMetrics, MetricsKind, MetricsRecord, ResponseEvent,
    ResponseEventsDispatcher, SharedResponseDispatcher,
};

#[derive(Default)]
struct ResponseState {
    record: MetricsRecord,
    first_chunk_seen: bool,
    published: bool,
}

/// Decorates the dispatcher of one inbound response.
pub struct ResponseInterceptor {
    metrics: HttpMetrics,
    connection: Option<Arc<ConnectionContext>>,
    status_code: Option<u16>,
    header_size: Option<usize>,
    state: Mutex<ResponseState>,
    original: SharedResponseDispatcher,
}

impl HttpMetrics {
    pub fn intercept_response(
        &self,
        connection: Option<Arc<ConnectionContext>>,
        status: Option<StatusCode>,
        headers: Option<&HeaderMap>,
        original: SharedResponseDispatcher,
    ) -> ResponseInterceptor {
        ResponseInterceptor {
            metrics: self.clone(),
            connection,
            status_code: status.map(|status| status.as_u16()),
            header_size: headers.map(crate::headers::json_headers_size),
            state: Mutex::new(ResponseState::default()),
            original,
        }
    }
}

impl ResponseInterceptor {
    pub fn snapshot(&self) -> MetricsRecord {
        self.lock_state().record.clone()
    }

    fn on_data(&self, chunk: &[u8]) {
        let mut state = self.lock_state();

        if !state.first_chunk_seen {
            state.first_chunk_seen = true;
            state.record.body_size = 0;
            state.record.first_chunk_size = Some(chunk.len());

            if let Some(on_connect_time) = self
                .connection
                .as_ref()
                .and_then(|connection| connection.on_connect_time())
            {
                state.record.first_chunk_transfer_time =
                    Some(crate::elapsed_ms(self.metrics.now_ms(), on_connect_time));
            }
        }

        state.record.body_size += chunk.len();
    }

    fn on_end(&self) {
        let record_to_publish = {
            let mut state = self.lock_state();

            if let Some(header_size) = self.header_size {
                state.record.header_size = Some(header_size);
            }

            if let Some(status_code) = self.status_code {
                state.record.status_code = Some(status_code);
            }

            let connection = match self.connection.as_ref() {
                Some(connection) => connection,
                None => return,
            };

            if let Some(on_connect_time) = connection.on_connect_time() {
                state.record.total_transfer_time =
                    Some(crate::elapsed_ms(self.metrics.now_ms(), on_connect_time));
            }

            if let Some(host) = connection.host() {
                state.record.host = Some(host);
            }

            if !connection.is_outbound() {
                return;
            }

            if self.metrics.settings().publish_once_per_request && state.published {
                trace!(
                    "[{}] Response metrics are already published",
                    self.metrics.name()
                );
                return;
            }

            state.published = true;
            state.record.clone()
        };

        self.metrics.publish(MetricsKind::Response, record_to_publish);
    }

    fn lock_state(&self) -> MutexGuard<'_, ResponseState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ResponseEventsDispatcher for ResponseInterceptor {
    fn dispatch(&self, event: &ResponseEvent<'_>) {
        match event {
            ResponseEvent::Data(chunk) => self.on_data(chunk),
            ResponseEvent::End => self.on_end(),
            ResponseEvent::Close => {}
        }

        self.original.dispatch(event);
    }
}
