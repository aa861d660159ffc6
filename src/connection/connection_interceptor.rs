use std::sync::Arc;

use crate::{
    ConnectionContext, ConnectionEvent, ConnectionEventsDispatcher, HttpMetrics, MetricsKind,
    SharedConnectionDispatcher,
};

/// Decorates the connection's dispatcher: every event updates the bound request's
/// metrics first and is then forwarded unchanged.
pub struct ConnectionInterceptor {
    metrics: HttpMetrics,
    context: Arc<ConnectionContext>,
    original: SharedConnectionDispatcher,
}

impl ConnectionInterceptor {
    pub fn new(
        metrics: HttpMetrics,
        context: Arc<ConnectionContext>,
        original: SharedConnectionDispatcher,
    ) -> Self {
        Self {
            metrics,
            context,
            original,
        }
    }

    fn record(&self, event: ConnectionEvent) {
        let request = match self.context.bound_request() {
            Some(request) => request,
            None => return,
        };

        if event.is_connected() {
            if let Some(on_connect_time) = self.context.on_connect_time() {
                let connect_time = crate::elapsed_ms(self.metrics.now_ms(), on_connect_time);
                request.set_connect_time(connect_time);
                trace!(
                    "[{}] Connection established in {} ms",
                    self.metrics.name(),
                    connect_time
                );
            }
        }

        if event.is_request_completed() {
            request.capture_header_size();

            if !self.context.is_outbound() {
                return;
            }

            let publish_once = self.metrics.settings().publish_once_per_request;

            match request.take_publishable(publish_once) {
                Some(record) => self.metrics.publish(MetricsKind::Request, record),
                None => trace!(
                    "[{}] Request metrics are already published. Skipping {:?}",
                    self.metrics.name(),
                    event
                ),
            }
        }
    }
}

impl ConnectionEventsDispatcher for ConnectionInterceptor {
    fn dispatch(&self, event: ConnectionEvent) {
        self.record(event);
        self.original.dispatch(event);
    }
}
