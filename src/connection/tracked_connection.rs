use std::sync::{Arc, Mutex};

use http::HeaderMap;

use crate::{
    ConnectionContext, ConnectionEvent, ConnectionEventsDispatcher, ConnectionInterceptor,
    HttpMetrics, OutboundRequestMetrics, SharedConnectionDispatcher,
};

/// Host side of a transport connection: its metrics context plus the dispatcher
/// its events currently go through.
pub struct TrackedConnection {
    context: Arc<ConnectionContext>,
    dispatcher: Mutex<SharedConnectionDispatcher>,
}

impl TrackedConnection {
    pub fn new(original: impl ConnectionEventsDispatcher + Send + Sync + 'static) -> Self {
        Self::from_shared(Arc::new(original))
    }

    pub fn from_shared(original: SharedConnectionDispatcher) -> Self {
        Self {
            context: Arc::new(ConnectionContext::new()),
            dispatcher: Mutex::new(original),
        }
    }

    pub fn context(&self) -> &Arc<ConnectionContext> {
        &self.context
    }

    pub fn emit(&self, event: ConnectionEvent) {
        let dispatcher = self.current_dispatcher();
        dispatcher.dispatch(event);
    }

    fn current_dispatcher(&self) -> SharedConnectionDispatcher {
        self.dispatcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn wrap_dispatcher(
        &self,
        wrap: impl FnOnce(SharedConnectionDispatcher) -> SharedConnectionDispatcher,
    ) {
        let mut dispatcher = self
            .dispatcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let original = dispatcher.clone();
        *dispatcher = wrap(original);
    }
}

impl HttpMetrics {
    /// Invoked every time a connection is handed to an outbound request,
    /// fresh or reused from the keep-alive pool.
    pub fn bind_connection(
        &self,
        connection: &TrackedConnection,
        request: &Arc<OutboundRequestMetrics>,
        headers: Option<&HeaderMap>,
    ) {
        if !self.is_activated() {
            trace!(
                "[{}] Instrumentation is not activated. Connection is not tracked",
                self.name()
            );
            return;
        }

        let host = headers
            .and_then(|headers| headers.get(http::header::HOST))
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if let Some(host) = host.as_ref() {
            request.set_host(host.clone());
        }

        // Stays 0 unless a connect event shows up for this binding.
        request.reset_connect_time();

        let context = connection.context().clone();
        let install_interceptor = context.bind(self.now_ms(), host, request.clone());

        if install_interceptor {
            let metrics = self.clone();
            connection.wrap_dispatcher(move |original| {
                Arc::new(ConnectionInterceptor::new(metrics, context, original))
            });
            debug!(
                "[{}] Connection interceptor is installed. Host: {:?}",
                self.name(),
                connection.context().host()
            );
        } else {
            debug!(
                "[{}] Reused connection is bound to a new request. Host: {:?}",
                self.name(),
                connection.context().host()
            );
        }
    }
}
