use std::sync::{Arc, Mutex, MutexGuard};

use crate::OutboundRequestMetrics;

#[derive(Default)]
struct ConnectionContextState {
    on_connect_time: Option<i64>,
    outbound: bool,
    host: Option<String>,
    interceptor_installed: bool,
    request: Option<Arc<OutboundRequestMetrics>>,
}

/// Metrics state of one transport connection. Lives as long as the connection.
pub struct ConnectionContext {
    state: Mutex<ConnectionContextState>,
}

impl ConnectionContext {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConnectionContextState::default()),
        }
    }

    pub fn on_connect_time(&self) -> Option<i64> {
        self.lock_state().on_connect_time
    }

    pub fn is_outbound(&self) -> bool {
        self.lock_state().outbound
    }

    pub fn host(&self) -> Option<String> {
        self.lock_state().host.clone()
    }

    pub fn is_interceptor_installed(&self) -> bool {
        self.lock_state().interceptor_installed
    }

    pub fn bound_request(&self) -> Option<Arc<OutboundRequestMetrics>> {
        self.lock_state().request.clone()
    }

    /// Binds the connection to the next request using it.
    /// Returns `true` when the interceptor still has to be installed.
    pub(crate) fn bind(
        &self,
        now: i64,
        host: Option<String>,
        request: Arc<OutboundRequestMetrics>,
    ) -> bool {
        let mut state = self.lock_state();

        state.on_connect_time = Some(now);
        // Only client-side connections are bound, inbound traffic is never instrumented.
        state.outbound = true;

        if host.is_some() {
            state.host = host;
        }

        state.request = Some(request);

        if state.interceptor_installed {
            return false;
        }

        state.interceptor_installed = true;
        true
    }

    fn lock_state(&self) -> MutexGuard<'_, ConnectionContextState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ConnectionContext {
    fn default() -> Self {
        Self::new()
    }
}
