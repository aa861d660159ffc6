use std::sync::{Mutex, MutexGuard};

use crate::MetricsRecord;

#[derive(Default)]
struct OutboundRequestState {
    record: MetricsRecord,
    first_chunk_seen: bool,
    header_block_len: Option<usize>,
    sent: bool,
    published: bool,
}

/// Accumulator owned by one outbound request. Shared between the body send path
/// and the connection the request is bound to.
pub struct OutboundRequestMetrics {
    state: Mutex<OutboundRequestState>,
}

impl OutboundRequestMetrics {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(OutboundRequestState::default()),
        }
    }

    /// Tap on the low-level send path. Never publishes.
    pub fn on_send_chunk(&self, chunk: &[u8]) {
        self.add_sent_bytes(chunk.len());
    }

    pub fn add_sent_bytes(&self, chunk_len: usize) {
        let mut state = self.lock_state();

        if !state.first_chunk_seen {
            state.first_chunk_seen = true;
            state.record.first_chunk_size = Some(chunk_len);
            state.record.body_size = chunk_len;
        } else {
            state.record.body_size += chunk_len;
        }

        trace!(
            "Outbound chunk of {} bytes. Body size so far: {}",
            chunk_len,
            state.record.body_size
        );
    }

    /// Length of the serialized request head (request line, headers, blank line).
    pub fn set_header_block_len(&self, header_block_len: usize) {
        self.lock_state().header_block_len = Some(header_block_len);
    }

    pub fn snapshot(&self) -> MetricsRecord {
        self.lock_state().record.clone()
    }

    /// Returns `true` only the first time: the request is fully handed to the transport.
    pub(crate) fn mark_sent(&self) -> bool {
        let mut state = self.lock_state();

        if state.sent {
            return false;
        }

        state.sent = true;
        true
    }

    pub(crate) fn set_host(&self, host: String) {
        self.lock_state().record.host = Some(host);
    }

    pub(crate) fn reset_connect_time(&self) {
        self.lock_state().record.connect_time = Some(0);
    }

    pub(crate) fn set_connect_time(&self, connect_time: u64) {
        self.lock_state().record.connect_time = Some(connect_time);
    }

    pub(crate) fn capture_header_size(&self) {
        let mut state = self.lock_state();
        state.record.header_size = Some(state.header_block_len.unwrap_or(0));
    }

    /// Returns the record to publish, or `None` when this request already published
    /// and only one publication per request is allowed.
    pub(crate) fn take_publishable(&self, publish_once: bool) -> Option<MetricsRecord> {
        let mut state = self.lock_state();

        if publish_once && state.published {
            return None;
        }

        state.published = true;
        Some(state.record.clone())
    }

    fn lock_state(&self) -> MutexGuard<'_, OutboundRequestState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for OutboundRequestMetrics {
    fn default() -> Self {
        Self::new()
    }
}
