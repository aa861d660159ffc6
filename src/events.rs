/// Events observed on a transport connection bound to an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connect,
    SecureConnect,
    /// Socket went back to the keep-alive pool.
    Free,
    /// Request was fully handed to the socket.
    Finish,
    Close,
}

impl ConnectionEvent {
    pub fn is_connected(&self) -> bool {
        match self {
            ConnectionEvent::Connect | ConnectionEvent::SecureConnect => true,
            _ => false,
        }
    }

    /// Different paths finish a request with `Free` or `Finish` (redirects, keep-alive).
    /// Both mean the same thing for metrics.
    pub fn is_request_completed(&self) -> bool {
        match self {
            ConnectionEvent::Free | ConnectionEvent::Finish => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseEvent<'s> {
    Data(&'s [u8]),
    End,
    Close,
}

pub trait ConnectionEventsDispatcher {
    fn dispatch(&self, event: ConnectionEvent);
}

pub trait ResponseEventsDispatcher {
    fn dispatch(&self, event: &ResponseEvent<'_>);
}

impl<F: Fn(ConnectionEvent)> ConnectionEventsDispatcher for F {
    fn dispatch(&self, event: ConnectionEvent) {
        self(event)
    }
}

impl<F: Fn(&ResponseEvent<'_>)> ResponseEventsDispatcher for F {
    fn dispatch(&self, event: &ResponseEvent<'_>) {
        self(event)
    }
}

pub struct NoOpDispatcher;

impl ConnectionEventsDispatcher for NoOpDispatcher {
    fn dispatch(&self, _event: ConnectionEvent) {}
}

impl ResponseEventsDispatcher for NoOpDispatcher {
    fn dispatch(&self, _event: &ResponseEvent<'_>) {}
}

pub type SharedConnectionDispatcher = std::sync::Arc<dyn ConnectionEventsDispatcher + Send + Sync>;
pub type SharedResponseDispatcher = std::sync::Arc<dyn ResponseEventsDispatcher + Send + Sync>;
