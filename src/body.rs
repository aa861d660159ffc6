use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use bytes::Bytes;
use hyper::body::{Body, Frame, SizeHint};

use crate::{
    ConnectionEvent, OutboundRequestMetrics, ResponseEvent, ResponseEventsDispatcher,
    ResponseInterceptor, TrackedConnection,
};

pub trait BodyObserver {
    fn on_data(&self, chunk: &[u8]);
    fn on_end(&self);
}

/// Outgoing side: data frames are send chunks, the end of the body reports `Finish`
/// on the connection the request is bound to.
#[derive(Clone)]
pub struct RequestBodyObserver {
    request: Arc<OutboundRequestMetrics>,
    connection: Arc<TrackedConnection>,
}

impl RequestBodyObserver {
    pub fn new(request: Arc<OutboundRequestMetrics>, connection: Arc<TrackedConnection>) -> Self {
        Self {
            request,
            connection,
        }
    }

    pub fn connection(&self) -> &Arc<TrackedConnection> {
        &self.connection
    }

    /// Emits `Finish` unless the request was already reported as sent.
    pub fn finish_request(&self) {
        if self.request.mark_sent() {
            self.connection.emit(ConnectionEvent::Finish);
        }
    }
}

impl BodyObserver for RequestBodyObserver {
    fn on_data(&self, chunk: &[u8]) {
        self.request.on_send_chunk(chunk);
    }

    fn on_end(&self) {
        self.finish_request();
    }
}

impl BodyObserver for ResponseInterceptor {
    fn on_data(&self, chunk: &[u8]) {
        self.dispatch(&ResponseEvent::Data(chunk));
    }

    fn on_end(&self) {
        self.dispatch(&ResponseEvent::End);
    }
}

/// Body decorator: every data frame is reported to the observer, then handed over unchanged.
/// The end of the body is reported exactly once.
pub struct MetricsBody<B, O> {
    inner: B,
    observer: O,
    ended: bool,
}

impl<B, O: BodyObserver> MetricsBody<B, O> {
    pub fn new(inner: B, observer: O) -> Self {
        Self {
            inner,
            observer,
            ended: false,
        }
    }

    fn finish(&mut self) {
        if self.ended {
            return;
        }

        self.ended = true;
        self.observer.on_end();
    }
}

impl<B, O> Body for MetricsBody<B, O>
where
    B: Body<Data = Bytes> + Unpin,
    O: BodyObserver + Unpin,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        let result = futures::ready!(Pin::new(&mut this.inner).poll_frame(cx));

        match result.as_ref() {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    this.observer.on_data(data.as_ref());
                }

                if this.inner.is_end_stream() {
                    this.finish();
                }
            }
            Some(Err(_)) => {}
            None => this.finish(),
        }

        Poll::Ready(result)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
