use std::{
    marker::PhantomData,
    sync::{atomic::AtomicU64, Arc},
    time::Duration,
};

use bytes::Bytes;
use http::{HeaderMap, HeaderValue};
use http_body_util::{combinators::BoxBody, Full};

use crate::{
    ConnectionEvent, ConnectionEventsDispatcher, HttpMetrics, HttpMetricsError, MetricsBody,
    MyHttpClientConnector, NoOpDispatcher, OutboundRequestMetrics, RequestBodyObserver,
    ResponseEventsDispatcher, SharedConnectionDispatcher, SharedResponseDispatcher,
    TrackedConnection,
};

use super::*;

/// Keep-alive HTTP/1 client whose connections and responses go through the
/// metrics interceptors. Requests are executed one at a time.
pub struct MyHttpMetricsClient<
    TStream: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + Sync + 'static,
    TConnector: MyHttpClientConnector<TStream> + Send + Sync + 'static,
> {
    connector: TConnector,
    stream: PhantomData<TStream>,
    inner: Arc<MyHttpMetricsClientInner>,
    metrics: HttpMetrics,
    connection_events: SharedConnectionDispatcher,
    response_events: SharedResponseDispatcher,
    connect_timeout: Duration,
    connection_id: AtomicU64,
}

impl<
        TStream: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + Sync + 'static,
        TConnector: MyHttpClientConnector<TStream> + Send + Sync + 'static,
    > MyHttpMetricsClient<TStream, TConnector>
{
    pub fn new(connector: TConnector, metrics: HttpMetrics) -> Self {
        let name = format!(
            "{}:{}",
            metrics.name(),
            connector.get_remote_host().as_str()
        );

        Self {
            inner: Arc::new(MyHttpMetricsClientInner::new(name)),
            connector,
            stream: PhantomData::default(),
            metrics,
            connection_events: Arc::new(NoOpDispatcher),
            response_events: Arc::new(NoOpDispatcher),
            connect_timeout: Duration::from_secs(5),
            connection_id: AtomicU64::new(0),
        }
    }

    pub fn set_connect_timeout(&mut self, connection_timeout: Duration) {
        self.connect_timeout = connection_timeout;
    }

    /// Receives every connection event after the metrics interceptor saw it.
    pub fn set_connection_events_dispatcher(
        &mut self,
        dispatcher: impl ConnectionEventsDispatcher + Send + Sync + 'static,
    ) {
        self.connection_events = Arc::new(dispatcher);
    }

    pub fn set_response_events_dispatcher(
        &mut self,
        dispatcher: impl ResponseEventsDispatcher + Send + Sync + 'static,
    ) {
        self.response_events = Arc::new(dispatcher);
    }

    pub async fn do_request(
        &self,
        mut req: hyper::Request<Full<Bytes>>,
        request_timeout: Duration,
    ) -> Result<hyper::Response<BoxBody<Bytes, String>>, HttpMetricsError> {
        if !req.headers().contains_key(http::header::HOST) {
            let remote_host = self.connector.get_remote_host();
            if let Ok(value) = HeaderValue::from_str(remote_host.as_str()) {
                req.headers_mut().insert(http::header::HOST, value);
            }
        }

        let request_metrics = Arc::new(OutboundRequestMetrics::new());
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|path_and_query| path_and_query.as_str())
            .unwrap_or("/");
        request_metrics.set_header_block_len(crate::headers::request_head_size(
            req.method(),
            path_and_query,
            req.version(),
            req.headers(),
        ));

        // Held until the response head is in: the connection is bound to one request at a time.
        let mut state = self.inner.state.lock().await;

        if state.is_disposed() {
            return Err(HttpMetricsError::Disposed);
        }

        let reusable = match &mut *state {
            MyHttpMetricsConnectionState::Connected {
                send_request,
                current_connection_id,
                ..
            } => match send_request.ready().await {
                Ok(_) => true,
                Err(err) => {
                    debug!(
                        "[{}] Connection {} can not be reused: {}",
                        self.inner.name, current_connection_id, err
                    );
                    false
                }
            },
            _ => true,
        };

        if !reusable {
            *state = MyHttpMetricsConnectionState::Disconnected;
        }

        if !state.is_connected() {
            *state = self.connect(&request_metrics, req.headers()).await?;
        } else if let MyHttpMetricsConnectionState::Connected { connection, .. } = &*state {
            self.metrics
                .bind_connection(connection, &request_metrics, Some(req.headers()));
        }

        let (parts, body) = req.into_parts();

        let (request_observer, send_request_future) = match &mut *state {
            MyHttpMetricsConnectionState::Connected {
                connection,
                send_request,
                ..
            } => {
                let request_observer =
                    RequestBodyObserver::new(request_metrics, connection.clone());
                let req = hyper::Request::from_parts(
                    parts,
                    MetricsBody::new(body, request_observer.clone()),
                );
                (request_observer, send_request.send_request(req))
            }
            MyHttpMetricsConnectionState::Disconnected => {
                return Err(HttpMetricsError::CanNotExecuteRequest(format!(
                    "Connection to {} is not established",
                    self.inner.name
                )));
            }
            MyHttpMetricsConnectionState::Disposed => {
                return Err(HttpMetricsError::Disposed);
            }
        };

        let response = match tokio::time::timeout(request_timeout, send_request_future).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                *state = MyHttpMetricsConnectionState::Disconnected;
                return Err(HttpMetricsError::CanNotExecuteRequest(err.to_string()));
            }
            Err(_) => {
                *state = MyHttpMetricsConnectionState::Disconnected;
                return Err(HttpMetricsError::RequestTimeout(request_timeout));
            }
        };

        // Bodies hyper never polls (empty ones) are reported as sent once the response is in.
        request_observer.finish_request();
        drop(state);

        let (parts, body) = response.into_parts();
        let interceptor = self.metrics.intercept_response(
            Some(request_observer.connection().context().clone()),
            Some(parts.status),
            Some(&parts.headers),
            self.response_events.clone(),
        );

        Ok(crate::utils::into_box_body_response(
            hyper::Response::from_parts(parts, MetricsBody::new(body, interceptor)),
        ))
    }

    async fn connect(
        &self,
        request_metrics: &Arc<OutboundRequestMetrics>,
        headers: &HeaderMap,
    ) -> Result<MyHttpMetricsConnectionState, HttpMetricsError> {
        let connection_id = self
            .connection_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let connection = Arc::new(TrackedConnection::from_shared(
            self.connection_events.clone(),
        ));

        // Bound before connecting so the connect event is measured.
        self.metrics
            .bind_connection(&connection, request_metrics, Some(headers));

        let remote_host = self.connector.get_remote_host();

        let connect_result =
            tokio::time::timeout(self.connect_timeout, self.connector.connect()).await;

        let stream = match connect_result {
            Ok(result) => result?,
            Err(_) => {
                return Err(HttpMetricsError::CanNotConnectToRemoteHost(format!(
                    "Can not connect to Http remote endpoint: '{}' Timeout: {:?}",
                    remote_host.as_str(),
                    self.connect_timeout
                )));
            }
        };

        if self.connector.is_secure() {
            connection.emit(ConnectionEvent::SecureConnect);
        } else {
            connection.emit(ConnectionEvent::Connect);
        }

        let send_request = wrap_http1_endpoint(
            stream,
            remote_host.as_str(),
            self.inner.clone(),
            connection.clone(),
            connection_id,
        )
        .await?;

        debug!(
            "[{}] Connection {} is established",
            self.inner.name, connection_id
        );

        Ok(MyHttpMetricsConnectionState::Connected {
            current_connection_id: connection_id,
            connection,
            send_request,
        })
    }
}

impl<
        TStream: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + Sync + 'static,
        TConnector: MyHttpClientConnector<TStream> + Send + Sync + 'static,
    > Drop for MyHttpMetricsClient<TStream, TConnector>
{
    fn drop(&mut self) {
        let inner = self.inner.clone();

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                inner.dispose().await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use http_body_util::BodyExt;
    use rust_extensions::StrOrString;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    use super::*;
    use crate::{HttpMetricsSettings, ManualClock, MetricsKind, MetricsRecord};

    const RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\ncontent-length: 11\r\n\r\nhello world";

    struct DuplexConnector {
        streams: Mutex<Vec<DuplexStream>>,
        connects: AtomicUsize,
        clock: Arc<ManualClock>,
        connect_delay_ms: i64,
    }

    impl DuplexConnector {
        fn new(
            streams: Vec<DuplexStream>,
            clock: Arc<ManualClock>,
            connect_delay_ms: i64,
        ) -> Self {
            Self {
                streams: Mutex::new(streams),
                connects: AtomicUsize::new(0),
                clock,
                connect_delay_ms,
            }
        }
    }

    #[async_trait::async_trait]
    impl MyHttpClientConnector<DuplexStream> for DuplexConnector {
        async fn connect(&self) -> Result<DuplexStream, HttpMetricsError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.clock.advance(self.connect_delay_ms);
            self.streams.lock().unwrap().pop().ok_or_else(|| {
                HttpMetricsError::CanNotConnectToRemoteHost("No streams left".to_string())
            })
        }

        fn get_remote_host(&self) -> StrOrString {
            "test.local".into()
        }
    }

    fn find_head_end(buffer: &[u8]) -> Option<usize> {
        buffer
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .map(|pos| pos + 4)
    }

    /// Reads one request (head plus `content-length` body) and drops it from the buffer.
    async fn read_request(stream: &mut DuplexStream, buffer: &mut Vec<u8>) -> bool {
        let mut chunk = [0u8; 1024];

        let head_end = loop {
            if let Some(head_end) = find_head_end(buffer) {
                break head_end;
            }

            let read = stream.read(&mut chunk).await.unwrap();
            if read == 0 {
                return false;
            }
            buffer.extend_from_slice(&chunk[..read]);
        };

        let head = String::from_utf8_lossy(&buffer[..head_end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .map(|value| value.trim().parse::<usize>().unwrap())
            .unwrap_or(0);

        while buffer.len() < head_end + content_length {
            let read = stream.read(&mut chunk).await.unwrap();
            if read == 0 {
                return false;
            }
            buffer.extend_from_slice(&chunk[..read]);
        }

        buffer.drain(..head_end + content_length);
        true
    }

    async fn serve_requests(mut stream: DuplexStream, requests: usize) {
        let mut buffer = Vec::new();

        for _ in 0..requests {
            if !read_request(&mut stream, &mut buffer).await {
                return;
            }

            stream.write_all(RESPONSE).await.unwrap();
        }
    }

    async fn read_without_reply(mut stream: DuplexStream) {
        let mut buffer = Vec::new();
        read_request(&mut stream, &mut buffer).await;

        // Keeps the connection open without ever answering.
        std::future::pending::<()>().await;
    }

    fn capture_metrics(metrics: &HttpMetrics) -> Arc<Mutex<Vec<(MetricsKind, MetricsRecord)>>> {
        let published = Arc::new(Mutex::new(Vec::new()));
        let published_cloned = published.clone();
        metrics
            .publisher()
            .subscribe(move |kind: MetricsKind, record: &MetricsRecord| {
                published_cloned.lock().unwrap().push((kind, record.clone()));
            });
        published
    }

    #[tokio::test]
    async fn test_keep_alive_requests_are_measured() {
        let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);
        tokio::spawn(serve_requests(server_stream, 2));

        let clock = Arc::new(ManualClock::new(1_000));
        let metrics = HttpMetrics::with_clock(HttpMetricsSettings::default(), clock.clone());
        metrics.activate();
        let published = capture_metrics(&metrics);

        let connector = DuplexConnector::new(vec![client_stream], clock, 40);

        let mut client = MyHttpMetricsClient::new(connector, metrics);

        let events = Arc::new(Mutex::new(Vec::new()));
        let events_cloned = events.clone();
        client.set_connection_events_dispatcher(move |event: ConnectionEvent| {
            events_cloned.lock().unwrap().push(event);
        });

        let request = hyper::Request::builder()
            .method("POST")
            .uri("/upload")
            .header("content-length", "11")
            .body(Full::new(Bytes::from_static(b"hello world")))
            .unwrap();

        let mut expected_header_size = request.headers().clone();
        expected_header_size.insert(http::header::HOST, HeaderValue::from_static("test.local"));
        let expected_header_size = crate::headers::request_head_size(
            &http::Method::POST,
            "/upload",
            http::Version::HTTP_11,
            &expected_header_size,
        );

        let response = client
            .do_request(request, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hello world");

        let request = hyper::Request::builder()
            .method("GET")
            .uri("/status")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let response = client
            .do_request(request, Duration::from_secs(5))
            .await
            .unwrap();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hello world");

        assert_eq!(client.connector.connects.load(Ordering::SeqCst), 1);

        assert_eq!(
            &events.lock().unwrap()[..3],
            &[
                ConnectionEvent::Connect,
                ConnectionEvent::Finish,
                ConnectionEvent::Finish
            ]
        );

        let published = published.lock().unwrap();
        let requests: Vec<&MetricsRecord> = published
            .iter()
            .filter(|(kind, _)| *kind == MetricsKind::Request)
            .map(|(_, record)| record)
            .collect();
        let responses: Vec<&MetricsRecord> = published
            .iter()
            .filter(|(kind, _)| *kind == MetricsKind::Response)
            .map(|(_, record)| record)
            .collect();

        assert_eq!(requests.len(), 2);
        assert_eq!(responses.len(), 2);

        assert_eq!(requests[0].host.as_deref(), Some("test.local"));
        assert_eq!(requests[0].body_size, 11);
        assert_eq!(requests[0].first_chunk_size, Some(11));
        assert_eq!(requests[0].header_size, Some(expected_header_size));
        assert_eq!(requests[0].connect_time, Some(40));

        assert_eq!(requests[1].connect_time, Some(0));
        assert_eq!(requests[1].body_size, 0);

        for response in responses {
            assert_eq!(response.status_code, Some(200));
            assert_eq!(response.body_size, 11);
            assert_eq!(response.first_chunk_size, Some(11));
            assert_eq!(response.header_size, Some(r#"{"content-length":"11"}"#.len()));
            assert_eq!(response.host.as_deref(), Some("test.local"));
        }
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let connector = DuplexConnector::new(vec![], Arc::new(ManualClock::new(0)), 0);

        let client = MyHttpMetricsClient::new(
            connector,
            HttpMetrics::new(HttpMetricsSettings::default()),
        );

        let request = hyper::Request::builder()
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let err = client
            .do_request(request, Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            HttpMetricsError::CanNotConnectToRemoteHost(_)
        ));
    }

    #[tokio::test]
    async fn test_sent_request_is_published_when_response_never_comes() {
        let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);
        tokio::spawn(read_without_reply(server_stream));

        let clock = Arc::new(ManualClock::new(0));
        let metrics = HttpMetrics::with_clock(HttpMetricsSettings::default(), clock.clone());
        metrics.activate();
        let published = capture_metrics(&metrics);

        let connector = DuplexConnector::new(vec![client_stream], clock, 15);
        let mut client = MyHttpMetricsClient::new(connector, metrics);

        let events = Arc::new(Mutex::new(Vec::new()));
        let events_cloned = events.clone();
        client.set_connection_events_dispatcher(move |event: ConnectionEvent| {
            events_cloned.lock().unwrap().push(event);
        });

        let request = hyper::Request::builder()
            .method("POST")
            .uri("/upload")
            .header("content-length", "11")
            .body(Full::new(Bytes::from_static(b"hello world")))
            .unwrap();

        let err = client
            .do_request(request, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpMetricsError::RequestTimeout(_)));

        assert_eq!(
            &events.lock().unwrap()[..2],
            &[ConnectionEvent::Connect, ConnectionEvent::Finish]
        );

        let published = published.lock().unwrap();
        assert_eq!(published.len(), 1);

        let (kind, record) = &published[0];
        assert_eq!(*kind, MetricsKind::Request);
        assert_eq!(record.host.as_deref(), Some("test.local"));
        assert_eq!(record.body_size, 11);
        assert_eq!(record.connect_time, Some(15));
        assert!(record.header_size.unwrap() > 0);
    }
}
