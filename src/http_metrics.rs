use std::sync::Arc;

use crate::{
    HttpMetricsPublisher, HttpMetricsSettings, HttpMetricsSubscriber, MetricsClock, MetricsKind,
    MetricsRecord, SubscriptionId, SystemClock,
};

lazy_static::lazy_static! {
    static ref HTTP_METRICS: HttpMetrics = HttpMetrics::new(HttpMetricsSettings::default());
}

struct HttpMetricsInner {
    settings: HttpMetricsSettings,
    clock: Arc<dyn MetricsClock + Send + Sync + 'static>,
    publisher: Arc<HttpMetricsPublisher>,
}

/// Handle to the instrumentation engine: clock, settings and the publisher
/// completed records are pushed into. Cheap to clone.
#[derive(Clone)]
pub struct HttpMetrics {
    inner: Arc<HttpMetricsInner>,
}

impl HttpMetrics {
    pub fn new(settings: HttpMetricsSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        settings: HttpMetricsSettings,
        clock: Arc<dyn MetricsClock + Send + Sync + 'static>,
    ) -> Self {
        Self::with_publisher(settings, clock, Arc::new(HttpMetricsPublisher::new()))
    }

    pub fn with_publisher(
        settings: HttpMetricsSettings,
        clock: Arc<dyn MetricsClock + Send + Sync + 'static>,
        publisher: Arc<HttpMetricsPublisher>,
    ) -> Self {
        Self {
            inner: Arc::new(HttpMetricsInner {
                settings,
                clock,
                publisher,
            }),
        }
    }

    /// The process-wide instance shared by every call site.
    pub fn global() -> Self {
        HTTP_METRICS.clone()
    }

    pub fn activate(&self) -> &HttpMetricsPublisher {
        self.inner.publisher.activate()
    }

    pub fn is_activated(&self) -> bool {
        self.inner.publisher.is_activated()
    }

    pub fn publisher(&self) -> &HttpMetricsPublisher {
        &self.inner.publisher
    }

    pub fn settings(&self) -> &HttpMetricsSettings {
        &self.inner.settings
    }

    pub fn name(&self) -> &str {
        self.inner.settings.name.as_str()
    }

    pub fn now_ms(&self) -> i64 {
        self.inner.clock.now_ms()
    }

    pub(crate) fn publish(&self, kind: MetricsKind, record: MetricsRecord) {
        debug!(
            "[{}] Publishing {} metrics for host {:?}",
            self.name(),
            kind,
            record.host
        );
        self.inner.publisher.publish(kind, record);
    }
}

/// Engages interception for every outbound connection bound afterwards.
/// Calling it more than once has no further effect.
pub fn activate_instrumentation() -> &'static HttpMetricsPublisher {
    HTTP_METRICS.activate()
}

pub fn on_metrics(
    subscriber: impl HttpMetricsSubscriber + Send + Sync + 'static,
) -> SubscriptionId {
    HTTP_METRICS.publisher().subscribe(subscriber)
}
