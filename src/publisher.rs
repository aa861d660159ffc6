use std::{
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use crate::{MetricsKind, MetricsRecord};

pub trait HttpMetricsSubscriber {
    fn on_metrics(&self, kind: MetricsKind, record: &MetricsRecord);
}

impl<F: Fn(MetricsKind, &MetricsRecord)> HttpMetricsSubscriber for F {
    fn on_metrics(&self, kind: MetricsKind, record: &MetricsRecord) {
        self(kind, record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn HttpMetricsSubscriber + Send + Sync + 'static>;

/// Broadcast point for completed metrics records.
/// Delivery is synchronous, in subscription order, without buffering.
pub struct HttpMetricsPublisher {
    activated: AtomicBool,
    next_subscription_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
}

impl HttpMetricsPublisher {
    pub fn new() -> Self {
        Self {
            activated: AtomicBool::new(false),
            next_subscription_id: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Idempotent. Returns `self` so a subscription can be chained.
    pub fn activate(&self) -> &Self {
        if !self.activated.swap(true, Ordering::SeqCst) {
            debug!("Http metrics instrumentation is activated");
        }

        self
    }

    pub fn is_activated(&self) -> bool {
        self.activated.load(Ordering::SeqCst)
    }

    pub fn subscribe(
        &self,
        subscriber: impl HttpMetricsSubscriber + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription_id.fetch_add(1, Ordering::SeqCst));

        self.lock_subscribers().push((id, Arc::new(subscriber)));

        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock_subscribers();
        let before = subscribers.len();
        subscribers.retain(|(subscription_id, _)| *subscription_id != id);
        subscribers.len() != before
    }

    pub fn subscribers_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    pub fn publish(&self, kind: MetricsKind, record: MetricsRecord) {
        // Handlers are invoked outside of the lock so they may subscribe or unsubscribe.
        let subscribers: Vec<Subscriber> = self
            .lock_subscribers()
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect();

        trace!(
            "Publishing {} metrics to {} subscriber(s)",
            kind,
            subscribers.len()
        );

        for subscriber in subscribers {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                subscriber.on_metrics(kind, &record);
            }));

            if result.is_err() {
                error!("Http metrics subscriber panicked while handling {} metrics", kind);
            }
        }
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Subscriber)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for HttpMetricsPublisher {
    fn default() -> Self {
        Self::new()
    }
}
