mod outbound_request_metrics;
pub use outbound_request_metrics::*;
