mod my_http_metrics_client;
pub use my_http_metrics_client::*;
mod my_http_metrics_client_inner;
pub use my_http_metrics_client_inner::*;
mod wrap_http1_endpoint;
pub use wrap_http1_endpoint::*;
