#[macro_use]
extern crate tracing;

mod clock;
pub use clock::*;
mod metrics_record;
pub use metrics_record::*;
mod events;
pub use events::*;
mod publisher;
pub use publisher::*;
mod settings;
pub use settings::*;
mod http_metrics;
pub use http_metrics::*;

mod connection;
pub use connection::*;
mod request;
pub use request::*;
mod response;
pub use response::*;

mod body;
pub use body::*;
pub mod headers;

mod error;
pub use error::*;

pub mod http1_hyper;
mod my_http_client_connector;
pub mod utils;
pub use my_http_client_connector::*;
