mod connection_context;
pub use connection_context::*;
mod connection_interceptor;
pub use connection_interceptor::*;
mod tracked_connection;
pub use tracked_connection::*;
