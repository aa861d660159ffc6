mod response_interceptor;
pub use response_interceptor::*;
