use std::fmt::Display;

use bytes::Bytes;
use http::Response;
use http_body_util::{combinators::BoxBody, BodyExt};
use hyper::body::Body;

pub fn into_box_body_response<TBody>(response: Response<TBody>) -> Response<BoxBody<Bytes, String>>
where
    TBody: Body<Data = Bytes> + Send + Sync + 'static,
    TBody::Error: Display,
{
    let (parts, body) = response.into_parts();

    let box_body = body.map_err(|e| e.to_string()).boxed();

    Response::from_parts(parts, box_body)
}
