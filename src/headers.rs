use http::{HeaderMap, Method, Version};

pub const CL_CR: &[u8] = b"\r\n";

pub fn write_header(dest: &mut Vec<u8>, name: &str, value: &[u8]) {
    dest.extend_from_slice(name.as_bytes());
    dest.extend_from_slice(": ".as_bytes());
    dest.extend_from_slice(value);
    dest.extend_from_slice(CL_CR);
}

/// Canonical `name: value\r\n` form of a header map, one line per value.
pub fn serialize_headers(headers: &HeaderMap, dest: &mut Vec<u8>) {
    for (name, value) in headers.iter() {
        write_header(dest, name.as_str(), value.as_bytes());
    }
}

/// Repeated values of these headers are dropped, the first one wins.
const SINGLE_VALUE_HEADERS: &[&str] = &[
    "age",
    "authorization",
    "content-length",
    "content-type",
    "etag",
    "expires",
    "from",
    "host",
    "if-modified-since",
    "if-unmodified-since",
    "last-modified",
    "location",
    "max-forwards",
    "proxy-authorization",
    "referer",
    "retry-after",
    "server",
    "user-agent",
];

/// Length of the header map rendered as a JSON object keyed by lowercase names.
/// Repeated headers are merged with `, ` (`cookie` with `; `), `set-cookie` stays an array.
pub fn json_headers_size(headers: &HeaderMap) -> usize {
    let mut object = serde_json::Map::new();

    for name in headers.keys() {
        let mut values = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

        let value = match name.as_str() {
            "set-cookie" => serde_json::Value::Array(values.map(serde_json::Value::String).collect()),
            "cookie" => serde_json::Value::String(values.collect::<Vec<_>>().join("; ")),
            name if SINGLE_VALUE_HEADERS.contains(&name) => {
                serde_json::Value::String(values.next().unwrap_or_default())
            }
            _ => serde_json::Value::String(values.collect::<Vec<_>>().join(", ")),
        };

        object.insert(name.as_str().to_string(), value);
    }

    serde_json::Value::Object(object).to_string().len()
}

/// Size of the HTTP/1 request head as it goes on the wire:
/// request line, headers and the empty line separating them from the body.
pub fn request_head_size(
    method: &Method,
    path_and_query: &str,
    version: Version,
    headers: &HeaderMap,
) -> usize {
    let mut head = create_request_line(method, path_and_query, version).into_bytes();
    serialize_headers(headers, &mut head);
    head.extend_from_slice(CL_CR);
    head.len()
}

fn create_request_line(method: &Method, path_and_query: &str, version: Version) -> String {
    format!("{} {} {:?}\r\n", method, path_and_query, version)
}
