//! Request builders and response readers for API integration tests

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, request::Builder, Method, Request},
    response::Response,
};
use serde_json::Value;

/// Client address used unless a test picks its own
pub const DEFAULT_CLIENT_IP: &str = "203.0.113.10";

pub const MULTIPART_BOUNDARY: &str = "soundbank-test-boundary";

/// Request builder carrying the default client address
pub fn request(method: Method, uri: &str) -> Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", DEFAULT_CLIENT_IP)
}

/// Request builder from a specific client address
pub fn request_from(ip: &str, method: Method, uri: &str) -> Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", ip)
}

/// Attach the session cookie
pub fn with_session(builder: Builder, token: &str) -> Builder {
    builder.header(header::COOKIE, format!("sb-token={}", token))
}

pub fn json_body(builder: Builder, body: Value) -> Request<Body> {
    builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_body(builder: Builder) -> Request<Body> {
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    json_body(request(Method::POST, uri), body)
}

pub fn get(uri: &str) -> Request<Body> {
    empty_body(request(Method::GET, uri))
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

/// The `Set-Cookie` header for the session cookie, if any
pub fn session_set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("sb-token="))
        .map(str::to_string)
}

pub fn header_str<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// A `file` part for [`multipart_body`]
pub struct FilePart<'a> {
    pub content_type: &'a str,
    pub filename: &'a str,
    pub data: &'a [u8],
}

/// Encode text fields and an optional file as `multipart/form-data`
///
/// The file part is written first, the way browsers order a form whose
/// file input comes first.
pub fn multipart_body(file: Option<FilePart<'_>>, fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();

    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                MULTIPART_BOUNDARY, file.filename, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file.data);
        body.extend_from_slice(b"\r\n");
    }

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                MULTIPART_BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }

    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(builder: Builder, body: Vec<u8>) -> Request<Body> {
    builder
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
