//! HTTP response builders.
//!
//! Provides the JSON responses produced by dispatch.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;

/// Response body type used throughout funcset.
pub type Body = Full<Bytes>;

/// Full response type used throughout funcset.
pub type HttpResponse = Response<Body>;

/// Build a response with a JSON content type around an already encoded body.
pub(crate) fn raw(status: StatusCode, body: Body) -> HttpResponse {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Build a JSON response with the given status code and body.
pub fn json<T: Serialize>(status: StatusCode, body: &T) -> crate::Result<HttpResponse> {
    let json = serde_json::to_string(body)?;
    Ok(raw(status, Full::new(Bytes::from(json))))
}

/// Build a 200 OK JSON response.
pub fn ok<T: Serialize>(body: &T) -> crate::Result<HttpResponse> {
    json(StatusCode::OK, body)
}

/// Build a 502 Bad Gateway response whose body is the message as a JSON string.
pub fn bad_gateway(message: &str) -> HttpResponse {
    let body = serde_json::Value::String(message.to_string());
    raw(StatusCode::BAD_GATEWAY, Full::new(Bytes::from(body.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn ok_sets_json_content_type() {
        let resp = ok(&serde_json::json!({ "data": 1 })).unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn bad_gateway_quotes_message() {
        let resp = bad_gateway("boom \"quoted\"");
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let bytes = tokio_test::block_on(resp.into_body().collect())
            .unwrap()
            .to_bytes();
        assert_eq!(&bytes[..], br#""boom \"quoted\"""#);
    }
}
