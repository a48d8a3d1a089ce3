//! HTTP dispatch for a single function.
//!
//! The surrounding pipeline owns the server. It hands a [`Request`] to
//! [`dispatch`], which either answers it or gives it back untouched as
//! [`Dispatch::PassThrough`] so the next handler can run.

use bytes::Bytes;
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method};
use serde_json::{Map, Value};

use crate::Result;
use crate::function::Function;
use crate::invoke::{self, Context};
use crate::response::{self, HttpResponse};
use crate::validate::Validator;

/// Separator between the segments of a mapping specifier.
pub const SPECIFIER_SEPARATOR: char = ':';

/// Inbound request as seen by dispatch.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    /// Parsed body; `null` when the request had none.
    pub body: Value,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Value::Null,
        }
    }

    /// Convenience constructor for POST requests.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Build from hyper request parts and the collected body bytes.
    ///
    /// An empty body becomes `null`; anything else must be JSON.
    pub fn from_parts(parts: Parts, body: Bytes) -> Result<Self> {
        let body = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body)
                .map_err(|e| crate::Error::BadRequest(format!("Invalid request body: {e}")))?
        };
        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            headers: parts.headers,
            body,
        })
    }

    /// Resolve a colon-separated specifier such as `body:user:id` or
    /// `headers:authorization` against this request.
    ///
    /// Locations that do not exist resolve to `null`.
    pub fn resolve(&self, specifier: &str) -> Value {
        let mut segments = specifier.split(SPECIFIER_SEPARATOR);
        let root = match segments.next() {
            Some("body") => self.body.clone(),
            Some("headers") => Value::Object(self.header_map()),
            Some("method") => Value::String(self.method.to_string()),
            Some("path") => Value::String(self.path.clone()),
            _ => return Value::Null,
        };
        segments
            .try_fold(root, |current, segment| descend(current, segment))
            .unwrap_or(Value::Null)
    }

    /// Headers as a JSON object keyed by lowercase name. Non-UTF-8 values
    /// are skipped; repeated headers keep the first value.
    fn header_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        for (name, value) in &self.headers {
            if let Ok(v) = value.to_str() {
                map.entry(name.as_str())
                    .or_insert_with(|| Value::String(v.to_string()));
            }
        }
        map
    }
}

fn descend(current: Value, segment: &str) -> Option<Value> {
    match current {
        Value::Object(mut map) => map.remove(segment),
        Value::Array(mut items) => {
            let index: usize = segment.parse().ok()?;
            (index < items.len()).then(|| items.swap_remove(index))
        }
        _ => None,
    }
}

/// Result of offering a request to a handler.
#[derive(Debug)]
pub enum Dispatch {
    /// The request was answered.
    Handled(HttpResponse),
    /// The request did not match; hand it to the next handler.
    PassThrough(Request),
}

impl Dispatch {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled(_))
    }
}

/// Build the argument list for `function` from `req`.
///
/// Without a mapper the body is the only argument; otherwise each specifier
/// yields one argument, in order.
pub fn extract(function: &Function, req: &Request) -> Vec<Value> {
    match function.http_mapper() {
        Some(mapper) => mapper.iter().map(|specifier| req.resolve(specifier)).collect(),
        None => vec![req.body.clone()],
    }
}

/// Offer `req` to `function`: match, extract, invoke, translate.
pub async fn dispatch(function: &Function, validator: &dyn Validator, req: Request) -> Dispatch {
    if req.method != Method::POST || function.path() != Some(req.path.as_str()) {
        tracing::trace!("{} {} passed through by {}", req.method, req.path, function.name());
        return Dispatch::PassThrough(req);
    }

    let args = extract(function, &req);
    let ctx = Context {
        path: Some(req.path),
        headers: req.headers,
    };

    let response = match invoke::invoke(function, validator, ctx, args).await {
        Ok(value) => response::ok(&value).unwrap_or_else(|e| {
            tracing::warn!("Function {} returned an unserializable value: {e}", function.name());
            response::bad_gateway(&e.to_string())
        }),
        Err(fault) => {
            tracing::warn!("Function {} failed: {fault}", function.name());
            response::bad_gateway(&fault.to_string())
        }
    };
    Dispatch::Handled(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::StatusCode;
    use hyper::header::{AUTHORIZATION, HeaderValue};
    use serde_json::json;

    fn request() -> Request {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        Request::post(
            "/users/update",
            json!({ "user": { "id": 7, "tags": ["a", "b"] }, "flag": false }),
        )
        .with_headers(headers)
    }

    #[test]
    fn test_resolve_nested_body_field() {
        let req = request();
        assert_eq!(req.resolve("body:user:id"), json!(7));
        assert_eq!(req.resolve("body:user:tags:1"), json!("b"));
        assert_eq!(req.resolve("body:flag"), json!(false));
        assert_eq!(req.resolve("body"), req.body);
    }

    #[test]
    fn test_resolve_headers_and_request_line() {
        let req = request();
        assert_eq!(req.resolve("headers:authorization"), json!("Bearer abc"));
        assert_eq!(req.resolve("method"), json!("POST"));
        assert_eq!(req.resolve("path"), json!("/users/update"));
    }

    #[test]
    fn test_resolve_missing_is_null() {
        let req = request();
        assert_eq!(req.resolve("body:user:email"), Value::Null);
        assert_eq!(req.resolve("body:flag:deeper"), Value::Null);
        assert_eq!(req.resolve("body:user:tags:9"), Value::Null);
        assert_eq!(req.resolve("headers:x-missing"), Value::Null);
        assert_eq!(req.resolve("cookies:session"), Value::Null);
    }

    #[test]
    fn test_extract_without_mapper_uses_body() {
        let f = Function::sync("f", |_ctx, _args| Ok(Value::Null));
        let req = request();
        assert_eq!(extract(&f, &req), vec![req.body.clone()]);
    }

    #[test]
    fn test_extract_follows_mapper_order() {
        let f = Function::sync("f", |_ctx, _args| Ok(Value::Null))
            .with_http_mapper(["headers:authorization", "body:user:id"]);
        assert_eq!(extract(&f, &request()), vec![json!("Bearer abc"), json!(7)]);
    }

    #[test]
    fn test_from_parts_parses_json() {
        let (parts, _) = hyper::Request::post("/greet?x=1").body(()).unwrap().into_parts();
        let req = Request::from_parts(parts, Bytes::from_static(br#"{"name":"Amy"}"#)).unwrap();
        assert_eq!(req.path, "/greet");
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.body, json!({ "name": "Amy" }));
    }

    #[test]
    fn test_from_parts_empty_and_invalid_body() {
        let parts = || hyper::Request::post("/greet").body(()).unwrap().into_parts().0;
        let req = Request::from_parts(parts(), Bytes::new()).unwrap();
        assert_eq!(req.body, Value::Null);

        let err = Request::from_parts(parts(), Bytes::from_static(b"{nope")).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
