//! Funcset - registry of annotated callables.
//!
//! Funcset keeps plain callables together with the metadata needed to serve
//! them:
//!
//! - **Function**: a callable plus path, title, description, parameter
//!   schemas, return hint and HTTP argument mapping
//! - **Validate**: pluggable per-argument schema checks (JSON Schema by default)
//! - **Invoke**: validated invocation that returns failures as values
//! - **Registry**: path-indexed collection built from functions, lists or
//!   namespace trees
//! - **Http**: POST dispatch for an externally owned request pipeline
//! - **OpenAPI**: per-function path items
//! - **Loader**: namespace trees from a directory of manifests
//!
//! # Example
//!
//! ```ignore
//! use funcset::{Function, Registry, http::{Dispatch, Request}};
//! use serde_json::json;
//!
//! let greet = Function::sync("greet", |_ctx, args| {
//!     Ok(json!(format!("Hello {}", args[0].as_str().unwrap_or_default())))
//! })
//! .with_path("/greet")
//! .with_param_types([json!({ "type": "string" })])
//! .with_http_mapper(["body:name"]);
//!
//! let mut registry = Registry::new();
//! registry.register(greet)?;
//!
//! let response = registry
//!     .http_handler(Request::post("/greet", json!({ "name": "Amy" })), |req| async move {
//!         fallback(req).await
//!     })
//!     .await;
//! ```

pub mod config;
pub mod error;
pub mod function;
pub mod http;
pub mod invoke;
pub mod loader;
pub mod openapi;
pub mod registry;
pub mod response;
pub mod table;
pub mod validate;

// Re-export main types at crate root
pub use config::{Config, DuplicatePolicy, Loader};
pub use error::{Error, Result};
pub use function::{Function, FunctionId};
pub use http::{Dispatch, Request};
pub use invoke::{Callable, Context, Fault, Outcome, Reply};
pub use registry::{Namespace, Node, Registrable, Registry};
pub use validate::{JsonSchema, ValidationError, Validator};

// Re-export commonly used dependencies for convenience
pub use hyper::Method;
pub use serde_json::json;
