//! Function descriptors: a callable plus the metadata it is served with.
//!
//! A [`Function`] owns a shared reference to its [`Callable`] and carries the
//! path, title, description, parameter schemas, return hint and HTTP mapping
//! used by the registry. Metadata is meant to be settled before registration.
//!
//! # Example
//!
//! ```ignore
//! use funcset::Function;
//! use serde_json::json;
//!
//! let greet = Function::sync("greet", |_ctx, args| {
//!     Ok(json!(format!("Hello {}", args[0].as_str().unwrap_or_default())))
//! })
//! .with_path("/greet")
//! .with_title("Greet")
//! .with_param_types([json!({ "type": "string" })])
//! .with_http_mapper(["body:name"]);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use schemars::JsonSchema;
use serde_json::{Value, json};

use crate::invoke::{self, Callable, Context, Outcome, Reply};
use crate::validate::{JsonSchema as JsonSchemaValidator, Validator};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a function, shared by all of its clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(u64);

/// A callable together with its descriptor metadata.
#[derive(Clone)]
pub struct Function {
    id: FunctionId,
    name: String,
    callable: Arc<dyn Callable>,
    path: Option<String>,
    title: Option<String>,
    description: Option<String>,
    param_types: Option<Vec<Value>>,
    return_type: Option<Value>,
    http_mapper: Option<Vec<String>>,
}

impl Function {
    /// Wrap a callable under the given operation name.
    pub fn new(name: impl Into<String>, callable: impl Callable) -> Self {
        Self {
            id: FunctionId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            callable: Arc::new(callable),
            path: None,
            title: None,
            description: None,
            param_types: None,
            return_type: None,
            http_mapper: None,
        }
    }

    /// Wrap a closure that answers immediately.
    pub fn sync<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Context, Vec<Value>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::new(name, move |ctx: Context, args: Vec<Value>| {
            Reply::Ready(f(ctx, args))
        })
    }

    /// Wrap a closure that answers with a future.
    pub fn deferred<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Context, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self::new(name, move |ctx: Context, args: Vec<Value>| {
            Reply::Deferred(Box::pin(f(ctx, args)))
        })
    }

    pub fn id(&self) -> FunctionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Declared parameter schemas; empty when none were set.
    pub fn param_types(&self) -> &[Value] {
        self.param_types.as_deref().unwrap_or_default()
    }

    /// Whether parameter schemas were declared at all.
    pub fn has_param_types(&self) -> bool {
        self.param_types.is_some()
    }

    pub fn return_type(&self) -> Option<&Value> {
        self.return_type.as_ref()
    }

    pub fn http_mapper(&self) -> Option<&[String]> {
        self.http_mapper.as_deref()
    }

    pub(crate) fn callable(&self) -> &dyn Callable {
        self.callable.as_ref()
    }

    // Setters: plain assignment, last write wins.

    pub fn set_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.path = Some(path.into());
        self
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn set_http_mapper<I, S>(&mut self, mappings: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.http_mapper = Some(mappings.into_iter().map(Into::into).collect());
        self
    }

    pub fn set_param_types<I>(&mut self, schemas: I) -> &mut Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.param_types = Some(schemas.into_iter().collect());
        self
    }

    pub fn set_return_type(&mut self, schema: Value) -> &mut Self {
        self.return_type = Some(schema);
        self
    }

    // Builders for construction sites.

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.set_path(path);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.set_title(title);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.set_description(description);
        self
    }

    pub fn with_http_mapper<I, S>(mut self, mappings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_http_mapper(mappings);
        self
    }

    pub fn with_param_types<I>(mut self, schemas: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.set_param_types(schemas);
        self
    }

    /// Append the JSON Schema of `T` as the next parameter schema.
    pub fn with_param_type<T: JsonSchema>(mut self) -> Self {
        let schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or(json!({}));
        self.param_types.get_or_insert_with(Vec::new).push(schema);
        self
    }

    pub fn with_return_type(mut self, schema: Value) -> Self {
        self.set_return_type(schema);
        self
    }

    /// Invoke with the stock JSON Schema validator.
    pub async fn invoke(&self, ctx: Context, args: Vec<Value>) -> Outcome {
        invoke::invoke(self, &JsonSchemaValidator, ctx, args).await
    }

    /// Invoke with a caller-supplied validator.
    pub async fn invoke_with(
        &self,
        validator: &dyn Validator,
        ctx: Context,
        args: Vec<Value>,
    ) -> Outcome {
        invoke::invoke(self, validator, ctx, args).await
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("path", &self.path)
            .field("title", &self.title)
            .field("param_types", &self.param_types)
            .field("http_mapper", &self.http_mapper)
            .finish_non_exhaustive()
    }
}
