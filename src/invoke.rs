//! Safe invocation of registered callables.
//!
//! [`invoke`] validates the arguments, calls the callable and folds every
//! outcome into an [`Outcome`]. Returned errors, panics and failed deferred
//! replies all come back as a [`Fault`] value; none of them unwinds past
//! this module.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;

use futures::FutureExt;
use hyper::HeaderMap;
use serde_json::Value;

use crate::function::Function;
use crate::validate::{self, ValidationError, Validator};

/// Boxed future for deferred replies.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a safe invocation.
pub type Outcome = std::result::Result<Value, Fault>;

/// Normalized invocation failure, returned as data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Invocation(String),

    #[error("Unknown function path: {0}")]
    Routing(String),
}

impl Fault {
    /// Index of the offending argument for validation faults.
    pub fn param_index(&self) -> Option<usize> {
        match self {
            Fault::Validation(e) => Some(e.index),
            _ => None,
        }
    }
}

/// What a callable hands back: a value now, or a value later.
pub enum Reply {
    Ready(anyhow::Result<Value>),
    Deferred(BoxFuture<'static, anyhow::Result<Value>>),
}

/// Ambient data a callable is invoked with.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Request path when invoked through HTTP dispatch.
    pub path: Option<String>,
    /// Request headers when invoked through HTTP dispatch.
    pub headers: HeaderMap,
}

/// A unit of invocable logic.
pub trait Callable: Send + Sync + 'static {
    fn call(&self, ctx: Context, args: Vec<Value>) -> Reply;
}

impl<F> Callable for F
where
    F: Fn(Context, Vec<Value>) -> Reply + Send + Sync + 'static,
{
    fn call(&self, ctx: Context, args: Vec<Value>) -> Reply {
        self(ctx, args)
    }
}

/// Validate `args` against the function's parameter schemas, then call it.
pub async fn invoke(
    function: &Function,
    validator: &dyn Validator,
    ctx: Context,
    args: Vec<Value>,
) -> Outcome {
    validate::validate(validator, &args, function.param_types())?;

    let callable = function.callable();
    let reply = match panic::catch_unwind(AssertUnwindSafe(|| callable.call(ctx, args))) {
        Ok(reply) => reply,
        Err(payload) => return Err(panicked(function, payload)),
    };

    let result = match reply {
        Reply::Ready(result) => result,
        Reply::Deferred(future) => match AssertUnwindSafe(future).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => return Err(panicked(function, payload)),
        },
    };

    result.map_err(|e| Fault::Invocation(format!("{e:#}")))
}

fn panicked(function: &Function, payload: Box<dyn Any + Send>) -> Fault {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    };
    tracing::warn!("Function {} panicked: {message}", function.name());
    Fault::Invocation(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::JsonSchema;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn echo() -> Function {
        Function::sync("echo", |_ctx, args| Ok(Value::Array(args)))
    }

    #[tokio::test]
    async fn test_success_returns_value_unchanged() {
        let f = echo().with_param_types([json!({ "type": "string" })]);
        let out = invoke(&f, &JsonSchema, Context::default(), vec![json!("a"), json!(2)]).await;
        assert_eq!(out, Ok(json!(["a", 2])));
    }

    #[tokio::test]
    async fn test_return_type_is_not_enforced() {
        let f = Function::sync("answer", |_ctx, _args| Ok(json!(42)))
            .with_return_type(json!({ "type": "string" }));
        let out = invoke(&f, &JsonSchema, Context::default(), vec![]).await;
        assert_eq!(out, Ok(json!(42)));
    }

    #[tokio::test]
    async fn test_validation_failure_skips_call() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let f = Function::sync("side_effect", move |_ctx, _args| {
            flag.store(true, Ordering::SeqCst);
            Ok(Value::Null)
        })
        .with_param_types([json!({ "type": "string" }), json!({ "type": "integer" })]);

        let out = invoke(&f, &JsonSchema, Context::default(), vec![json!("x"), json!("y")]).await;

        let fault = out.unwrap_err();
        assert_eq!(fault.param_index(), Some(1));
        assert!(fault.to_string().contains("param 1"));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_returned_error_becomes_fault() {
        let f = Function::sync("fails", |_ctx, _args| anyhow::bail!("disk on fire"));
        let out = invoke(&f, &JsonSchema, Context::default(), vec![]).await;
        assert_eq!(out, Err(Fault::Invocation("disk on fire".into())));
    }

    #[tokio::test]
    async fn test_panic_becomes_fault() {
        let f = Function::sync("panics", |_ctx, _args| panic!("unexpected state"));
        let out = invoke(&f, &JsonSchema, Context::default(), vec![]).await;
        assert_eq!(out, Err(Fault::Invocation("unexpected state".into())));
    }

    #[tokio::test]
    async fn test_deferred_success() {
        let f = Function::deferred("later", |_ctx, args| async move {
            tokio::task::yield_now().await;
            anyhow::Ok(json!(args.len()))
        });
        let out = invoke(&f, &JsonSchema, Context::default(), vec![json!(1), json!(2)]).await;
        assert_eq!(out, Ok(json!(2)));
    }

    #[tokio::test]
    async fn test_deferred_failure_resolves_to_fault() {
        let f = Function::deferred("later_fails", |_ctx, _args| async move {
            tokio::task::yield_now().await;
            Err::<Value, _>(anyhow::anyhow!("upstream timed out"))
        });
        let out = invoke(&f, &JsonSchema, Context::default(), vec![]).await;
        assert_eq!(out, Err(Fault::Invocation("upstream timed out".into())));
    }

    #[tokio::test]
    async fn test_deferred_panic_resolves_to_fault() {
        let f = Function::deferred("later_panics", |_ctx, args| async move {
            tokio::task::yield_now().await;
            if args.is_empty() {
                panic!("{}", String::from("formatted panic"));
            }
            anyhow::Ok(Value::Null)
        });
        let out = invoke(&f, &JsonSchema, Context::default(), vec![]).await;
        assert_eq!(out, Err(Fault::Invocation("formatted panic".into())));
    }

    #[tokio::test]
    async fn test_context_is_passed_through() {
        let f = Function::sync("whoami", |ctx, _args| Ok(json!(ctx.path)));
        let ctx = Context {
            path: Some("/whoami".into()),
            ..Default::default()
        };
        assert_eq!(invoke(&f, &JsonSchema, ctx, vec![]).await, Ok(json!("/whoami")));
    }
}
