//! Argument validation against per-parameter schemas.
//!
//! The [`Validator`] trait keeps the schema engine pluggable. [`JsonSchema`]
//! is the stock implementation backed by the `jsonschema` crate.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use serde_json::Value;

/// Compiled validators keyed by the schema's JSON text.
static COMPILED: LazyLock<RwLock<HashMap<String, Arc<jsonschema::Validator>>>> =
    LazyLock::new(Default::default);

/// Checks a single value against a single schema.
pub trait Validator: Send + Sync {
    /// Returns the validator's diagnostics when `value` does not satisfy `schema`.
    fn check(&self, value: &Value, schema: &Value) -> Result<(), Vec<String>>;
}

/// JSON Schema validation (draft auto-detected from `$schema`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchema;

impl Validator for JsonSchema {
    fn check(&self, value: &Value, schema: &Value) -> Result<(), Vec<String>> {
        let validator = compiled(schema).map_err(|e| vec![format!("Invalid schema: {e}")])?;
        let errors: Vec<String> = validator.iter_errors(value).map(|e| e.to_string()).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Compile `schema` once and reuse it for every later check.
fn compiled(schema: &Value) -> Result<Arc<jsonschema::Validator>, jsonschema::ValidationError<'static>> {
    let key = schema.to_string();
    if let Some(validator) = COMPILED
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(Arc::clone(validator));
    }

    let validator = Arc::new(jsonschema::validator_for(schema)?);
    COMPILED
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(key, Arc::clone(&validator));
    Ok(validator)
}

/// An argument failed the schema declared for its position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid function call on param {index}: {}", .diagnostics.join(", "))]
pub struct ValidationError {
    pub index: usize,
    pub diagnostics: Vec<String>,
}

/// Validate `args` position by position against `param_types`.
///
/// Arguments past the end of `param_types` are passed through unchecked.
/// Stops at the first failing position.
pub fn validate(
    validator: &dyn Validator,
    args: &[Value],
    param_types: &[Value],
) -> Result<(), ValidationError> {
    for (index, (arg, schema)) in args.iter().zip(param_types).enumerate() {
        validator
            .check(arg, schema)
            .map_err(|diagnostics| ValidationError { index, diagnostics })?;
    }
    Ok(())
}
