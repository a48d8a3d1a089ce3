//! OpenAPI path items generated from function metadata.

use serde_json::{Map, Value, json};

use crate::config::Docs;
use crate::function::Function;
use crate::http::SPECIFIER_SEPARATOR;

const JSON_MEDIA_TYPE: &str = "application/json";

/// Documentation path item for one function, keyed by its route.
///
/// Every function is documented as a single POST operation. Each mapping
/// specifier becomes a required parameter, located in the body when the
/// specifier starts with `body` and in a header otherwise.
pub fn path_item(function: &Function) -> (String, Value) {
    let path = function.path().unwrap_or_default();
    let key = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    let parameters: Vec<Value> = function
        .http_mapper()
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, specifier)| {
            let location = if specifier.starts_with("body") { "body" } else { "header" };
            let name = specifier.rsplit(SPECIFIER_SEPARATOR).next().unwrap_or(specifier);
            let mut param = json!({ "name": name, "in": location, "required": true });
            if let Some(schema) = function.param_types().get(i) {
                param["schema"] = schema.clone();
            }
            param
        })
        .collect();

    let mut responses = Map::new();
    if let Some(schema) = function.return_type() {
        responses.insert(
            "200".into(),
            json!({ "description": "Successful response", "schema": schema }),
        );
    }

    let mut operation = Map::new();
    if let Some(title) = function.title() {
        operation.insert("summary".into(), Value::String(title.to_string()));
    }
    if let Some(description) = function.description() {
        operation.insert("description".into(), Value::String(description.to_string()));
    }
    operation.insert("consumes".into(), json!([JSON_MEDIA_TYPE]));
    operation.insert("produces".into(), json!([JSON_MEDIA_TYPE]));
    operation.insert("responses".into(), Value::Object(responses));
    operation.insert("tags".into(), json!([]));
    operation.insert("operationId".into(), Value::String(function.name().to_string()));
    operation.insert("parameters".into(), Value::Array(parameters));

    (key, json!({ "post": operation }))
}

/// Wrap merged path items in a minimal OpenAPI document.
pub fn generate(docs: &Docs, paths: Map<String, Value>) -> Value {
    json!({
        "openapi": "3.0.0",
        "info": {
            "title": docs.title,
            "version": docs.version,
        },
        "paths": paths,
    })
}
