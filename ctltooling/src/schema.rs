//! Argument schemas derived with `schemars` and enforced with `jsonschema`.
//!
//! The document a tool advertises in `tools/list` is the same document its
//! arguments are checked against, so a call the dispatcher accepts always
//! conforms to what the model was shown.
//!
//! ```rust
//! use ctltooling::ArgumentSchema;
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Deserialize, JsonSchema)]
//! #[serde(rename_all = "camelCase")]
//! #[allow(dead_code)]
//! struct AddCartItem {
//!     product_variant_id: String,
//!     #[schemars(range(min = 1))]
//!     quantity: u32,
//! }
//!
//! let schema = ArgumentSchema::of::<AddCartItem>();
//! assert_eq!(schema.input_schema()["required"], json!(["productVariantId", "quantity"]));
//! assert!(schema.validate(&json!({"productVariantId": "v1", "quantity": 2})).is_ok());
//!
//! let violations = schema
//!     .validate(&json!({"productVariantId": "v1", "quantity": 0}))
//!     .expect_err("quantity below minimum");
//! assert_eq!(violations[0].path, "/quantity");
//! ```

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use jsonschema::Validator;
use schemars::{JsonSchema, schema_for};
use serde::Serialize;
use serde_json::{Value, json};

/// Keys describing the document itself rather than the arguments.
const DOCUMENT_KEYS: [&str; 2] = ["$schema", "title"];

#[derive(Clone)]
pub struct ArgumentSchema {
    document: Value,
    validator: Result<Arc<Validator>, String>,
}

impl ArgumentSchema {
    pub fn of<A: JsonSchema>() -> Self {
        Self::from_document(json!(schema_for!(A)))
    }

    /// A document that fails to compile rejects every call.
    pub fn from_document(document: Value) -> Self {
        let validator = jsonschema::options()
            .should_validate_formats(true)
            .build(&document)
            .map(Arc::new)
            .map_err(|err| err.to_string());

        Self {
            document,
            validator,
        }
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn input_schema(&self) -> Value {
        let mut advertised = self.document.clone();
        if let Some(fields) = advertised.as_object_mut() {
            for key in DOCUMENT_KEYS {
                fields.remove(key);
            }
        }
        advertised
    }

    /// Reports every violation, not just the first.
    pub fn validate(&self, arguments: &Value) -> Result<(), Vec<SchemaViolation>> {
        let validator = match &self.validator {
            Ok(validator) => validator,
            Err(message) => {
                return Err(vec![SchemaViolation::new(
                    "",
                    format!("argument schema does not compile: {message}"),
                )]);
            }
        };

        let violations = validator
            .iter_errors(arguments)
            .map(|error| SchemaViolation::new(error.instance_path.to_string(), error.to_string()))
            .collect::<Vec<_>>();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

impl std::fmt::Debug for ArgumentSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentSchema")
            .field("document", &self.document)
            .field("compiled", &self.validator.is_ok())
            .finish()
    }
}

/// Input schema advertised for a tool; no schema means zero arguments.
pub fn input_schema(schema: Option<&ArgumentSchema>) -> Value {
    match schema {
        Some(schema) => schema.input_schema(),
        None => json!({"type": "object", "properties": {}}),
    }
}

/// Validates call arguments. A zero-argument tool accepts an object or null.
pub fn validate_arguments(
    schema: Option<&ArgumentSchema>,
    arguments: &Value,
) -> Result<(), Vec<SchemaViolation>> {
    match schema {
        Some(schema) => schema.validate(arguments),
        None if arguments.is_null() || arguments.is_object() => Ok(()),
        None => Err(vec![SchemaViolation::new(
            "",
            format!("expected an object, found {}", type_name(arguments)),
        )]),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    /// JSON pointer into the arguments; empty for the arguments object itself.
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl Display for SchemaViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "arguments: {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use schemars::JsonSchema;
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Address {
        #[schemars(length(min = 1))]
        name: String,
        street1: String,
        street2: Option<String>,
        #[schemars(length(max = 10))]
        zip: String,
        /// Phone number
        phone: Option<String>,
    }

    #[derive(Deserialize, JsonSchema)]
    #[allow(dead_code)]
    struct Subscriber {
        #[schemars(email)]
        email: String,
    }

    #[test]
    fn derived_schema_keeps_field_order_and_drops_document_keys() {
        let rendered = ArgumentSchema::of::<Address>().input_schema();
        let keys = rendered["properties"]
            .as_object()
            .expect("properties object")
            .keys()
            .cloned()
            .collect::<Vec<_>>();

        assert_eq!(keys, vec!["name", "street1", "street2", "zip", "phone"]);
        assert_eq!(rendered["required"], json!(["name", "street1", "zip"]));
        assert_eq!(rendered["properties"]["phone"]["description"], "Phone number");
        assert_eq!(rendered["properties"]["name"]["minLength"], 1);
        assert!(rendered.get("$schema").is_none());
        assert!(rendered.get("title").is_none());
    }

    #[test]
    fn every_violation_is_reported_with_a_path() {
        let violations = ArgumentSchema::of::<Address>()
            .validate(&json!({"name": "", "street1": 7, "zip": "12345678901"}))
            .expect_err("arguments should be rejected");

        let mut paths = violations
            .iter()
            .map(|violation| violation.path.as_str())
            .collect::<Vec<_>>();
        paths.sort_unstable();
        assert_eq!(paths, vec!["/name", "/street1", "/zip"]);
    }

    #[test]
    fn missing_required_fields_are_reported_on_the_object() {
        let violations = ArgumentSchema::of::<Address>()
            .validate(&json!({"name": "Ada", "zip": "1", "street2": null}))
            .expect_err("street1 is required");

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "");
        assert!(violations[0].message.contains("street1"));
    }

    #[test]
    fn null_is_only_accepted_where_the_document_allows_it() {
        let document = json!({
            "type": "object",
            "properties": {"email": {"type": "string", "format": "email"}}
        });
        let schema = ArgumentSchema::from_document(document.clone());

        assert_eq!(schema.input_schema(), document);
        assert!(schema.validate(&json!({})).is_ok());
        let violations = schema
            .validate(&json!({"email": null}))
            .expect_err("null is not a string");
        assert_eq!(violations[0].path, "/email");

        let derived = ArgumentSchema::of::<Address>();
        assert!(
            derived
                .validate(&json!({"name": "Ada", "street1": "1 Way", "zip": "1", "phone": null}))
                .is_ok()
        );
    }

    #[test]
    fn email_format_is_checked() {
        let schema = ArgumentSchema::of::<Subscriber>();

        assert!(schema.validate(&json!({"email": "ada@example.com"})).is_ok());
        assert!(schema.validate(&json!({"email": "not-an-email"})).is_err());
        assert_eq!(schema.input_schema()["properties"]["email"]["format"], "email");
    }

    #[test]
    fn broken_documents_reject_every_call() {
        let schema = ArgumentSchema::from_document(json!({"type": 12}));
        let violations = schema.validate(&json!({})).expect_err("schema is broken");
        assert!(violations[0].message.starts_with("argument schema does not compile"));
    }

    #[test]
    fn zero_argument_tools_accept_objects_or_null() {
        assert_eq!(input_schema(None), json!({"type": "object", "properties": {}}));
        assert!(validate_arguments(None, &Value::Null).is_ok());
        assert!(validate_arguments(None, &json!({"ignored": 1})).is_ok());

        let violations = validate_arguments(None, &json!([1])).expect_err("array is not allowed");
        assert_eq!(violations[0].to_string(), "arguments: expected an object, found array");
    }
}
