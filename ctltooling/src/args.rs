//! Argument extraction helpers for tool bodies.
//!
//! ```rust
//! use ctltooling::{optional_string, parse_arguments, required_string};
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Deserialize)]
//! struct Lookup {
//!     id: String,
//! }
//!
//! let args = json!({"id": "prd_1", "note": "fast"});
//! let lookup: Lookup = parse_arguments(args.clone()).expect("arguments should parse");
//! assert_eq!(lookup.id, "prd_1");
//! assert_eq!(required_string(&args, "id").expect("id should exist"), "prd_1");
//! assert_eq!(optional_string(&args, "missing"), None);
//! ```

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::ToolError;

/// Deserializes arguments into `T`; null is treated as an empty object.
pub fn parse_arguments<T>(arguments: Value) -> Result<T, ToolError>
where
    T: DeserializeOwned,
{
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };

    serde_json::from_value(arguments)
        .map_err(|err| ToolError::invalid_arguments(format!("invalid arguments: {err}")))
}

pub fn required_string(arguments: &Value, key: &str) -> Result<String, ToolError> {
    optional_string(arguments, key)
        .ok_or_else(|| ToolError::invalid_arguments(format!("missing required string: '{key}'")))
}

pub fn optional_string(arguments: &Value, key: &str) -> Option<String> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}
