use serde::Serialize;
use serde_json::Value;

use crate::models::PathSegment;
use crate::schema::Schema;

/// The first schema violation found in a payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Keys and array indices leading from the document root to the offending node.
    pub path: Vec<PathSegment>,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            return write!(f, "{}", self.message);
        }
        let path = self
            .path
            .iter()
            .map(|segment| match segment {
                PathSegment::Key(key) => key.clone(),
                PathSegment::Index(index) => index.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{path}: {}", self.message)
    }
}

/// Validate `payload` against `schema`, reporting only the first error in the
/// validator's discovery order.
pub fn validate(payload: &Value, schema: &Schema) -> Result<(), ValidationError> {
    match schema.validator().iter_errors(payload).next() {
        None => Ok(()),
        Some(err) => Err(ValidationError {
            path: locate(payload, &err.instance_path.to_string()),
            message: err.to_string(),
        }),
    }
}

/// Turn a JSON pointer into path segments. A segment is an index only where
/// the node it selects from is an array, so object keys like `"0"` stay keys.
fn locate(payload: &Value, pointer: &str) -> Vec<PathSegment> {
    let mut node = Some(payload);
    let mut path = Vec::new();

    for raw in pointer.split('/').skip(1) {
        let token = raw.replace("~1", "/").replace("~0", "~");
        let segment = match (node, token.parse::<usize>()) {
            (Some(Value::Array(items)), Ok(index)) => {
                node = items.get(index);
                PathSegment::Index(index)
            }
            (current, _) => {
                node = current.and_then(|v| v.get(&token));
                PathSegment::Key(token)
            }
        };
        path.push(segment);
    }

    path
}
