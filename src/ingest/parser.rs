use serde_json::Value;

/// Parse a fetched response body. Event sources only publish JSON.
pub fn parse_body(body: &[u8]) -> Result<Value, String> {
    serde_json::from_slice(body).map_err(|e| format!("Invalid JSON: {e}"))
}

/// The declared schema version of a payload, if it has one.
pub fn declared_version(payload: &Value) -> Option<&str> {
    payload.get("version").and_then(|v| v.as_str())
}
