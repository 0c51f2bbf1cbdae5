//! Storage encoding for list-valued event attributes.
//!
//! A list is stored as one string with a delimiter on both ends and between
//! elements: `["en", "de"]` becomes `",en,de,"` and `[]` becomes `",,"`.

pub const DELIMITER: char = ',';

pub fn encode(items: &[String]) -> String {
    let mut out = String::with_capacity(items.iter().map(|s| s.len() + 1).sum::<usize>() + 2);
    out.push(DELIMITER);
    out.push_str(&items.join(","));
    out.push(DELIMITER);
    out
}

/// Decode a stored list. A missing or empty value decodes to `[]`, never `[""]`.
pub fn decode(stored: Option<&str>) -> Vec<String> {
    let inner = stored.unwrap_or("").trim_matches(DELIMITER);
    if inner.is_empty() {
        return Vec::new();
    }
    inner.split(DELIMITER).map(str::to_string).collect()
}
