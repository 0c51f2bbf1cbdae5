use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde_json::Value;

use crate::db::delimited::DELIMITER;
use crate::db::text::NUL;
use crate::models::event::DEFAULT_TIMEZONE;
use crate::models::Event;

static CAPITAL_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z]+)").unwrap());

/// Attributes held as lists, by their singular name.
const LIST_ATTRIBUTES: &[&str] = &["tag", "language"];

/// Convert a camelCase payload key to the event's snake_case attribute name.
///
/// An underscore goes before every capital run that follows a lowercase
/// letter or digit: `startDate` -> `start_date`, `cfpURL` -> `cfp_url`.
pub fn normalize(field_name: &str) -> String {
    CAPITAL_RUN_RE
        .replace_all(field_name, "${1}_${2}")
        .to_lowercase()
}

/// The list attribute a normalized name refers to, if its singular form is one.
fn list_attribute(local_name: &str) -> Option<&'static str> {
    let singular = local_name.strip_suffix('s')?;
    LIST_ATTRIBUTES.iter().copied().find(|attr| *attr == singular)
}

/// Parses `value` into the typed attribute and assigns it. Returns whether the
/// attribute changed; `Err` carries a message for values of the wrong shape.
type Apply = fn(&mut Event, &Value) -> Result<bool, String>;

pub struct FieldBinding {
    pub attribute: &'static str,
    apply: Apply,
}

impl FieldBinding {
    pub fn apply(&self, event: &mut Event, value: &Value) -> Result<bool, String> {
        (self.apply)(event, value)
    }
}

/// Typed setters for every payload-writable event attribute, keyed by local
/// attribute name. Built once and shared by all ingestions.
pub struct FieldTable {
    bindings: HashMap<&'static str, FieldBinding>,
    lists: HashMap<&'static str, FieldBinding>,
}

impl Default for FieldTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldTable {
    pub fn new() -> Self {
        let mut table = Self {
            bindings: HashMap::new(),
            lists: HashMap::new(),
        };

        table.bind("short_name", |e, v| assign(&mut e.short_name, opt_string(v)?));
        table.bind("name", |e, v| assign(&mut e.name, opt_string(v)?));
        table.bind("start_date", |e, v| assign(&mut e.start_date, opt_date(v)?));
        table.bind("end_date", |e, v| assign(&mut e.end_date, opt_date(v)?));
        table.bind("cfp_deadline", |e, v| assign(&mut e.cfp_deadline, opt_datetime(v)?));
        table.bind("timezone", |e, v| {
            let tz = opt_string(v)?.unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
            assign(&mut e.timezone, tz)
        });
        table.bind("organizer", |e, v| assign(&mut e.organizer, opt_string(v)?));
        table.bind("email", |e, v| assign(&mut e.email, opt_string(v)?));
        table.bind("is_accessible_for_free", |e, v| {
            assign(&mut e.is_accessible_for_free, flag(v)?)
        });
        table.bind("maximum_attendee_capacity", |e, v| {
            assign(&mut e.maximum_attendee_capacity, opt_count(v)?)
        });
        table.bind("location", |e, v| assign(&mut e.location, opt_string(v)?));
        table.bind("coordinates", |e, v| assign(&mut e.coordinates, opt_string(v)?));
        table.bind("description", |e, v| assign(&mut e.description, opt_string(v)?));
        table.bind("color", |e, v| assign(&mut e.color, opt_string(v)?));
        table.bind("urls", |e, v| assign(&mut e.urls, string_map(v)?));
        table.bind("hashtag", |e, v| assign(&mut e.hashtag, opt_string(v)?));
        table.bind("social_media_accounts", |e, v| {
            assign(&mut e.social_media_accounts, string_map(v)?)
        });
        table.bind("tooling", |e, v| {
            if has_nul(v) {
                return Err(NUL_MESSAGE.to_string());
            }
            let tooling = (!v.is_null()).then(|| v.clone());
            assign(&mut e.tooling, tooling)
        });

        table.bind_list("tag", "tags", |e, v| assign(&mut e.tags, string_list(v)?));
        table.bind_list("language", "languages", |e, v| assign(&mut e.languages, string_list(v)?));

        table
    }

    fn bind(&mut self, attribute: &'static str, apply: Apply) {
        self.bindings
            .insert(attribute, FieldBinding { attribute, apply });
    }

    fn bind_list(&mut self, singular: &'static str, attribute: &'static str, apply: Apply) {
        self.lists
            .insert(singular, FieldBinding { attribute, apply });
    }

    /// Find the setter for a payload key. Plural forms of list attributes
    /// (`tags`, `languages`) resolve to the list setter.
    pub fn resolve(&self, field_name: &str) -> Option<&FieldBinding> {
        let local = normalize(field_name);
        if let Some(list) = list_attribute(&local) {
            return self.lists.get(list);
        }
        self.bindings.get(local.as_str())
    }
}

const NUL_MESSAGE: &str = "Text must not contain NUL characters";

/// Whether any key or string anywhere in `value` contains NUL.
fn has_nul(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains(NUL),
        Value::Array(items) => items.iter().any(has_nul),
        Value::Object(map) => map.iter().any(|(k, v)| k.contains(NUL) || has_nul(v)),
        _ => false,
    }
}

fn assign<T: PartialEq>(slot: &mut T, value: T) -> Result<bool, String> {
    if *slot == value {
        return Ok(false);
    }
    *slot = value;
    Ok(true)
}

fn opt_string(value: &Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.contains(NUL) => Err(NUL_MESSAGE.to_string()),
        Value::String(s) => Ok(Some(s.clone())),
        _ => Err("Expected a string".to_string()),
    }
}

fn opt_date(value: &Value) -> Result<Option<NaiveDate>, String> {
    opt_string(value)?
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| format!("Invalid date '{s}': {e}"))
        })
        .transpose()
}

fn opt_datetime(value: &Value) -> Result<Option<DateTime<Utc>>, String> {
    opt_string(value)?
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| format!("Invalid date-time '{s}': {e}"))
        })
        .transpose()
}

fn flag(value: &Value) -> Result<bool, String> {
    match value {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        _ => Err("Expected a boolean".to_string()),
    }
}

fn opt_count(value: &Value) -> Result<Option<u32>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| format!("Expected a non-negative integer, got {n}")),
        _ => Err("Expected a non-negative integer".to_string()),
    }
}

fn string_map(value: &Value) -> Result<BTreeMap<String, String>, String> {
    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| match v {
                _ if k.contains(NUL) => Err(NUL_MESSAGE.to_string()),
                Value::String(s) if s.contains(NUL) => Err(NUL_MESSAGE.to_string()),
                Value::String(s) => Ok((k.clone(), s.clone())),
                _ => Err(format!("Expected a string value for '{k}'")),
            })
            .collect(),
        _ => Err("Expected an object".to_string()),
    }
}

fn string_list(value: &Value) -> Result<Vec<String>, String> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        _ => return Err("Expected an array of strings".to_string()),
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(s) if s.contains(NUL) => Err(NUL_MESSAGE.to_string()),
            Value::String(s) if s.is_empty() => Err("List items must not be empty".to_string()),
            Value::String(s) if s.contains(DELIMITER) => {
                Err(format!("List items must not contain '{DELIMITER}': {s}"))
            }
            Value::String(s) => Ok(s.clone()),
            _ => Err("Expected an array of strings".to_string()),
        })
        .collect()
}
