//! Declarative field validation.
//!
//! # Responsibility
//! - Check a `Data` map against per-field rule lists.
//! - Report every failing field with human-readable messages.
//!
//! # Invariants
//! - Absent fields are only checked by `Required`.
//! - `Nullable` fields holding `null` skip every rule except `Required`.
//! - Field order in reports is deterministic (sorted by field name).

use crate::model::Data;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

static PATTERN_CACHE: Lazy<Mutex<HashMap<&'static str, Option<Regex>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// One validation constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Present, non-null, and not an empty string or empty array.
    Required,
    /// `null` is accepted and skips the remaining rules other than `Required`.
    Nullable,
    String,
    Integer,
    Numeric,
    Boolean,
    MinLength(usize),
    MaxLength(usize),
    Min(f64),
    Max(f64),
    In(&'static [&'static str]),
    /// Whole-value regular expression match on strings.
    Matches(&'static str),
}

/// Rule lists keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rules {
    fields: BTreeMap<String, Vec<Rule>>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.fields
            .entry(name.to_string())
            .or_default()
            .extend(rules);
        self
    }

    /// Subset of rules for the given field names.
    pub fn only<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut subset = Self::new();
        for name in names {
            if let Some(rules) = self.fields.get(name) {
                subset.fields.insert(name.to_string(), rules.clone());
            }
        }
        subset
    }

    pub fn get(&self, name: &str) -> Option<&[Rule]> {
        self.fields.get(name).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Per-field failure report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    fn push(&mut self, field: &str, message: String) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message);
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let summary = self
            .errors
            .values()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "validation failed: {summary}")
    }
}

impl Error for ValidationError {}

/// Validates `data` against `rules`.
pub fn validate(data: &Data, rules: &Rules) -> Result<(), ValidationError> {
    let mut report = ValidationError::default();

    for (field, field_rules) in &rules.fields {
        let value = data.get(field);

        let null_allowed =
            value.is_some_and(Value::is_null) && field_rules.contains(&Rule::Nullable);

        for rule in field_rules {
            if null_allowed && *rule != Rule::Required {
                continue;
            }
            let message = match value {
                None if *rule == Rule::Required => Some(format!("The {field} field is required.")),
                None => None,
                Some(value) => check(field, rule, value),
            };
            if let Some(message) = message {
                report.push(field, message);
                if *rule == Rule::Required {
                    break;
                }
            }
        }
    }

    if report.errors.is_empty() {
        Ok(())
    } else {
        Err(report)
    }
}

fn check(field: &str, rule: &Rule, value: &Value) -> Option<String> {
    let passed = match rule {
        Rule::Required => match value {
            Value::Null => false,
            Value::String(text) => !text.trim().is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => true,
        },
        Rule::Nullable => true,
        Rule::String => value.is_string(),
        Rule::Integer => value.is_i64() || value.is_u64(),
        Rule::Numeric => value.is_number(),
        Rule::Boolean => value.is_boolean() || matches!(value.as_i64(), Some(0 | 1)),
        Rule::MinLength(min) => value.as_str().map_or(true, |s| s.chars().count() >= *min),
        Rule::MaxLength(max) => value.as_str().map_or(true, |s| s.chars().count() <= *max),
        Rule::Min(min) => value.as_f64().map_or(true, |n| n >= *min),
        Rule::Max(max) => value.as_f64().map_or(true, |n| n <= *max),
        Rule::In(allowed) => value
            .as_str()
            .is_some_and(|s| allowed.iter().any(|candidate| *candidate == s)),
        Rule::Matches(pattern) => value
            .as_str()
            .is_some_and(|s| pattern_matches(pattern, s)),
    };

    if passed {
        return None;
    }

    Some(match rule {
        Rule::Required => format!("The {field} field is required."),
        Rule::Nullable => return None,
        Rule::String => format!("The {field} field must be a string."),
        Rule::Integer => format!("The {field} field must be an integer."),
        Rule::Numeric => format!("The {field} field must be a number."),
        Rule::Boolean => format!("The {field} field must be true or false."),
        Rule::MinLength(min) => format!("The {field} field must be at least {min} characters."),
        Rule::MaxLength(max) => {
            format!("The {field} field must not be greater than {max} characters.")
        }
        Rule::Min(min) => format!("The {field} field must be at least {min}."),
        Rule::Max(max) => format!("The {field} field must not be greater than {max}."),
        Rule::In(_) => format!("The selected {field} is invalid."),
        Rule::Matches(_) => format!("The {field} field format is invalid."),
    })
}

fn pattern_matches(pattern: &'static str, value: &str) -> bool {
    let mut cache = match PATTERN_CACHE.lock() {
        Ok(cache) => cache,
        Err(poisoned) => poisoned.into_inner(),
    };
    let compiled = cache
        .entry(pattern)
        .or_insert_with(|| Regex::new(&format!("^(?:{pattern})$")).ok());
    compiled.as_ref().is_some_and(|regex| regex.is_match(value))
}

#[cfg(test)]
mod tests {
    use super::{validate, Rule, Rules};
    use crate::model::Data;
    use serde_json::json;

    fn data(value: serde_json::Value) -> Data {
        value.as_object().cloned().expect("fixture should be an object")
    }

    fn category_rules() -> Rules {
        Rules::new()
            .field("name", [Rule::Required, Rule::String, Rule::MaxLength(8)])
            .field("position", [Rule::Nullable, Rule::Integer, Rule::Min(0.0)])
            .field("slug", [Rule::Matches("[a-z0-9-]+")])
    }

    #[test]
    fn passes_valid_payload() {
        let payload = data(json!({"name": "books", "position": 3, "slug": "books-1"}));
        validate(&payload, &category_rules()).expect("payload should validate");
    }

    #[test]
    fn required_reports_missing_and_blank_fields_once() {
        let err = validate(&data(json!({})), &category_rules()).unwrap_err();
        assert_eq!(err.messages("name"), ["The name field is required."]);

        let err = validate(&data(json!({"name": "  "})), &category_rules()).unwrap_err();
        assert_eq!(err.messages("name").len(), 1);
    }

    #[test]
    fn nullable_null_skips_remaining_rules() {
        let payload = data(json!({"name": "toys", "position": null}));
        validate(&payload, &category_rules()).expect("null position is allowed");
    }

    #[test]
    fn collects_failures_per_field() {
        let payload = data(json!({"name": "much-too-long", "position": -1, "slug": "No Caps"}));
        let err = validate(&payload, &category_rules()).unwrap_err();

        assert!(err.has("name"));
        assert!(err.has("position"));
        assert!(err.has("slug"));
        assert_eq!(
            err.messages("slug"),
            ["The slug field format is invalid."]
        );
    }

    #[test]
    fn only_keeps_requested_fields() {
        let subset = category_rules().only(["slug", "unknown"]);
        assert!(subset.get("slug").is_some());
        assert!(subset.get("name").is_none());
        validate(&data(json!({})), &subset).expect("absent optional field passes");
    }

    #[test]
    fn in_rule_accepts_listed_values_only() {
        let rules = Rules::new().field("status", [Rule::In(&["draft", "active"])]);
        validate(&data(json!({"status": "active"})), &rules).expect("listed value passes");
        let err = validate(&data(json!({"status": "gone"})), &rules).unwrap_err();
        assert_eq!(err.messages("status"), ["The selected status is invalid."]);
    }

    #[test]
    fn required_still_rejects_null_on_nullable_field() {
        let rules = Rules::new().field("name", [Rule::Required, Rule::Nullable, Rule::String]);
        let err = validate(&data(json!({"name": null})), &rules).unwrap_err();
        assert_eq!(err.messages("name"), ["The name field is required."]);

        let optional = Rules::new().field("name", [Rule::Nullable, Rule::String]);
        validate(&data(json!({"name": null})), &optional).expect("nullable null passes");
    }
}
