//! Structural parsing of untyped candidates into schema types.
//!
//! A [`Parser`] walks a `serde_json::Value` tree, records every violation it
//! meets with the path of the offending field, and keeps going so callers see
//! all problems in one pass. Types opt in by implementing [`Schema`].

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    InvalidType,
    MissingRequiredField,
    TooSmall,
    TooBig,
    InvalidEnumValue,
    InvalidUnionDiscriminator,
    InvalidString,
    InvalidDate,
}

impl ViolationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationCode::InvalidType => "invalid_type",
            ViolationCode::MissingRequiredField => "missing_required_field",
            ViolationCode::TooSmall => "too_small",
            ViolationCode::TooBig => "too_big",
            ViolationCode::InvalidEnumValue => "invalid_enum_value",
            ViolationCode::InvalidUnionDiscriminator => "invalid_union_discriminator",
            ViolationCode::InvalidString => "invalid_string",
            ViolationCode::InvalidDate => "invalid_date",
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structural problem found while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub path: String,
    pub message: String,
    pub code: ViolationCode,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} ({})", self.message, self.code)
        } else {
            write!(f, "{}: {} ({})", self.path, self.message, self.code)
        }
    }
}

/// How strictly required fields are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    #[default]
    Full,
    /// Missing required fields are filled with defaults instead of reported.
    /// Fields that are present are still fully checked.
    Partial,
}

#[derive(Debug, Clone)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Render a path the way the UI addresses fields: `skills[0].triggers[1].type`.
fn render_path(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Index(index) => {
                out.push_str(&format!("[{}]", index));
            }
        }
    }
    out
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

/// Implemented by every type that can be structurally parsed from JSON.
///
/// `parse` returns `None` only when the value has the wrong shape at this
/// level; nested problems are recorded on the parser and the value is still
/// built with defaults in their place.
pub trait Schema: Sized {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self>;
}

pub struct Parser {
    path: Vec<Segment>,
    violations: Vec<Violation>,
    strictness: Strictness,
}

impl Parser {
    pub fn new(strictness: Strictness) -> Self {
        Self {
            path: Vec::new(),
            violations: Vec::new(),
            strictness,
        }
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Parse a whole document and return the typed value only if nothing was
    /// reported anywhere in the tree.
    pub fn run<T: Schema>(value: &Value, strictness: Strictness) -> Result<T, Vec<Violation>> {
        let mut parser = Parser::new(strictness);
        let parsed = T::parse(value, &mut parser);
        parser.finish(parsed)
    }

    pub fn finish<T>(self, parsed: Option<T>) -> Result<T, Vec<Violation>> {
        match parsed {
            Some(value) if self.violations.is_empty() => Ok(value),
            Some(_) => Err(self.violations),
            None if self.violations.is_empty() => Err(vec![Violation {
                path: String::new(),
                message: "Value could not be parsed".to_string(),
                code: ViolationCode::InvalidType,
            }]),
            None => Err(self.violations),
        }
    }

    pub fn report(&mut self, code: ViolationCode, message: impl Into<String>) {
        self.violations.push(Violation {
            path: render_path(&self.path),
            message: message.into(),
            code,
        });
    }

    /// Run `f` with `key` appended to the current path.
    pub fn at<T>(&mut self, key: &str, f: impl FnOnce(&mut Self) -> T) -> T {
        self.path.push(Segment::Key(key.to_string()));
        let result = f(self);
        self.path.pop();
        result
    }

    fn at_index<T>(&mut self, index: usize, f: impl FnOnce(&mut Self) -> T) -> T {
        self.path.push(Segment::Index(index));
        let result = f(self);
        self.path.pop();
        result
    }

    fn invalid_type(&mut self, expected: &str, value: &Value) {
        self.report(
            ViolationCode::InvalidType,
            format!("Expected {}, received {}", expected, type_name(value)),
        );
    }

    pub fn object<'v>(&mut self, value: &'v Value) -> Option<&'v Map<String, Value>> {
        match value.as_object() {
            Some(map) => Some(map),
            None => {
                self.invalid_type("object", value);
                None
            }
        }
    }

    pub fn string<'v>(&mut self, value: &'v Value) -> Option<&'v str> {
        match value.as_str() {
            Some(s) => Some(s),
            None => {
                self.invalid_type("string", value);
                None
            }
        }
    }

    pub fn invalid_enum(&mut self, received: &str, allowed: &[&str]) {
        let options = allowed
            .iter()
            .map(|a| format!("'{}'", a))
            .collect::<Vec<_>>()
            .join(" | ");
        self.report(
            ViolationCode::InvalidEnumValue,
            format!("Invalid enum value. Expected {}, received '{}'", options, received),
        );
    }

    /// Optional field: absent and `null` both read as `None`.
    pub fn field<T: Schema>(&mut self, obj: &Map<String, Value>, key: &str) -> Option<T> {
        match obj.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => self.at(key, |p| T::parse(value, p)),
        }
    }

    /// Required field. In partial mode a missing value silently becomes
    /// `T::default()`.
    pub fn required<T: Schema + Default>(&mut self, obj: &Map<String, Value>, key: &str) -> T {
        match obj.get(key) {
            None | Some(Value::Null) => {
                if self.strictness == Strictness::Full {
                    self.missing(key);
                }
                T::default()
            }
            Some(value) => self.at(key, |p| T::parse(value, p)).unwrap_or_default(),
        }
    }

    /// Required regardless of strictness.
    pub fn always_required<T: Schema + Default>(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
    ) -> T {
        match obj.get(key) {
            None | Some(Value::Null) => {
                self.missing(key);
                T::default()
            }
            Some(value) => self.at(key, |p| T::parse(value, p)).unwrap_or_default(),
        }
    }

    fn missing(&mut self, key: &str) {
        self.at(key, |p| {
            p.report(ViolationCode::MissingRequiredField, "Required");
        });
    }

    pub fn defaulted<T: Schema>(&mut self, obj: &Map<String, Value>, key: &str, default: T) -> T {
        self.field(obj, key).unwrap_or(default)
    }

    /// Optional list that defaults to empty.
    pub fn list<T: Schema>(&mut self, obj: &Map<String, Value>, key: &str) -> Vec<T> {
        self.field::<Vec<T>>(obj, key).unwrap_or_default()
    }

    /// Required list with at least one element. In partial mode an empty
    /// list reads the same as a missing one.
    pub fn non_empty_list<T: Schema>(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        what: &str,
    ) -> Vec<T> {
        let items: Vec<T> = self.required(obj, key);
        let empty = obj
            .get(key)
            .and_then(Value::as_array)
            .is_some_and(|a| a.is_empty());
        if empty && self.strictness == Strictness::Full {
            self.at(key, |p| {
                p.report(
                    ViolationCode::TooSmall,
                    format!("At least one {} is required", what),
                )
            });
        }
        items
    }

    /// Required string with at least one character. Like a missing value,
    /// an empty one passes in partial mode.
    pub fn non_empty_string(&mut self, obj: &Map<String, Value>, key: &str) -> String {
        let value: String = self.required(obj, key);
        if self.strictness == Strictness::Full {
            self.check_non_empty(obj, key);
        }
        value
    }

    /// Like [`Parser::non_empty_string`] but enforced in partial mode too.
    pub fn always_non_empty_string(&mut self, obj: &Map<String, Value>, key: &str) -> String {
        let value: String = self.always_required(obj, key);
        self.check_non_empty(obj, key);
        value
    }

    /// Optional string that must not be empty when present.
    pub fn optional_non_empty_string(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
    ) -> Option<String> {
        let value: Option<String> = self.field(obj, key);
        self.check_non_empty(obj, key);
        value
    }

    fn check_non_empty(&mut self, obj: &Map<String, Value>, key: &str) {
        if obj.get(key).and_then(Value::as_str).is_some_and(str::is_empty) {
            self.at(key, |p| {
                p.report(
                    ViolationCode::TooSmall,
                    "String must contain at least 1 character(s)",
                )
            });
        }
    }

    /// Optional string that must match `pattern` when present.
    pub fn matching(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        pattern: &Regex,
        message: &str,
    ) -> Option<String> {
        let value: Option<String> = self.field(obj, key);
        match value {
            Some(s) if !pattern.is_match(&s) => {
                self.at(key, |p| p.report(ViolationCode::InvalidString, message));
                None
            }
            other => other,
        }
    }

    /// Optional integer constrained to `min..=max`.
    pub fn bounded_int(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        min: u32,
        max: u32,
    ) -> Option<u32> {
        let value = obj.get(key).filter(|v| !v.is_null())?;
        self.at(key, |p| p.bounded_int_value(value, min, max))
    }

    /// Required integer constrained to `min..=max`.
    pub fn required_bounded_int(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        min: u32,
        max: u32,
    ) -> u32 {
        match obj.get(key).filter(|v| !v.is_null()) {
            Some(value) => self
                .at(key, |p| p.bounded_int_value(value, min, max))
                .unwrap_or(min),
            None => {
                if self.strictness == Strictness::Full {
                    self.missing(key);
                }
                min
            }
        }
    }

    fn bounded_int_value(&mut self, value: &Value, min: u32, max: u32) -> Option<u32> {
        let number = match value.as_f64() {
            Some(n) => n,
            None => {
                self.invalid_type("number", value);
                return None;
            }
        };
        if number.fract() != 0.0 {
            self.report(ViolationCode::InvalidType, "Expected integer, received float");
            return None;
        }
        if number < f64::from(min) {
            self.report(
                ViolationCode::TooSmall,
                format!("Number must be greater than or equal to {}", min),
            );
            return None;
        }
        if number > f64::from(max) {
            self.report(
                ViolationCode::TooBig,
                format!("Number must be less than or equal to {}", max),
            );
            return None;
        }
        Some(number as u32)
    }

    /// Optional number constrained to `min..=max`.
    pub fn bounded_number(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        min: f64,
        max: f64,
    ) -> Option<f64> {
        let number: f64 = self.field(obj, key)?;
        if number < min {
            self.at(key, |p| {
                p.report(
                    ViolationCode::TooSmall,
                    format!("Number must be greater than or equal to {}", min),
                )
            });
            return None;
        }
        if number > max {
            self.at(key, |p| {
                p.report(
                    ViolationCode::TooBig,
                    format!("Number must be less than or equal to {}", max),
                )
            });
            return None;
        }
        Some(number)
    }
}

impl Schema for String {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        p.string(value).map(str::to_string)
    }
}

impl Schema for bool {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        match value.as_bool() {
            Some(b) => Some(b),
            None => {
                p.invalid_type("boolean", value);
                None
            }
        }
    }
}

impl Schema for f64 {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        match value.as_f64() {
            Some(n) => Some(n),
            None => {
                p.invalid_type("number", value);
                None
            }
        }
    }
}

impl Schema for Uuid {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let raw = p.string(value)?;
        match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                p.report(ViolationCode::InvalidString, "Invalid uuid");
                None
            }
        }
    }
}

impl Schema for DateTime<Utc> {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let raw = p.string(value)?;
        match DateTime::parse_from_rfc3339(raw) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(_) => {
                p.report(ViolationCode::InvalidDate, "Invalid datetime");
                None
            }
        }
    }
}

impl<T: Schema> Schema for Vec<T> {
    fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
        let items = match value.as_array() {
            Some(items) => items,
            None => {
                p.invalid_type("array", value);
                return None;
            }
        };
        Some(
            items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| p.at_index(i, |p| T::parse(item, p)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default)]
    struct Probe {
        name: String,
        tags: Vec<String>,
        limit: Option<u32>,
        ratio: Option<f64>,
    }

    impl Schema for Probe {
        fn parse(value: &Value, p: &mut Parser) -> Option<Self> {
            let obj = p.object(value)?;
            Some(Self {
                name: p.non_empty_string(obj, "name"),
                tags: p.non_empty_list(obj, "tags", "tag"),
                limit: p.bounded_int(obj, "limit", 1, 10),
                ratio: p.bounded_number(obj, "ratio", 0.0, 1.0),
            })
        }
    }

    #[test]
    fn test_collects_every_violation() {
        let errors = Parser::run::<Probe>(
            &json!({ "name": "", "tags": [], "limit": 11, "ratio": 1.5 }),
            Strictness::Full,
        )
        .unwrap_err();

        let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "tags", "limit", "ratio"]);
        assert_eq!(errors[0].code, ViolationCode::TooSmall);
        assert_eq!(errors[2].code, ViolationCode::TooBig);
    }

    #[test]
    fn test_missing_required_field() {
        let errors = Parser::run::<Probe>(&json!({}), Strictness::Full).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| e.code == ViolationCode::MissingRequiredField));
    }

    #[test]
    fn test_partial_mode_fills_defaults() {
        let probe = Parser::run::<Probe>(&json!({}), Strictness::Partial).unwrap();
        assert!(probe.name.is_empty());
        assert!(probe.tags.is_empty());
        assert_eq!(probe.limit, None);
    }

    #[test]
    fn test_partial_mode_accepts_empty_placeholders() {
        let draft = json!({ "name": "", "tags": [], "limit": 11 });
        let errors = Parser::run::<Probe>(&draft, Strictness::Partial).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "limit");
    }

    #[test]
    fn test_nested_paths_use_indexes() {
        let errors =
            Parser::run::<Probe>(&json!({ "name": "x", "tags": ["a", 3] }), Strictness::Full)
                .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "tags[1]");
        assert_eq!(errors[0].code, ViolationCode::InvalidType);
        assert_eq!(errors[0].message, "Expected string, received number");
    }

    #[test]
    fn test_rejects_float_for_integer() {
        let errors =
            Parser::run::<Probe>(&json!({ "name": "x", "tags": ["a"], "limit": 2.5 }), Strictness::Full)
                .unwrap_err();
        assert_eq!(errors[0].path, "limit");
        assert_eq!(errors[0].code, ViolationCode::InvalidType);
    }

    #[test]
    fn test_null_reads_as_absent() {
        let probe = Parser::run::<Probe>(
            &json!({ "name": "x", "tags": ["a"], "limit": null }),
            Strictness::Full,
        )
        .unwrap();
        assert_eq!(probe.limit, None);
        assert_eq!(probe.tags, vec!["a".to_string()]);
    }

    #[test]
    fn test_non_object_root() {
        let errors = Parser::run::<Probe>(&json!("nope"), Strictness::Full).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "");
        assert_eq!(errors[0].code, ViolationCode::InvalidType);
    }
}
