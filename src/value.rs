//! Value model for frontmatter fields
//!
//! Everything flowing through the engine is a string, a number, a list of
//! scalars, or null. Null doubles as "undefined" while evaluating: it is what a
//! missing list element or a null field resolves to, and it poisons any
//! `+`/`-` combination it takes part in.

use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

lazy_static! {
    static ref NUMERIC_RUN: Regex = Regex::new(r"^-?\d+(?:\.\d+)?$").unwrap();
    static ref DECIMAL_LITERAL: Regex =
        Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").unwrap();
}

/// A frontmatter field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    List(Vec<Value>),
    Null,
}

impl Value {
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Plain textual form, the way a browser would stringify the value
    ///
    /// Lists join their elements with `,`, null becomes `null`.
    pub fn to_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) => format_number(*n),
            Value::List(items) => items
                .iter()
                .map(|item| match item {
                    Value::Null => String::new(),
                    other => other.to_text(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Null => "null".to_string(),
        }
    }

    /// Compact JSON text, used when a list is spliced back into expression text
    ///
    /// Numbers use [`format_number`], so exponents read `1e+21` and
    /// non-finite numbers become `null`.
    pub fn to_json_text(&self) -> String {
        match self {
            Value::String(s) => serde_json::to_string(s).unwrap_or_else(|_| s.clone()),
            Value::Number(n) if n.is_finite() => format_number(*n),
            Value::Number(_) | Value::Null => "null".to_string(),
            Value::List(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(Value::to_json_text)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        }
    }

    /// Convert `None` for undefined, keeping every other value
    pub fn into_defined(self) -> Option<Value> {
        match self {
            Value::Null => None,
            other => Some(other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Null => serializer.serialize_unit(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::String(b.to_string()),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            map @ serde_json::Value::Object(_) => Value::String(map.to_string()),
        }
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::String(b.to_string()),
            serde_yaml::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_yaml::Value::String(s) => Value::String(s),
            serde_yaml::Value::Sequence(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_yaml::Value::Tagged(tagged) => Value::from(tagged.value),
            map @ serde_yaml::Value::Mapping(_) => serde_json::to_value(&map)
                .map(|json| Value::String(json.to_string()))
                .unwrap_or(Value::Null),
        }
    }
}

/// A flat frontmatter record: field name to value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        let mut fields: Vec<(&str, &Value)> = self
            .fields
            .iter()
            .map(|(key, value)| (key.as_str(), value))
            .collect();
        fields.sort_unstable_by_key(|(key, _)| *key);
        fields.into_iter()
    }

    /// Parse a record from a YAML mapping (an empty document is an empty record)
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Ok(Self::new());
        }
        let doc: serde_yaml::Value = serde_yaml::from_str(input)?;
        match doc {
            serde_yaml::Value::Null => Ok(Self::new()),
            serde_yaml::Value::Mapping(map) => Ok(map
                .into_iter()
                .map(|(key, value)| (yaml_key(key), Value::from(value)))
                .collect()),
            other => Err(Error::Frontmatter(format!(
                "expected a mapping of fields, got {}",
                yaml_kind(&other)
            ))),
        }
    }

    /// Parse a record from a JSON object
    pub fn from_json_str(input: &str) -> Result<Self> {
        let doc: serde_json::Value = serde_json::from_str(input)?;
        match doc {
            serde_json::Value::Null => Ok(Self::new()),
            serde_json::Value::Object(map) => Ok(map
                .into_iter()
                .map(|(key, value)| (key, Value::from(value)))
                .collect()),
            _ => Err(Error::Frontmatter(
                "expected a JSON object of fields".to_string(),
            )),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        other => Value::from(other).to_text(),
    }
}

fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}

/// Flatten arguments into one sequence, dropping nulls
///
/// A single surviving element comes back as a bare scalar.
pub fn flatten(values: &[Value]) -> Value {
    fn walk(value: &Value, out: &mut Vec<Value>) {
        match value {
            Value::List(items) => items.iter().for_each(|item| walk(item, out)),
            Value::Null => {}
            scalar => out.push(scalar.clone()),
        }
    }

    let mut out = Vec::new();
    for value in values {
        walk(value, &mut out);
    }
    if out.len() == 1 {
        out.remove(0)
    } else {
        Value::List(out)
    }
}

/// Extract the final numeric run of a value's text
///
/// The run is the leftmost `-?\d+(\.\d+)?` that ends at the last digit of the
/// text, so `"1.2.3"` yields `2.3` and `"chapter 12b"` yields `12`. Values
/// without digits come back unchanged.
pub fn numeric_suffix(value: &Value) -> Value {
    let text = value.to_text();
    let Some((last_digit, _)) = text.char_indices().rev().find(|(_, c)| c.is_ascii_digit())
    else {
        return value.clone();
    };
    let end = last_digit + 1;
    for (start, _) in text.char_indices().take_while(|(i, _)| *i <= last_digit) {
        let candidate = &text[start..end];
        if NUMERIC_RUN.is_match(candidate) {
            if let Ok(n) = candidate.parse::<f64>() {
                return Value::Number(n);
            }
        }
    }
    value.clone()
}

/// Whether a string is a plain numeric literal such as `12`, `-3` or `7.5`
pub fn is_numeric_string(text: &str) -> bool {
    NUMERIC_RUN.is_match(text)
}

/// Sort direction for [`compare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Order two values the way `highest`/`lowest` sort them
///
/// Strings are reduced to their numeric suffix first. Two numbers compare
/// numerically, two strings by collation, anything else by collating the
/// textual forms.
pub fn compare(a: &Value, b: &Value, direction: Direction) -> Ordering {
    let a = if a.is_string() { numeric_suffix(a) } else { a.clone() };
    let b = if b.is_string() { numeric_suffix(b) } else { b.clone() };
    match direction {
        Direction::Ascending => natural_order(&a, &b),
        Direction::Descending => natural_order(&b, &a),
    }
}

fn natural_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => collate(x, y),
        _ => collate(&a.to_text(), &b.to_text()),
    }
}

/// Locale-like string ordering
///
/// Characters compare case-insensitively first, with whitespace before
/// punctuation before digits before letters. Ties go to lowercase, then to
/// code point order.
pub fn collate(a: &str, b: &str) -> Ordering {
    let primary = a
        .chars()
        .map(primary_key)
        .cmp(b.chars().map(primary_key));
    if primary != Ordering::Equal {
        return primary;
    }
    let tertiary = a
        .chars()
        .map(|c| c.is_uppercase())
        .cmp(b.chars().map(|c| c.is_uppercase()));
    if tertiary != Ordering::Equal {
        return tertiary;
    }
    a.cmp(b)
}

fn primary_key(c: char) -> (u8, char) {
    let class = if c.is_whitespace() {
        0
    } else if c.is_numeric() {
        2
    } else if c.is_alphabetic() {
        3
    } else {
        1
    };
    (class, c.to_lowercase().next().unwrap_or(c))
}

/// Format a number the way JavaScript's `String(n)` does
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        format!("{}", n)
    } else {
        let text = format!("{:e}", n);
        match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => text,
        }
    }
}

/// Parse a decimal number literal, rejecting anything that is not entirely numeric
///
/// Accepts a sign, trailing or leading decimal points (`75.`, `.57`), an
/// exponent, and `Infinity`.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match text {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    if DECIMAL_LITERAL.is_match(text) {
        text.parse::<f64>().ok()
    } else {
        None
    }
}
