//! Built-in functions for frontmatter expressions
//!
//! Every function flattens its arguments first and then dispatches on the
//! shape of the result. None of them can fail: a shape a function has no rule
//! for is returned unchanged.

use crate::value::{compare, flatten, format_number, parse_number, Direction, Value};
use std::collections::HashMap;

/// Function signature
pub type BuiltinFunction = fn(&[Value]) -> Value;

/// Function registry
pub struct FunctionRegistry {
    functions: HashMap<String, BuiltinFunction>,
}

impl FunctionRegistry {
    /// Create a new function registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        // Picking
        registry.register("first", fn_first);
        registry.register("last", fn_last);

        // Case and rounding
        registry.register("upper", fn_upper);
        registry.register("lower", fn_lower);

        // Ordering
        registry.register("highest", fn_highest);
        registry.register("lowest", fn_lowest);

        // Aggregates
        registry.register("size", fn_size);
        registry.register("join", fn_join);

        registry
    }

    /// Register a function
    pub fn register(&mut self, name: &str, func: BuiltinFunction) {
        self.functions.insert(name.to_string(), func);
    }

    /// Call a function, `None` if the name is not registered
    pub fn call(&self, name: &str, args: &[Value]) -> Option<Value> {
        self.functions.get(name).map(|func| func(args))
    }

    /// Check if a function exists
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// List all function names, sorted
    pub fn list_functions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Global function registry using lazy_static
lazy_static::lazy_static! {
    static ref GLOBAL_REGISTRY: FunctionRegistry = FunctionRegistry::new();
}

/// The shared registry of built-in functions
pub fn registry() -> &'static FunctionRegistry {
    &GLOBAL_REGISTRY
}

/// Call a built-in function by name
pub fn call_builtin(name: &str, args: &[Value]) -> Option<Value> {
    GLOBAL_REGISTRY.call(name, args)
}

// =============================================================================
// PICKING
// =============================================================================

fn fn_first(args: &[Value]) -> Value {
    match flatten(args) {
        Value::List(items) => items.into_iter().next().unwrap_or(Value::Null),
        Value::String(s) => Value::String(first_char(&s)),
        Value::Number(n) => Value::String(first_char(&format_number(n))),
        other => other,
    }
}

fn fn_last(args: &[Value]) -> Value {
    match flatten(args) {
        Value::List(items) => items.into_iter().last().unwrap_or(Value::Null),
        Value::String(s) => Value::String(last_char(&s)),
        Value::Number(n) => Value::String(last_char(&format_number(n))),
        other => other,
    }
}

fn first_char(s: &str) -> String {
    s.chars().next().map(String::from).unwrap_or_default()
}

fn last_char(s: &str) -> String {
    s.chars().last().map(String::from).unwrap_or_default()
}

// =============================================================================
// CASE AND ROUNDING
// =============================================================================

// Numbers round toward the "larger" or "smaller" integer.
fn fn_upper(args: &[Value]) -> Value {
    match flatten(args) {
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|item| fn_upper(std::slice::from_ref(item)))
                .collect(),
        ),
        Value::String(s) => Value::String(s.to_uppercase()),
        Value::Number(n) => Value::Number(n.ceil()),
        other => other,
    }
}

fn fn_lower(args: &[Value]) -> Value {
    match flatten(args) {
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|item| fn_lower(std::slice::from_ref(item)))
                .collect(),
        ),
        Value::String(s) => Value::String(s.to_lowercase()),
        Value::Number(n) => Value::Number(n.floor()),
        other => other,
    }
}

// =============================================================================
// ORDERING
// =============================================================================

fn fn_highest(args: &[Value]) -> Value {
    sorted(flatten(args), Direction::Descending)
}

fn fn_lowest(args: &[Value]) -> Value {
    sorted(flatten(args), Direction::Ascending)
}

/// Sort a list, the characters of a string, or the characters of a number's text
///
/// Numbers are reparsed after sorting, so `1975` becomes `9751` and a result
/// that is no longer numeric (`"1-"`) becomes NaN.
fn sorted(value: Value, direction: Direction) -> Value {
    match value {
        Value::List(mut items) => {
            items.sort_by(|a, b| compare(a, b, direction));
            Value::List(items)
        }
        Value::String(s) => Value::String(sort_chars(&s, direction)),
        Value::Number(n) => {
            let text = sort_chars(&format_number(n), direction);
            Value::Number(parse_number(&text).unwrap_or(f64::NAN))
        }
        other => other,
    }
}

fn sort_chars(s: &str, direction: Direction) -> String {
    let mut chars: Vec<Value> = s.chars().map(|c| Value::String(c.to_string())).collect();
    chars.sort_by(|a, b| compare(a, b, direction));
    chars.iter().map(Value::to_text).collect()
}

// =============================================================================
// AGGREGATES
// =============================================================================

fn fn_size(args: &[Value]) -> Value {
    let size = match flatten(args) {
        Value::List(items) => items.len(),
        Value::String(s) => s.chars().count(),
        Value::Number(n) => format_number(n).chars().count(),
        other => other.to_json_text().chars().count(),
    };
    Value::Number(size as f64)
}

fn fn_join(args: &[Value]) -> Value {
    match flatten(args) {
        Value::List(items) => Value::String(
            items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => other,
    }
}
