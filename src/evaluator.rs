//! Evaluator for frontmatter expressions - resolves fields, calls and operators
//!
//! Evaluation never fails. A reference that is neither a field nor a number
//! resolves to its own text, and the only failure value is `Value::Null`
//! ("undefined"), produced when a `+`/`-` chain meets a null operand or a
//! function picks from an empty list.

use crate::ast::{Expression, Operator, Segment};
use crate::functions::{self, FunctionRegistry};
use crate::parser::Parser;
use crate::value::{is_numeric_string, parse_number, Record, Value};
use tracing::{debug, trace};

/// Evaluator context: the record being read and the callable functions
pub struct Evaluator<'a> {
    record: &'a Record,
    functions: &'a FunctionRegistry,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator over `record` with the built-in functions
    pub fn new(record: &'a Record) -> Self {
        Self::with_registry(record, functions::registry())
    }

    pub fn with_registry(record: &'a Record, functions: &'a FunctionRegistry) -> Self {
        Self { record, functions }
    }

    /// Parse and evaluate expression text
    ///
    /// Text that is exactly a field name always resolves to that field, even
    /// when it contains `-` or parentheses.
    pub fn evaluate_str(&self, source: &str) -> Value {
        let source = source.trim();
        if let Some(value) = self.record.get(source) {
            return value.clone();
        }
        let expression = Parser::with_registry(source, self.functions).parse();
        trace!(source, calls = expression.call_count(), "evaluating");
        self.evaluate_expression(&expression)
    }

    /// Evaluate a parsed expression
    pub fn evaluate_expression(&self, expr: &Expression) -> Value {
        match expr {
            Expression::Literal { text, .. } => self.resolve_text(text),

            Expression::Call { name, args, .. } => {
                let args: Vec<Value> = args
                    .iter()
                    .map(|arg| self.evaluate_expression(arg))
                    .collect();
                self.functions.call(name, &args).unwrap_or(Value::Null)
            }

            Expression::Group { inner, .. } => self.evaluate_expression(inner),

            Expression::Composite { segments, .. } => {
                let mut text = String::new();
                for segment in segments {
                    match segment {
                        Segment::Text(t) => text.push_str(t),
                        Segment::Expr(expr) => {
                            text.push_str(&splice(&self.evaluate_expression(expr)))
                        }
                    }
                }
                self.resolve_text(&text)
            }

            Expression::Chain {
                source,
                operands,
                operators,
                ..
            } => {
                if let Some(value) = self.record.get(source.as_str()) {
                    return value.clone();
                }
                let values: Vec<Value> = operands
                    .iter()
                    .map(|operand| coerce_numeric(self.evaluate_expression(operand)))
                    .collect();
                combine(&values, operators)
            }
        }
    }

    /// Resolve bare text: a field, then a number, then the text itself
    fn resolve_text(&self, text: &str) -> Value {
        if let Some(value) = self.record.get(text) {
            return value.clone();
        }
        if let Some(n) = parse_number(text) {
            return Value::Number(n);
        }
        Value::String(text.trim().to_string())
    }
}

/// Text form of a value spliced back into a composite operand
fn splice(value: &Value) -> String {
    match value {
        Value::List(_) => value.to_json_text(),
        other => other.to_text(),
    }
}

fn coerce_numeric(value: Value) -> Value {
    match value {
        Value::String(s) if is_numeric_string(&s) => s
            .parse::<f64>()
            .map(Value::Number)
            .unwrap_or(Value::String(s)),
        other => other,
    }
}

/// Combine chain operands left to right
///
/// `operators[i - 1]` applies to `values[i]`; a surplus trailing operator is
/// ignored.
pub fn combine(values: &[Value], operators: &[Operator]) -> Value {
    let Some(first) = values.first() else {
        return Value::Null;
    };
    let rest = values[1..].iter().zip(operators);

    if values.iter().any(Value::is_null) {
        debug!("undefined operand in chain");
        return Value::Null;
    }

    if values.iter().any(Value::is_list) {
        let mut result = into_list(first);
        for (value, operator) in rest {
            let items = into_list(value);
            match operator {
                Operator::Add => result.extend(items),
                Operator::Subtract => result.retain(|item| !items.contains(item)),
            }
        }
        return Value::List(result);
    }

    if values.iter().all(Value::is_number) {
        let mut result = first.as_number().unwrap_or_default();
        for (value, operator) in rest {
            let n = value.as_number().unwrap_or_default();
            match operator {
                Operator::Add => result += n,
                Operator::Subtract => result -= n,
            }
        }
        return Value::Number(result);
    }

    if values.iter().all(Value::is_string) {
        let mut result = first.to_text();
        for (value, operator) in rest {
            let text = value.to_text();
            match operator {
                Operator::Add => result.push_str(&text),
                Operator::Subtract => result = result.replacen(&text, "", 1),
            }
        }
        return Value::String(result);
    }

    // Mixed strings and numbers join without a separator whatever the operator.
    Value::String(values.iter().map(Value::to_text).collect())
}

fn into_list(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.clone(),
        scalar => vec![scalar.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frontmatter() -> Record {
        Record::new()
            .with("year", 1975i64)
            .with("price", 7.5)
            .with("firstname", "Oscar")
            .with("lastname", "Wilde")
            .with("parents", vec!["[[William]]", "[[Jane]]"])
            .with("friends", vec!["Alice", "Bob"])
            .with("colleagues", vec!["Carol", "Dave"])
            .with("scores", vec![10i64, 20, 15])
    }

    fn eval(source: &str) -> Value {
        let record = frontmatter();
        Evaluator::new(&record).evaluate_str(source)
    }

    #[test]
    fn test_field_lookup() {
        assert_eq!(eval("year"), Value::Number(1975.0));
        assert_eq!(eval(" firstname "), Value::from("Oscar"));
        assert_eq!(eval("friends"), Value::from(vec!["Alice", "Bob"]));
    }

    #[test]
    fn test_unknown_reference_echoes_text() {
        assert_eq!(eval("middlename"), Value::from("middlename"));
    }

    #[test]
    fn test_numeric_literals() {
        assert_eq!(eval("25"), Value::Number(25.0));
        assert_eq!(eval("2.5"), Value::Number(2.5));
        assert_eq!(eval("1e3"), Value::Number(1000.0));
    }

    #[test]
    fn test_signed_literals_split_on_operator() {
        // The empty left operand is a string, so the chain concatenates.
        assert_eq!(eval("-5"), Value::from("5"));
        assert_eq!(eval("1e-3"), Value::from("1e3"));
        assert_eq!(eval("year + -5"), Value::from("19755"));
        assert_eq!(eval("size(scores, -5)"), Value::Number(4.0));
        assert_eq!(eval("last(scores, -5)"), Value::from("5"));
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(eval("upper(firstname)"), Value::from("OSCAR"));
        assert_eq!(eval("lower(lastname)"), Value::from("wilde"));
        assert_eq!(eval("highest(firstname)"), Value::from("srOca"));
        assert_eq!(eval("highest(year)"), Value::Number(9751.0));
        assert_eq!(eval("lowest(year)"), Value::Number(1579.0));
        assert_eq!(eval("upper(price)"), Value::Number(8.0));
        assert_eq!(eval("lower(price)"), Value::Number(7.0));
        assert_eq!(eval("size(price)"), Value::Number(3.0));
        assert_eq!(eval("size(friends, colleagues)"), Value::Number(4.0));
        assert_eq!(eval("first(friends, colleagues)"), Value::from("Alice"));
        assert_eq!(eval("last(friends, colleagues)"), Value::from("Dave"));
    }

    #[test]
    fn test_nested_calls() {
        assert_eq!(
            eval("join(lowest(scores, 5, 25))"),
            Value::from("5, 10, 15, 20, 25")
        );
        assert_eq!(eval("join(highest(scores))"), Value::from("20, 15, 10"));
        assert_eq!(eval("first(highest(scores))"), Value::Number(20.0));
        assert_eq!(eval("first(lowest(scores))"), Value::Number(10.0));
    }

    #[test]
    fn test_string_operators() {
        assert_eq!(eval("firstname + lastname"), Value::from("OscarWilde"));
        assert_eq!(eval("first(firstname) + last(lastname)"), Value::from("Oe"));
        assert_eq!(eval("lowest(firstname) - ac"), Value::from("Ors"));
        assert_eq!(eval("firstname - s - c"), Value::from("Oar"));
    }

    #[test]
    fn test_numeric_operators() {
        assert_eq!(eval("last(year) + first(price)"), Value::Number(12.0));
        assert_eq!(eval("year - 25"), Value::Number(1950.0));
        assert_eq!(eval("year + price - 2.5"), Value::Number(1980.0));
    }

    #[test]
    fn test_list_operators() {
        assert_eq!(eval("upper(friends - Bob)"), Value::from("ALICE"));
        assert_eq!(
            eval("friends + colleagues"),
            Value::from(vec!["Alice", "Bob", "Carol", "Dave"])
        );
        assert_eq!(
            eval("Eve + friends"),
            Value::from(vec!["Eve", "Alice", "Bob"])
        );
        assert_eq!(
            eval("scores - 20"),
            Value::from(vec![10i64, 15])
        );
        assert_eq!(
            eval("friends + colleagues - friends"),
            Value::from(vec!["Carol", "Dave"])
        );
    }

    #[test]
    fn test_mixed_operands_concatenate() {
        assert_eq!(
            eval("lower(firstname + lastname) + year"),
            Value::from("oscarwilde1975")
        );
        assert_eq!(eval("firstname - year"), Value::from("Oscar1975"));
    }

    #[test]
    fn test_upper_over_many_arguments() {
        assert_eq!(
            eval("upper(firstname, friends, colleagues, lastname)"),
            Value::from(vec!["OSCAR", "ALICE", "BOB", "CAROL", "DAVE", "WILDE"])
        );
    }

    #[test]
    fn test_null_operand_poisons_chain() {
        let record = frontmatter().with("nickname", Value::Null);
        let evaluator = Evaluator::new(&record);
        assert_eq!(evaluator.evaluate_str("firstname + nickname"), Value::Null);
        assert_eq!(evaluator.evaluate_str("nickname"), Value::Null);
    }

    #[test]
    fn test_empty_list_pick_is_undefined() {
        let record = frontmatter().with("tags", Vec::<Value>::new());
        let evaluator = Evaluator::new(&record);
        assert_eq!(evaluator.evaluate_str("first(tags)"), Value::Null);
        assert_eq!(evaluator.evaluate_str("first(tags) + x"), Value::Null);
    }

    #[test]
    fn test_hyphenated_field_names() {
        let record = frontmatter().with("due-date", "2024-05-01");
        let evaluator = Evaluator::new(&record);
        assert_eq!(evaluator.evaluate_str("due-date"), Value::from("2024-05-01"));
        assert_eq!(
            evaluator.evaluate_str("upper(due-date)"),
            Value::from("2024-05-01")
        );
    }

    #[test]
    fn test_groups() {
        assert_eq!(eval("(firstname)"), Value::from("Oscar"));
        assert_eq!(eval("((friends))"), Value::from(vec!["Alice", "Bob"]));
        assert_eq!(eval("(year - 5) + 10"), Value::Number(1980.0));
    }

    #[test]
    fn test_unknown_function_degrades_to_text() {
        assert_eq!(eval("shout(firstname)"), Value::from("shout(firstname)"));
        assert_eq!(eval("shout(upper(firstname))"), Value::from("shout(OSCAR)"));
        assert_eq!(
            eval("shout(firstname) + lastname"),
            Value::from("shout(firstname)Wilde")
        );
    }

    #[test]
    fn test_composite_resolves_spliced_text() {
        let record = frontmatter().with("OSCAR", "found");
        let evaluator = Evaluator::new(&record);
        assert_eq!(evaluator.evaluate_str("upper(firstname)x"), Value::from("OSCARx"));
        assert_eq!(evaluator.evaluate_str("(upper(firstname))"), Value::from("OSCAR"));
        assert_eq!(
            evaluator.evaluate_str("first(friends)(lastname)"),
            Value::from("AliceWilde")
        );
        assert_eq!(
            evaluator.evaluate_str("x(upper(scores))"),
            Value::from("x([10,20,15])")
        );
    }

    #[test]
    fn test_spliced_lists_format_numbers_like_text() {
        let record = frontmatter().with("distances", vec![1.5e21, 2.0]);
        let evaluator = Evaluator::new(&record);
        assert_eq!(
            evaluator.evaluate_str("x(upper(distances))"),
            Value::from("x([1.5e+21,2])")
        );
        assert_eq!(
            evaluator.evaluate_str("size(x(upper(distances)))"),
            Value::Number(14.0)
        );
    }

    #[test]
    fn test_malformed_parentheses() {
        assert_eq!(eval("upper(firstname"), Value::from("upper(firstname"));
        assert_eq!(eval("firstname)"), Value::from("firstname)"));
    }

    #[test]
    fn test_trailing_operator() {
        assert_eq!(eval("firstname +"), Value::from("Oscar"));
        assert_eq!(eval("+ year"), Value::from("1975"));
    }

    #[test]
    fn test_combine_directly() {
        let values = [Value::Number(1.0), Value::Number(2.0), Value::Number(4.0)];
        assert_eq!(
            combine(&values, &[Operator::Add, Operator::Subtract]),
            Value::Number(-1.0)
        );
        assert_eq!(combine(&[], &[]), Value::Null);
    }
}
