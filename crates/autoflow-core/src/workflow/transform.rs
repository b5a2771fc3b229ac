//! Data transforms for `transform_data` steps.
//!
//! [`Transformer`] is the extension point: the step handler only picks the
//! input and wraps the output, the transformer decides what `filter`, `map`
//! and `reduce` mean. [`JexlTransformer`] is the default and evaluates the
//! step's `expression` as JEXL once per array element.
//!
//! Bindings available to expressions:
//! - `filter` / `map`: `item`, `index`
//! - `reduce`: `acc`, `item`, `index`
//!
//! Values are passed to the evaluator as context, never spliced into the
//! expression text.

use autoflow_types::workflow::TransformOperation;
use serde_json::{json, Number, Value};

use super::step_runner::StepError;

/// Applies a transform operation to an input value.
pub trait Transformer: Send + Sync {
    fn apply(
        &self,
        operation: TransformOperation,
        expression: &str,
        input: &Value,
        initial: Option<&Value>,
    ) -> Result<Value, StepError>;
}

// ---------------------------------------------------------------------------
// JexlTransformer
// ---------------------------------------------------------------------------

/// Default transformer backed by `jexl_eval`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JexlTransformer;

impl JexlTransformer {
    pub fn new() -> Self {
        Self
    }

    fn evaluator() -> jexl_eval::Evaluator<'static> {
        jexl_eval::Evaluator::new()
            .with_transform("lower", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.to_lowercase()))
            })
            .with_transform("upper", |args: &[Value]| {
                let s = args.first().and_then(|v| v.as_str()).unwrap_or("");
                Ok(json!(s.to_uppercase()))
            })
            .with_transform("length", |args: &[Value]| {
                let len = match args.first() {
                    Some(Value::String(s)) => s.len(),
                    Some(Value::Array(a)) => a.len(),
                    Some(Value::Object(o)) => o.len(),
                    _ => 0,
                };
                Ok(json!(len as f64))
            })
    }

    fn eval(
        evaluator: &jexl_eval::Evaluator<'static>,
        expression: &str,
        scope: &Value,
    ) -> Result<Value, StepError> {
        evaluator
            .eval_in_context(expression, scope)
            .map(normalize_number)
            .map_err(|e| StepError::Transform(e.to_string()))
    }
}

impl Transformer for JexlTransformer {
    fn apply(
        &self,
        operation: TransformOperation,
        expression: &str,
        input: &Value,
        initial: Option<&Value>,
    ) -> Result<Value, StepError> {
        let Value::Array(items) = input else {
            return Err(StepError::Transform(format!(
                "{} expects an array input, got {}",
                operation.as_str(),
                type_name(input)
            )));
        };
        let evaluator = Self::evaluator();

        match operation {
            TransformOperation::Filter => {
                let mut kept = Vec::new();
                for (index, item) in items.iter().enumerate() {
                    let scope = json!({ "item": item, "index": index });
                    if truthy(&Self::eval(&evaluator, expression, &scope)?) {
                        kept.push(item.clone());
                    }
                }
                Ok(Value::Array(kept))
            }
            TransformOperation::Map => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    let scope = json!({ "item": item, "index": index });
                    Self::eval(&evaluator, expression, &scope)
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            TransformOperation::Reduce => {
                let (mut acc, skip) = match (initial, items.first()) {
                    (Some(init), _) => (init.clone(), 0),
                    (None, Some(first)) => (first.clone(), 1),
                    (None, None) => {
                        return Err(StepError::Transform(
                            "reduce of empty array with no initial value".to_string(),
                        ));
                    }
                };
                for (index, item) in items.iter().enumerate().skip(skip) {
                    let scope = json!({ "acc": acc, "item": item, "index": index });
                    acc = Self::eval(&evaluator, expression, &scope)?;
                }
                Ok(acc)
            }
        }
    }
}

/// JavaScript-like truthiness, matching how filter predicates are written.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// JEXL computes in f64; narrow integral results back to integers.
fn normalize_number(value: Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
                Value::Number(Number::from(f as i64))
            }
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_number).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_number(v)))
                .collect(),
        ),
        other => other,
    }
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

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(op: TransformOperation, expr: &str, input: Value, initial: Option<Value>) -> Value {
        JexlTransformer::new()
            .apply(op, expr, &input, initial.as_ref())
            .unwrap()
    }

    #[test]
    fn test_filter_keeps_truthy_items() {
        let input = json!([
            {"name": "ada", "active": true},
            {"name": "bob", "active": false},
            {"name": "cy", "active": true}
        ]);
        let out = apply(TransformOperation::Filter, "item.active", input, None);
        assert_eq!(out, json!([{"name": "ada", "active": true}, {"name": "cy", "active": true}]));

        let out = apply(TransformOperation::Filter, "index > 0", json!(["a", "b", "c"]), None);
        assert_eq!(out, json!(["b", "c"]));
    }

    #[test]
    fn test_map_projects_items() {
        let out = apply(TransformOperation::Map, "item * 2", json!([1, 2, 3]), None);
        assert_eq!(out, json!([2, 4, 6]));

        let out = apply(
            TransformOperation::Map,
            "item.email|lower",
            json!([{"email": "A@B.COM"}]),
            None,
        );
        assert_eq!(out, json!(["a@b.com"]));
    }

    #[test]
    fn test_reduce_with_and_without_initial() {
        let out = apply(TransformOperation::Reduce, "acc + item", json!([1, 2, 3, 4]), None);
        assert_eq!(out, json!(10));

        let out = apply(
            TransformOperation::Reduce,
            "acc + item.qty",
            json!([{"qty": 2}, {"qty": 5}]),
            Some(json!(100)),
        );
        assert_eq!(out, json!(107));
    }

    #[test]
    fn test_reduce_empty_without_initial_fails() {
        let err = JexlTransformer::new()
            .apply(TransformOperation::Reduce, "acc + item", &json!([]), None)
            .unwrap_err();
        assert!(matches!(err, StepError::Transform(_)));

        let out = apply(TransformOperation::Reduce, "acc + item", json!([]), Some(json!(0)));
        assert_eq!(out, json!(0));
    }

    #[test]
    fn test_non_array_input_fails() {
        let err = JexlTransformer::new()
            .apply(TransformOperation::Map, "item", &json!({"a": 1}), None)
            .unwrap_err();
        assert!(err.to_string().contains("expects an array input, got object"));
    }

    #[test]
    fn test_invalid_expression_fails() {
        let err = JexlTransformer::new()
            .apply(TransformOperation::Map, "item +* 2", &json!([1]), None)
            .unwrap_err();
        assert!(matches!(err, StepError::Transform(_)));
    }

    #[test]
    fn test_normalize_number_keeps_fractions() {
        assert_eq!(normalize_number(json!(2.0)), json!(2));
        assert_eq!(normalize_number(json!(2.5)), json!(2.5));
        assert_eq!(normalize_number(json!({"n": [4.0]})), json!({"n": [4]}));
    }
}
