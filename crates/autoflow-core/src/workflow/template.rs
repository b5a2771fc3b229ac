//! Template resolution for step configs.
//!
//! Step configs may reference earlier data through `{{expression}}`
//! placeholders:
//!
//! - `{{trigger.data}}` / `{{trigger.data.<path>}}` -- the run's trigger payload
//! - `{{step_<id>}}` / `{{step_<id>.<path>}}` -- a completed step's result
//!
//! The resolver walks the config structurally and only ever looks at string
//! leaves. A string consisting of exactly one placeholder is replaced by the
//! referenced value itself (keeping its JSON type); placeholders embedded in
//! longer text are spliced in as text. Anything that cannot be resolved is
//! left in place verbatim. Resolution never fails.

use serde_json::{Map, Value};

use super::context::ExecutionContext;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Resolve every placeholder in `config` against `ctx`, returning a new value.
pub fn resolve_config(config: &Value, ctx: &ExecutionContext) -> Value {
    match config {
        Value::String(s) => resolve_string(s, ctx),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_config(v, ctx)).collect()),
        Value::Object(map) => {
            let resolved: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), resolve_config(v, ctx)))
                .collect();
            Value::Object(resolved)
        }
        other => other.clone(),
    }
}

/// Resolve a single string leaf.
fn resolve_string(s: &str, ctx: &ExecutionContext) -> Value {
    let placeholders = scan(s);
    if placeholders.is_empty() {
        return Value::String(s.to_string());
    }

    // Whole-string placeholder keeps the referenced value's type.
    if let [only] = placeholders.as_slice() {
        if only.start == 0 && only.end == s.len() {
            return match lookup(only.expr, ctx) {
                Some(v) => v.clone(),
                None => Value::String(s.to_string()),
            };
        }
    }

    let mut out = String::with_capacity(s.len());
    let mut cursor = 0;
    for p in &placeholders {
        out.push_str(&s[cursor..p.start]);
        match lookup(p.expr, ctx) {
            Some(v) => out.push_str(&stringify(v)),
            None => out.push_str(&s[p.start..p.end]),
        }
        cursor = p.end;
    }
    out.push_str(&s[cursor..]);
    Value::String(out)
}

#[derive(Debug, PartialEq)]
struct Placeholder<'a> {
    start: usize,
    end: usize,
    expr: &'a str,
}

/// Find every `{{[^}]+}}` occurrence, left to right, non-overlapping.
fn scan(s: &str) -> Vec<Placeholder<'_>> {
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(rel) = s[from..].find(OPEN) {
        let open = from + rel;
        let body_start = open + OPEN.len();
        let body_len = s[body_start..].find('}').unwrap_or(s.len() - body_start);
        let body_end = body_start + body_len;

        if body_len > 0 && s[body_end..].starts_with(CLOSE) {
            let end = body_end + CLOSE.len();
            found.push(Placeholder {
                start: open,
                end,
                expr: s[body_start..body_end].trim(),
            });
            from = end;
        } else {
            from = open + 1;
        }
    }
    found
}

/// Look up a trimmed placeholder expression in the context.
fn lookup<'a>(expr: &str, ctx: &'a ExecutionContext) -> Option<&'a Value> {
    let (head, path) = match expr.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (expr, None),
    };

    if head == "trigger" {
        let rest = path?;
        let (first, sub) = match rest.split_once('.') {
            Some((first, sub)) => (first, Some(sub)),
            None => (rest, None),
        };
        if first != "data" {
            return None;
        }
        let data = ctx.trigger_data.as_ref()?;
        return walk(data, sub);
    }

    let step_id = head.strip_prefix("step_")?;
    let result = ctx
        .step_result(step_id)
        .or_else(|| ctx.step_result(head))?;
    walk(result, path)
}

/// Walk a dot-separated path. Array elements are addressed by index.
fn walk<'a>(root: &'a Value, path: Option<&str>) -> Option<&'a Value> {
    let Some(path) = path else {
        return Some(root);
    };
    path.split('.').try_fold(root, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Text form of a value spliced into a larger string.
fn stringify(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
