//! `{{name}}` placeholder substitution.
//!
//! Placeholders are looked up in [`ExecutionContext::vars`]; a dotted name
//! walks into nested objects. Placeholders without a value are left as they
//! are.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::host::ExecutionContext;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_$][A-Za-z0-9_$.\-]*)\s*\}\}")
        .expect("placeholder pattern must be valid")
});

/// Template substitution used by the request transform.
pub trait Substitute: Send + Sync + 'static {
    /// Substitute every placeholder in `input`.
    fn substitute_str(&self, input: &str, ctx: &ExecutionContext) -> String;

    /// Substitute every string leaf of `input`.
    fn substitute_value(&self, input: &Value, ctx: &ExecutionContext) -> Value;
}

/// The default `{{name}}` template engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct Template;

impl Template {
    fn lookup<'a>(name: &str, ctx: &'a ExecutionContext) -> Option<&'a Value> {
        if let Some(v) = ctx.vars.get(name) {
            return Some(v);
        }

        let mut parts = name.split('.');
        let first = ctx.vars.get(parts.next()?)?;
        parts.try_fold(first, |v, key| v.get(key))
    }

    fn render(v: &Value) -> Cow<'_, str> {
        match v {
            Value::String(s) => Cow::Borrowed(s),
            Value::Null => Cow::Borrowed(""),
            other => Cow::Owned(other.to_string()),
        }
    }
}

impl Substitute for Template {
    fn substitute_str(&self, input: &str, ctx: &ExecutionContext) -> String {
        PLACEHOLDER
            .replace_all(input, |caps: &Captures| match Self::lookup(&caps[1], ctx) {
                Some(v) => Self::render(v).into_owned(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    fn substitute_value(&self, input: &Value, ctx: &ExecutionContext) -> Value {
        match input {
            Value::String(s) => {
                // A lone placeholder keeps the type of its value.
                if let Some(caps) = PLACEHOLDER.captures(s) {
                    if caps[0].len() == s.len() {
                        if let Some(v) = Self::lookup(&caps[1], ctx) {
                            return v.clone();
                        }
                    }
                }
                Value::String(self.substitute_str(s, ctx))
            }
            Value::Array(arr) => Value::Array(
                arr.iter()
                    .map(|v| self.substitute_value(v, ctx))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.substitute_value(v, ctx)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}
