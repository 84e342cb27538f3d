//! Placeholder scanning and substitution.
//!
//! A placeholder is `{name}` or `{name:default}`. Names start with an ASCII letter
//! and may continue with letters, `-` or `_`; digits are not part of the grammar, so
//! `{id2}` stays literal text. Defaults are any text without braces.
//!
//! Substitution renders every string in a single pass: text inserted for one
//! placeholder is never scanned again.

use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

static VARIABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z][A-Za-z_-]*)(?::([^{}]*))?\}").expect("variable regex must be valid")
});

/// Brace text that looks like a placeholder but whose name is outside the grammar.
static NEAR_VARIABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z0-9_-]+)(?::[^{}]*)?\}").expect("variable regex must be valid")
});

/// Where a variable was discovered inside a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    /// The endpoint url.
    Endpoint,
    /// A query parameter name or value.
    Params,
    /// A header name or value.
    Headers,
    /// A string leaf of the JSON body.
    Body,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Endpoint => write!(f, "endpoint"),
            Location::Params => write!(f, "params"),
            Location::Headers => write!(f, "headers"),
            Location::Body => write!(f, "body"),
        }
    }
}

/// One placeholder occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Declared name, as written between the braces.
    pub name: String,
    /// Text after `:`, `None` when no colon was written.
    pub default: Option<String>,
    /// Field the placeholder was found in.
    pub location: Location,
}

impl Variable {
    /// Create a new variable.
    pub fn new(name: impl Into<String>, default: Option<&str>, location: Location) -> Self {
        Self {
            name: name.into(),
            default: default.map(|v| v.to_string()),
            location,
        }
    }

    /// Name used as argument key, with `-` turned into `_`.
    pub fn flag_name(&self) -> String {
        self.name.replace('-', "_")
    }

    /// The exact text this variable was declared with.
    pub fn placeholder(&self) -> String {
        match &self.default {
            Some(default) => format!("{{{}:{default}}}", self.name),
            None => format!("{{{}}}", self.name),
        }
    }

    /// Returns true if the variable has no default.
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Extract the placeholders of `content` in order of appearance.
pub fn scan_str(content: &str, location: Location) -> Vec<Variable> {
    for cap in NEAR_VARIABLE_REGEX.captures_iter(content) {
        if !VARIABLE_REGEX.is_match(&cap[0]) {
            debug!(
                "{} in {location} is not a placeholder: names may only contain letters, '-' and '_'",
                &cap[0]
            );
        }
    }

    VARIABLE_REGEX
        .captures_iter(content)
        .map(|cap| {
            Variable::new(
                &cap[1],
                cap.get(2).map(|m| m.as_str()),
                location,
            )
        })
        .collect()
}

/// Render `content` in one pass.
///
/// Each placeholder becomes the value in `args` for its name, else its own default.
/// Placeholders with neither are kept as written.
pub fn render_str(content: &str, args: &HashMap<String, String>) -> String {
    render_str_with(content, args, |v| v.to_string())
}

/// Same as [`render_str`], passing every inserted value through `encode`.
pub fn render_str_with(
    content: &str,
    args: &HashMap<String, String>,
    encode: impl Fn(&str) -> String,
) -> String {
    VARIABLE_REGEX
        .replace_all(content, |cap: &Captures| {
            let value = args
                .get(&cap[1])
                .map(String::as_str)
                .or_else(|| cap.get(2).map(|m| m.as_str()));
            match value {
                Some(value) => encode(value),
                None => cap[0].to_string(),
            }
        })
        .into_owned()
}

/// Content that can carry placeholders.
pub trait Template {
    /// Scan for placeholders, tagging each with `location`.
    fn scan(&self, location: Location) -> Vec<Variable>;

    /// Render every placeholder with [`render_str`].
    fn substitute(&mut self, args: &HashMap<String, String>);
}

impl Template for String {
    fn scan(&self, location: Location) -> Vec<Variable> {
        scan_str(self, location)
    }

    fn substitute(&mut self, args: &HashMap<String, String>) {
        if VARIABLE_REGEX.is_match(self) {
            let rendered = render_str(self, args);
            *self = rendered;
        }
    }
}

/// JSON bodies are templated through their string leaves only, keys are left alone.
impl Template for Value {
    fn scan(&self, location: Location) -> Vec<Variable> {
        let mut vars = Vec::new();
        walk(self, &mut |s| vars.extend(scan_str(s, location)));
        vars
    }

    fn substitute(&mut self, args: &HashMap<String, String>) {
        match self {
            Value::String(s) => s.substitute(args),
            Value::Array(items) => items.iter_mut().for_each(|v| v.substitute(args)),
            Value::Object(map) => map.values_mut().for_each(|v| v.substitute(args)),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }
}

fn walk(value: &Value, f: &mut impl FnMut(&str)) {
    match value {
        Value::String(s) => f(s),
        Value::Array(items) => items.iter().for_each(|v| walk(v, f)),
        Value::Object(map) => map.values().for_each(|v| walk(v, f)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
