//! FROM / WHERE / LIMIT suffix shared by every statement kind.
//!
//! # Example
//!
//! ```ignore
//! use sqlgate::Clauses;
//!
//! let clauses = Clauses::new()
//!     .from("users")
//!     .filter(("age > %s", 18))
//!     .limit(10);
//! ```

use crate::error::{GateError, GateResult};
use crate::ident::{Ident, IntoIdent};
use crate::param::{IntoParams, ParamList};
use crate::value::Value;

/// A WHERE condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// Condition text with no parameters.
    Plain(String),
    /// Condition text with `%s` placeholders and their values.
    Template { template: String, params: ParamList },
}

impl Where {
    pub fn plain(condition: impl Into<String>) -> Self {
        Where::Plain(condition.into())
    }

    /// A templated condition. A single scalar becomes a one-element list.
    pub fn template(template: impl Into<String>, params: impl IntoParams) -> Self {
        Where::Template {
            template: template.into(),
            params: params.into_params(),
        }
    }

    /// Build a condition from loosely typed input.
    ///
    /// Accepts a JSON string (plain condition) or a JSON array of exactly two
    /// elements `[template, params]`, where `params` is either an array or a
    /// single scalar. Anything else is a [`GateError::WhereShape`].
    pub fn from_json(input: &serde_json::Value) -> GateResult<Self> {
        use serde_json::Value as Json;

        match input {
            Json::String(s) => Ok(Where::Plain(s.clone())),
            Json::Array(items) if items.len() == 2 => {
                let Json::String(template) = &items[0] else {
                    return Err(GateError::where_shape(
                        "template of a (template, params) pair must be a string",
                    ));
                };
                let params = match &items[1] {
                    Json::Array(values) => values.iter().map(json_param).collect(),
                    scalar => vec![json_param(scalar)],
                };
                Ok(Where::Template {
                    template: template.clone(),
                    params: ParamList::from(params),
                })
            }
            Json::Array(items) => Err(GateError::where_shape(format!(
                "expected (template, params) pair, got {} element(s)",
                items.len()
            ))),
            other => Err(GateError::where_shape(format!(
                "expected a string or a (template, params) pair, got {}",
                json_kind(other)
            ))),
        }
    }

    fn render(&self) -> (String, ParamList) {
        match self {
            Where::Plain(cond) => (format!("WHERE {cond}"), ParamList::new()),
            Where::Template { template, params } => (format!("WHERE {template}"), params.clone()),
        }
    }
}

fn json_param(value: &serde_json::Value) -> Value {
    use serde_json::Value as Json;

    match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Value::Text(s.clone()),
        nested => Value::Json(nested.clone()),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value as Json;

    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

impl From<&str> for Where {
    fn from(condition: &str) -> Self {
        Where::plain(condition)
    }
}

impl From<String> for Where {
    fn from(condition: String) -> Self {
        Where::Plain(condition)
    }
}

impl<S: Into<String>, P: IntoParams> From<(S, P)> for Where {
    fn from((template, params): (S, P)) -> Self {
        Where::template(template, params)
    }
}

/// Optional FROM / WHERE / LIMIT.
///
/// Errors (an invalid table name) are recorded and surfaced by
/// [`Clauses::build`], so the builder chains without `?`.
#[derive(Debug, Clone, Default)]
pub struct Clauses {
    from: Option<Ident>,
    filter: Option<Where>,
    limit: Option<u64>,
    error: Option<GateError>,
}

impl Clauses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the FROM table. Defaults to the session's current table.
    pub fn from(mut self, table: impl IntoIdent) -> Self {
        match table.into_ident() {
            Ok(table) => self.from = Some(table),
            Err(e) => self.record(e),
        }
        self
    }

    /// Set the WHERE condition.
    pub fn filter(mut self, condition: impl Into<Where>) -> Self {
        self.filter = Some(condition.into());
        self
    }

    /// Parse and set a loosely typed WHERE condition (see [`Where::from_json`]).
    pub fn filter_json(mut self, condition: &serde_json::Value) -> Self {
        match Where::from_json(condition) {
            Ok(w) => self.filter = Some(w),
            Err(e) => self.record(e),
        }
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The explicit FROM table, if any.
    pub fn table(&self) -> Option<&Ident> {
        self.from.as_ref()
    }

    /// Resolve the FROM table, falling back to `default_table`.
    pub fn resolve_table<'a>(&'a self, default_table: Option<&'a Ident>) -> Option<&'a Ident> {
        self.from.as_ref().or(default_table)
    }

    pub fn has_where(&self) -> bool {
        self.filter.is_some()
    }

    fn record(&mut self, error: GateError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Render the clauses and collect the WHERE parameters.
    ///
    /// Absent clauses are omitted entirely; present ones are joined by a
    /// single space.
    pub fn build(&self, default_table: Option<&Ident>) -> GateResult<(String, ParamList)> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }

        let mut parts: Vec<String> = Vec::with_capacity(3);
        if let Some(table) = self.resolve_table(default_table) {
            parts.push(format!("FROM {}", table.quoted()));
        }

        let mut params = ParamList::new();
        if let Some(filter) = &self.filter {
            let (text, where_params) = filter.render();
            parts.push(text);
            params = where_params;
        }

        if let Some(limit) = self.limit {
            parts.push(format!("LIMIT {limit}"));
        }

        Ok((parts.join(" "), params))
    }
}
