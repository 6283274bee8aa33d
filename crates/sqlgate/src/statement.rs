//! Statement assembly: SELECT / SHOW / INSERT / UPDATE / DELETE / USE.
//!
//! Every builder validates identifiers and checks that the number of `%s`
//! placeholders matches the parameter list before a [`Statement`] exists, so
//! nothing malformed ever reaches the execution gate.
//!
//! # Example
//!
//! ```ignore
//! use sqlgate::{Clauses, statement};
//!
//! let stmt = statement::insert("users")
//!     .set("name", "Alice")
//!     .set("age", 30)
//!     .build(None)?;
//! assert_eq!(stmt.sql(), "INSERT INTO `users` (`name`, `age`) VALUES (%s, %s)");
//!
//! let stmt = statement::select("*", &Clauses::new().from("users").filter(("age > %s", 18)), None)?;
//! assert_eq!(stmt.sql(), "SELECT * FROM `users` WHERE age > %s");
//! # Ok::<(), sqlgate::GateError>(())
//! ```

use crate::clause::{Clauses, Where};
use crate::error::{GateError, GateResult};
use crate::ident::{Ident, IntoIdent};
use crate::param::{IntoParams, ParamList};
use crate::raw::RawFragment;
use crate::value::{SqlValue, Value};
use std::fmt;

/// The kind of SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Use,
    Select,
    Show,
    Insert,
    Update,
    Delete,
    /// Caller-supplied SQL (see [`Statement::raw`]).
    Raw,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Use => "USE",
            StatementKind::Select => "SELECT",
            StatementKind::Show => "SHOW",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Raw => "RAW",
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQL text with `%s` placeholders plus the parameters that fill them, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    kind: StatementKind,
    sql: String,
    params: ParamList,
}

impl Statement {
    fn new(kind: StatementKind, sql: String, params: ParamList) -> GateResult<Self> {
        let placeholders = count_placeholders(&sql);
        if placeholders != params.len() {
            return Err(GateError::validation(format!(
                "{kind}: {placeholders} placeholder(s) but {} param(s)",
                params.len()
            )));
        }
        Ok(Self { kind, sql, params })
    }

    /// Caller-supplied SQL with `%s` placeholders.
    ///
    /// Identifiers inside `sql` are not validated.
    pub fn raw(sql: impl Into<String>, params: impl IntoParams) -> GateResult<Self> {
        Self::new(StatementKind::Raw, sql.into(), params.into_params())
    }

    /// ``USE `<db>` ``
    pub fn use_database(database: &Ident) -> Self {
        Self {
            kind: StatementKind::Use,
            sql: format!("USE {}", database.quoted()),
            params: ParamList::new(),
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        self.params.as_slice()
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params.into_vec())
    }
}

/// Count `%s` placeholders, treating `%%` as an escaped percent sign.
pub(crate) fn count_placeholders(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 1 < bytes.len() {
            match bytes[i + 1] {
                b's' => {
                    count += 1;
                    i += 2;
                    continue;
                }
                b'%' => {
                    i += 2;
                    continue;
                }
                _ => {}
            }
        }
        i += 1;
    }
    count
}

fn join_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// What a SELECT returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// `*`
    All,
    /// A list of validated column names.
    Columns(Vec<Ident>),
    /// A verbatim expression such as `COUNT(*)`.
    Expr(RawFragment),
}

impl Target {
    /// Parse `*` or a comma-separated list of column names.
    pub fn parse(s: &str) -> GateResult<Self> {
        let s = s.trim();
        if s == "*" {
            return Ok(Target::All);
        }
        let columns = s
            .split(',')
            .map(|c| Ident::parse(c.trim()))
            .collect::<GateResult<Vec<_>>>()?;
        Ok(Target::Columns(columns))
    }

    /// The column when the target names exactly one.
    pub fn single_column(&self) -> Option<&Ident> {
        match self {
            Target::Columns(cols) if cols.len() == 1 => cols.first(),
            _ => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Target::All => "*".to_string(),
            Target::Columns(cols) => cols
                .iter()
                .map(Ident::quoted)
                .collect::<Vec<_>>()
                .join(", "),
            Target::Expr(expr) => expr.as_sql().to_string(),
        }
    }
}

/// Convert an input into a [`Target`].
pub trait IntoTarget {
    fn into_target(self) -> GateResult<Target>;
}

impl IntoTarget for Target {
    fn into_target(self) -> GateResult<Target> {
        Ok(self)
    }
}

impl IntoTarget for &str {
    fn into_target(self) -> GateResult<Target> {
        Target::parse(self)
    }
}

impl IntoTarget for String {
    fn into_target(self) -> GateResult<Target> {
        Target::parse(&self)
    }
}

impl IntoTarget for Ident {
    fn into_target(self) -> GateResult<Target> {
        Ok(Target::Columns(vec![self]))
    }
}

impl IntoTarget for RawFragment {
    fn into_target(self) -> GateResult<Target> {
        Ok(Target::Expr(self))
    }
}

impl IntoTarget for &[&str] {
    fn into_target(self) -> GateResult<Target> {
        let columns = self
            .iter()
            .map(|c| Ident::parse(c))
            .collect::<GateResult<Vec<_>>>()?;
        Ok(Target::Columns(columns))
    }
}

/// `SELECT <target> <clauses>`
pub fn select(
    target: impl IntoTarget,
    clauses: &Clauses,
    default_table: Option<&Ident>,
) -> GateResult<Statement> {
    let target = target.into_target()?;
    select_target(&target, clauses, default_table)
}

pub(crate) fn select_target(
    target: &Target,
    clauses: &Clauses,
    default_table: Option<&Ident>,
) -> GateResult<Statement> {
    let (tail, params) = clauses.build(default_table)?;
    let sql = join_parts(&["SELECT", &target.render(), &tail]);
    Statement::new(StatementKind::Select, sql, params)
}

/// `SHOW <what> <clauses>`, e.g. ``SHOW COLUMNS FROM `users` ``.
pub fn show(
    what: impl IntoIdent,
    clauses: &Clauses,
    default_table: Option<&Ident>,
) -> GateResult<Statement> {
    let what = what.into_ident()?;
    let (tail, params) = clauses.build(default_table)?;
    let sql = join_parts(&["SHOW", what.as_str(), &tail]);
    Statement::new(StatementKind::Show, sql, params)
}

/// ``SHOW COLUMNS FROM `<table>` ``
pub fn show_columns(table: &Ident) -> Statement {
    Statement {
        kind: StatementKind::Show,
        sql: format!("SHOW COLUMNS FROM {}", table.quoted()),
        params: ParamList::new(),
    }
}

/// `DELETE <clauses>`. A table (explicit or default) is required.
pub fn delete(clauses: &Clauses, default_table: Option<&Ident>) -> GateResult<Statement> {
    if clauses.resolve_table(default_table).is_none() {
        return Err(GateError::validation("DELETE: no table selected"));
    }
    let (tail, params) = clauses.build(default_table)?;
    let sql = join_parts(&["DELETE", &tail]);
    Statement::new(StatementKind::Delete, sql, params)
}

/// Start an INSERT builder.
pub fn insert(table: impl IntoIdent) -> Insert {
    Insert::new().table(table)
}

/// Start an UPDATE builder.
pub fn update(table: impl IntoIdent) -> Update {
    Update::new().table(table)
}

/// INSERT builder.
///
/// Columns come either from one mapping ([`Insert::values`]) or from
/// individual assignments ([`Insert::set`]). Using both is an error.
#[derive(Debug, Clone, Default)]
pub struct Insert {
    table: Option<Ident>,
    mapping: Option<Vec<(Ident, SqlValue)>>,
    assignments: Vec<(Ident, SqlValue)>,
    filter: Option<Where>,
    error: Option<GateError>,
}

impl Insert {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: impl IntoIdent) -> Self {
        match table.into_ident() {
            Ok(t) => self.table = Some(t),
            Err(e) => self.record(e),
        }
        self
    }

    /// Insert a whole column → value mapping.
    pub fn values<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: IntoIdent,
        V: Into<SqlValue>,
    {
        let mut mapping = self.mapping.take().unwrap_or_default();
        for (column, value) in values {
            match column.into_ident() {
                Ok(column) => mapping.push((column, value.into())),
                Err(e) => self.record(e),
            }
        }
        self.mapping = Some(mapping);
        self
    }

    /// Insert one column value.
    pub fn set(mut self, column: impl IntoIdent, value: impl Into<SqlValue>) -> Self {
        match column.into_ident() {
            Ok(column) => self.assignments.push((column, value.into())),
            Err(e) => self.record(e),
        }
        self
    }

    /// Trailing WHERE; its parameters follow the column values.
    pub fn filter(mut self, condition: impl Into<Where>) -> Self {
        self.filter = Some(condition.into());
        self
    }

    fn record(&mut self, error: GateError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Build the statement. The table falls back to `default_table`.
    pub fn build(&self, default_table: Option<&Ident>) -> GateResult<Statement> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        let columns = match (&self.mapping, self.assignments.is_empty()) {
            (Some(_), false) => {
                return Err(GateError::validation(
                    "INSERT: cannot pass a value mapping and keyword columns at the same time",
                ));
            }
            (Some(mapping), true) => mapping,
            (None, _) => &self.assignments,
        };
        let table = self
            .table
            .as_ref()
            .or(default_table)
            .ok_or_else(|| GateError::validation("INSERT: no table selected"))?;

        let mut sql = String::with_capacity(64);
        sql.push_str("INSERT INTO ");
        table.write_quoted(&mut sql);
        sql.push_str(" (");
        for (i, (column, _)) in columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            column.write_quoted(&mut sql);
        }
        sql.push_str(") VALUES (");
        let mut params = ParamList::new();
        for (i, (_, value)) in columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            value.write_sql(&mut sql, &mut params);
        }
        sql.push(')');

        if let Some(filter) = &self.filter {
            let (tail, where_params) = Clauses::new().filter(filter.clone()).build(None)?;
            sql.push(' ');
            sql.push_str(&tail);
            params.extend(where_params);
        }

        Statement::new(StatementKind::Insert, sql, params)
    }
}

/// UPDATE builder: ``UPDATE `<table>` SET col=%s[, ...] [WHERE ...] [LIMIT n]``.
#[derive(Debug, Clone, Default)]
pub struct Update {
    table: Option<Ident>,
    assignments: Vec<(Ident, SqlValue)>,
    filter: Option<Where>,
    limit: Option<u64>,
    error: Option<GateError>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, table: impl IntoIdent) -> Self {
        match table.into_ident() {
            Ok(t) => self.table = Some(t),
            Err(e) => self.record(e),
        }
        self
    }

    /// Assign a column.
    pub fn set(mut self, column: impl IntoIdent, value: impl Into<SqlValue>) -> Self {
        match column.into_ident() {
            Ok(column) => self.assignments.push((column, value.into())),
            Err(e) => self.record(e),
        }
        self
    }

    /// Assign several columns at once, in iteration order.
    pub fn set_all<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: IntoIdent,
        V: Into<SqlValue>,
    {
        for (column, value) in values {
            self = self.set(column, value);
        }
        self
    }

    pub fn filter(mut self, condition: impl Into<Where>) -> Self {
        self.filter = Some(condition.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn record(&mut self, error: GateError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub fn build(&self, default_table: Option<&Ident>) -> GateResult<Statement> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        if self.assignments.is_empty() {
            return Err(GateError::validation("UPDATE: no columns to SET"));
        }
        let table = self
            .table
            .as_ref()
            .or(default_table)
            .ok_or_else(|| GateError::validation("UPDATE: no table selected"))?;

        let mut sql = String::with_capacity(64);
        sql.push_str("UPDATE ");
        table.write_quoted(&mut sql);
        sql.push_str(" SET ");
        let mut params = ParamList::new();
        for (i, (column, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(column.as_str());
            sql.push('=');
            value.write_sql(&mut sql, &mut params);
        }

        let mut tail = Clauses::new();
        if let Some(filter) = &self.filter {
            tail = tail.filter(filter.clone());
        }
        if let Some(limit) = self.limit {
            tail = tail.limit(limit);
        }
        let (tail, where_params) = tail.build(None)?;
        if !tail.is_empty() {
            sql.push(' ');
            sql.push_str(&tail);
        }
        params.extend(where_params);

        Statement::new(StatementKind::Update, sql, params)
    }
}
