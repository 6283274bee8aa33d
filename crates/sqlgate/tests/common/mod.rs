//! In-memory [`Connection`] for integration tests.
//!
//! Understands exactly the statement shapes the builders emit: `USE`,
//! `INSERT ... VALUES`, `SELECT ... FROM ... [WHERE a op %s [AND ...]] [LIMIT n]`,
//! `DELETE FROM`, and `SHOW COLUMNS FROM`. Cells come back as text, the way a
//! text-protocol driver returns them, so coercion does real work.

#![allow(dead_code)]

use sqlgate::{Connection, DriverError, RawRow, RawValue, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Clone)]
struct Table {
    columns: Vec<(String, String)>,
    rows: Vec<Vec<RawValue>>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Table>,
    current_db: Option<String>,
    log: Vec<String>,
    failures: VecDeque<DriverError>,
    reconnect_fails: bool,
    reconnects: usize,
    commits: usize,
    closed: bool,
}

/// Cloneable handle: the test keeps one, the gate owns another.
#[derive(Clone, Default)]
pub struct MemoryDb {
    state: Arc<Mutex<State>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) a table with `(name, declared type)` columns.
    pub fn with_table(self, name: &str, columns: &[(&str, &str)]) -> Self {
        let table = Table {
            columns: columns
                .iter()
                .map(|(n, t)| (n.to_string(), t.to_string()))
                .collect(),
            rows: Vec::new(),
        };
        self.state.lock().unwrap().tables.insert(name.to_string(), table);
        self
    }

    /// Every executed statement, rendered as `sql | [params]`.
    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn clear_log(&self) {
        self.state.lock().unwrap().log.clear();
    }

    pub fn current_db(&self) -> Option<String> {
        self.state.lock().unwrap().current_db.clone()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    /// Make the next `execute` fail with `err`.
    pub fn fail_next(&self, err: DriverError) {
        self.state.lock().unwrap().failures.push_back(err);
    }

    pub fn set_reconnect_fails(&self, fails: bool) {
        self.state.lock().unwrap().reconnect_fails = fails;
    }

    pub fn reconnects(&self) -> usize {
        self.state.lock().unwrap().reconnects
    }

    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    /// Highest number of statements ever observed executing at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn apply(&self, sql: &str, params: &[Value]) -> Result<Vec<RawRow>, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("{sql} | {params:?}"));
        if state.closed {
            return Err(DriverError::interface("connection is closed"));
        }
        if let Some(err) = state.failures.pop_front() {
            return Err(err);
        }

        let mut params: VecDeque<Value> = params.iter().cloned().collect();
        if let Some(db) = sql.strip_prefix("USE ") {
            state.current_db = Some(unquote(db).to_string());
            Ok(vec![])
        } else if let Some(rest) = sql.strip_prefix("INSERT INTO ") {
            insert(&mut state, rest, &mut params)
        } else if let Some(rest) = sql.strip_prefix("SELECT ") {
            select(&state, rest, &mut params)
        } else if let Some(rest) = sql.strip_prefix("DELETE FROM ") {
            delete(&mut state, rest, &mut params)
        } else if let Some(rest) = sql.strip_prefix("SHOW COLUMNS FROM ") {
            let table = table(&state, unquote(rest))?;
            Ok(table
                .columns
                .iter()
                .map(|(n, t)| {
                    vec![
                        RawValue::Text(n.clone()),
                        RawValue::Text(t.clone()),
                        RawValue::Text("YES".to_string()),
                    ]
                })
                .collect())
        } else {
            Ok(vec![])
        }
    }
}

impl Connection for MemoryDb {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<Vec<RawRow>, DriverError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Give other tasks a chance to run while "on the wire".
        tokio::task::yield_now().await;
        let result = self.apply(sql, params);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        self.state.lock().unwrap().commits += 1;
        Ok(())
    }

    async fn reconnect(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.reconnects += 1;
        if state.reconnect_fails {
            Err(DriverError::interface("connection refused"))
        } else {
            state.closed = false;
            Ok(())
        }
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches('`')
}

fn table<'a>(state: &'a State, name: &str) -> Result<&'a Table, DriverError> {
    state
        .tables
        .get(name)
        .ok_or_else(|| DriverError::execution(format!("Table '{name}' doesn't exist")))
}

fn to_text(value: Value) -> RawValue {
    match value {
        Value::Null => RawValue::Null,
        Value::Bool(b) => RawValue::Text(if b { "1" } else { "0" }.to_string()),
        Value::Int(i) => RawValue::Text(i.to_string()),
        Value::UInt(u) => RawValue::Text(u.to_string()),
        Value::Float(f) => RawValue::Text(f.to_string()),
        Value::Text(s) => RawValue::Text(s),
        Value::Bytes(b) => RawValue::Bytes(b),
        Value::Json(j) => RawValue::Text(j.to_string()),
        Value::DateTime(d) => RawValue::Text(d.to_string()),
        Value::Date(d) => RawValue::Text(d.to_string()),
    }
}

/// Split `a, b, c` at top-level commas (parentheses and quotes respected).
fn split_list(s: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut depth = 0;
    let mut quoted = false;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '\'' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth -= 1,
            ',' if !quoted && depth == 0 => {
                items.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        items.push(current.trim().to_string());
    }
    items
}

fn insert(
    state: &mut State,
    rest: &str,
    params: &mut VecDeque<Value>,
) -> Result<Vec<RawRow>, DriverError> {
    let (name, rest) = rest
        .split_once(" (")
        .ok_or_else(|| DriverError::execution("unsupported INSERT"))?;
    let (cols, rest) = rest
        .split_once(") VALUES (")
        .ok_or_else(|| DriverError::execution("unsupported INSERT"))?;
    let values = rest
        .strip_suffix(')')
        .ok_or_else(|| DriverError::execution("unsupported INSERT"))?;

    let name = unquote(name).to_string();
    let cols: Vec<String> = split_list(cols).iter().map(|c| unquote(c).to_string()).collect();
    let mut cells: HashMap<String, RawValue> = HashMap::new();
    for (col, expr) in cols.iter().zip(split_list(values)) {
        let cell = if expr == "%s" {
            params
                .pop_front()
                .map(to_text)
                .ok_or_else(|| DriverError::execution("not enough parameters"))?
        } else if expr == "NOW()" {
            RawValue::Text("2024-01-01 00:00:00".to_string())
        } else {
            RawValue::Text(expr.replace("%%", "%"))
        };
        cells.insert(col.clone(), cell);
    }

    let table = state
        .tables
        .get_mut(&name)
        .ok_or_else(|| DriverError::execution(format!("Table '{name}' doesn't exist")))?;
    for col in &cols {
        if !table.columns.iter().any(|(n, _)| n == col) {
            return Err(DriverError::execution(format!("Unknown column '{col}'")));
        }
    }
    let row = table
        .columns
        .iter()
        .map(|(n, _)| cells.remove(n).unwrap_or(RawValue::Null))
        .collect();
    table.rows.push(row);
    Ok(vec![])
}

struct Filter {
    column: String,
    op: String,
    value: RawValue,
}

fn parse_filters(
    condition: &str,
    params: &mut VecDeque<Value>,
) -> Result<Vec<Filter>, DriverError> {
    condition
        .split(" AND ")
        .map(|part| {
            let mut it = part.split_whitespace();
            let (Some(column), Some(op), Some(operand)) = (it.next(), it.next(), it.next()) else {
                return Err(DriverError::execution(format!("unsupported condition {part:?}")));
            };
            let value = if operand == "%s" {
                params
                    .pop_front()
                    .map(to_text)
                    .ok_or_else(|| DriverError::execution("not enough parameters"))?
            } else {
                RawValue::Text(operand.trim_matches('\'').to_string())
            };
            Ok(Filter {
                column: unquote(column).to_string(),
                op: op.to_string(),
                value,
            })
        })
        .collect()
}

fn matches(table: &Table, row: &[RawValue], filters: &[Filter]) -> bool {
    filters.iter().all(|f| {
        let Some(idx) = table.columns.iter().position(|(n, _)| *n == f.column) else {
            return false;
        };
        let (Some(left), Some(right)) = (row[idx].as_text(), f.value.as_text()) else {
            return false;
        };
        let ord = match (left.parse::<f64>(), right.parse::<f64>()) {
            (Ok(l), Ok(r)) => l.partial_cmp(&r),
            _ => Some(left.cmp(&right)),
        };
        match (f.op.as_str(), ord) {
            ("=", Some(o)) => o.is_eq(),
            ("!=", Some(o)) | ("<>", Some(o)) => o.is_ne(),
            (">", Some(o)) => o.is_gt(),
            (">=", Some(o)) => o.is_ge(),
            ("<", Some(o)) => o.is_lt(),
            ("<=", Some(o)) => o.is_le(),
            _ => false,
        }
    })
}

/// `<tail>` after the table name: `[WHERE ...] [LIMIT n]`.
fn parse_tail(
    tail: &str,
    params: &mut VecDeque<Value>,
) -> Result<(Vec<Filter>, Option<usize>), DriverError> {
    let (tail, limit) = match tail.rsplit_once("LIMIT ") {
        Some((head, n)) => (
            head.trim(),
            Some(n.trim().parse().map_err(|_| DriverError::execution("bad LIMIT"))?),
        ),
        None => (tail.trim(), None),
    };
    let filters = match tail.strip_prefix("WHERE ") {
        Some(cond) => parse_filters(cond, params)?,
        None => Vec::new(),
    };
    Ok((filters, limit))
}

fn select(
    state: &State,
    rest: &str,
    params: &mut VecDeque<Value>,
) -> Result<Vec<RawRow>, DriverError> {
    let Some((target, from)) = rest.split_once(" FROM ") else {
        // Table-less SELECT: echo the target once.
        return Ok(vec![vec![RawValue::Text(rest.to_string())]]);
    };
    let (name, tail) = from.split_once(' ').unwrap_or((from, ""));
    let table = table(state, unquote(name))?;
    let (filters, limit) = parse_tail(tail, params)?;

    let projection: Vec<Option<usize>> = if target == "*" {
        (0..table.columns.len()).map(Some).collect()
    } else {
        split_list(target)
            .iter()
            .map(|c| {
                let c = unquote(c);
                table.columns.iter().position(|(n, _)| n == c)
            })
            .collect()
    };

    Ok(table
        .rows
        .iter()
        .filter(|row| matches(table, row, &filters))
        .take(limit.unwrap_or(usize::MAX))
        .map(|row| {
            projection
                .iter()
                .map(|idx| match idx {
                    Some(i) => row[*i].clone(),
                    None => RawValue::Text(target.to_string()),
                })
                .collect()
        })
        .collect())
}

fn delete(
    state: &mut State,
    rest: &str,
    params: &mut VecDeque<Value>,
) -> Result<Vec<RawRow>, DriverError> {
    let (name, tail) = rest.split_once(' ').unwrap_or((rest, ""));
    let name = unquote(name).to_string();
    let (filters, _) = parse_tail(tail, params)?;
    let table = state
        .tables
        .get_mut(&name)
        .ok_or_else(|| DriverError::execution(format!("Table '{name}' doesn't exist")))?;
    let snapshot = table.clone();
    table.rows.retain(|row| !matches(&snapshot, row, &filters));
    Ok(vec![])
}
