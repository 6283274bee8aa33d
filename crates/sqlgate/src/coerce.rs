//! Raw cell → typed value conversion driven by column metadata.

use crate::connection::{RawRow, RawValue};
use crate::error::{GateError, GateResult};
use crate::statement::Target;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// Logical type of a column, derived from its declared MySQL type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalType {
    Text,
    Int,
    Float,
    Json,
    /// Anything else; cells pass through unchanged.
    Other(String),
}

impl LogicalType {
    /// Map a declared type (`int(11)`, `bigint unsigned`, `varchar(64)`, ...).
    pub fn from_declared(declared: &str) -> Self {
        let lower = declared.trim().to_ascii_lowercase();
        let base = lower
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();
        match base {
            "text" | "tinytext" | "mediumtext" | "longtext" | "varchar" | "char" | "enum"
            | "set" => LogicalType::Text,
            "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "bigint" | "year" => {
                LogicalType::Int
            }
            "float" | "double" | "real" => LogicalType::Float,
            "json" => LogicalType::Json,
            _ => LogicalType::Other(base.to_string()),
        }
    }
}

/// One column of a table: name plus logical type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub logical_type: LogicalType,
    /// The declared type as the server reported it.
    pub declared: String,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, declared: impl Into<String>) -> Self {
        let declared = declared.into();
        Self {
            name: name.into(),
            logical_type: LogicalType::from_declared(&declared),
            declared,
        }
    }

    /// A column whose cells pass through unchanged.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logical_type: LogicalType::Other(String::new()),
            declared: String::new(),
        }
    }

    /// Build from a `SHOW COLUMNS` row. Only `Field` and `Type` are read.
    pub fn from_show_columns(row: &RawRow) -> GateResult<Self> {
        let field = |idx: usize, what: &str| {
            row.get(idx)
                .and_then(RawValue::as_text)
                .map(|s| s.into_owned())
                .ok_or_else(|| GateError::decode(what, "missing in SHOW COLUMNS row"))
        };
        Ok(Self::new(field(0, "Field")?, field(1, "Type")?))
    }
}

/// A coerced cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// SQL NULL. Serializes as an empty object.
    Empty,
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            Cell::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(f) => Some(*f),
            Cell::Int(i) => Some(*i as f64),
            Cell::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Cell::Json(v) => Some(v),
            _ => None,
        }
    }

    fn passthrough(raw: RawValue) -> Self {
        match raw {
            RawValue::Null => Cell::Empty,
            RawValue::Int(i) => Cell::Int(i),
            RawValue::UInt(u) => Cell::UInt(u),
            RawValue::Float(f) => Cell::Float(f),
            RawValue::Text(s) => Cell::Text(s),
            RawValue::Bytes(b) => Cell::Bytes(b),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Empty => serializer.serialize_map(Some(0))?.end(),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Int(i) => serializer.serialize_i64(*i),
            Cell::UInt(u) => serializer.serialize_u64(*u),
            Cell::Float(f) => serializer.serialize_f64(*f),
            Cell::Json(v) => v.serialize(serializer),
            Cell::Bytes(b) => serializer.serialize_bytes(b),
        }
    }
}

/// A row keyed by column name.
pub type Record = BTreeMap<String, Cell>;

/// Convert one raw cell according to `column`.
pub fn coerce(raw: RawValue, column: &ColumnMeta) -> GateResult<Cell> {
    if raw.is_null() {
        return Ok(Cell::Empty);
    }
    match column.logical_type {
        LogicalType::Text => Ok(match raw {
            RawValue::Bytes(b) => match String::from_utf8(b) {
                Ok(s) => Cell::Text(s),
                Err(e) => Cell::Bytes(e.into_bytes()),
            },
            other => Cell::passthrough(other),
        }),
        LogicalType::Int => coerce_int(raw, column),
        LogicalType::Float => coerce_float(raw, column),
        LogicalType::Json => coerce_json(raw, column),
        LogicalType::Other(_) => Ok(Cell::passthrough(raw)),
    }
}

fn coerce_int(raw: RawValue, column: &ColumnMeta) -> GateResult<Cell> {
    match raw {
        RawValue::Int(i) => Ok(Cell::Int(i)),
        RawValue::UInt(u) => Ok(i64::try_from(u).map_or(Cell::UInt(u), Cell::Int)),
        RawValue::Float(f) if f.is_finite() => Ok(Cell::Int(f.trunc() as i64)),
        ref text @ (RawValue::Text(_) | RawValue::Bytes(_)) => {
            let s = text.as_text().unwrap_or_default();
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Ok(Cell::Int(i))
            } else if let Ok(u) = s.parse::<u64>() {
                Ok(Cell::UInt(u))
            } else {
                Err(GateError::decode(
                    &column.name,
                    format!("{s:?} is not an integer"),
                ))
            }
        }
        other => Err(GateError::decode(
            &column.name,
            format!("cannot read {other:?} as an integer"),
        )),
    }
}

fn coerce_float(raw: RawValue, column: &ColumnMeta) -> GateResult<Cell> {
    match raw {
        RawValue::Float(f) => Ok(Cell::Float(f)),
        RawValue::Int(i) => Ok(Cell::Float(i as f64)),
        RawValue::UInt(u) => Ok(Cell::Float(u as f64)),
        ref text => {
            let s = text.as_text().unwrap_or_default();
            s.trim().parse::<f64>().map(Cell::Float).map_err(|_| {
                GateError::decode(&column.name, format!("{s:?} is not a float"))
            })
        }
    }
}

fn coerce_json(raw: RawValue, column: &ColumnMeta) -> GateResult<Cell> {
    let parsed = match raw {
        RawValue::Text(s) => serde_json::from_str(&s),
        RawValue::Bytes(b) => serde_json::from_slice(&b),
        RawValue::Int(i) => return Ok(Cell::Json(i.into())),
        RawValue::UInt(u) => return Ok(Cell::Json(u.into())),
        RawValue::Float(f) => return Ok(Cell::Json(f.into())),
        RawValue::Null => return Ok(Cell::Empty),
    };
    parsed
        .map(Cell::Json)
        .map_err(|e| GateError::decode(&column.name, format!("invalid JSON: {e}")))
}

/// Coerce a row positionally against `shape`. Cells beyond the shape pass
/// through unchanged.
pub fn coerce_row(row: RawRow, shape: &[ColumnMeta]) -> GateResult<Vec<Cell>> {
    row.into_iter()
        .enumerate()
        .map(|(i, raw)| match shape.get(i) {
            Some(column) => coerce(raw, column),
            None => Ok(Cell::passthrough(raw)),
        })
        .collect()
}

/// Coerce a row into a name → value map. Cells beyond the shape are keyed by
/// their position.
pub fn coerce_record(row: RawRow, shape: &[ColumnMeta]) -> GateResult<Record> {
    let mut record = Record::new();
    for (i, raw) in row.into_iter().enumerate() {
        match shape.get(i) {
            Some(column) => {
                record.insert(column.name.clone(), coerce(raw, column)?);
            }
            None => {
                record.insert(i.to_string(), Cell::passthrough(raw));
            }
        }
    }
    Ok(record)
}

/// The column layout a SELECT of `target` produces, given the table's columns.
///
/// `*` yields the table's columns in order; a column list yields the matching
/// metadata per name (unknown names pass through untyped); an expression is
/// untyped.
pub fn shape_for(target: &Target, table: &[ColumnMeta]) -> Vec<ColumnMeta> {
    match target {
        Target::All => table.to_vec(),
        Target::Columns(cols) => cols
            .iter()
            .map(|c| {
                table
                    .iter()
                    .find(|m| m.name == c.as_str())
                    .cloned()
                    .unwrap_or_else(|| ColumnMeta::untyped(c.as_str()))
            })
            .collect(),
        Target::Expr(expr) => vec![ColumnMeta::untyped(expr.as_sql())],
    }
}
