//! Call-site values and how they reach the statement text.
//!
//! A [`Value`] is always parameter-bound: the builder writes a `%s`
//! placeholder and pushes the value onto the statement's [`ParamList`].
//! A [`RawFragment`] is the one exception and is embedded verbatim.
//! [`SqlValue`] is the tagged union the serializer dispatches on.
//!
//! The literal rendering in [`Value::to_literal`] is only used when a
//! fragment constructor (e.g. [`crate::raw::json_array`]) has to inline a
//! value into SQL text.

use crate::param::ParamList;
use crate::raw::RawFragment;
use chrono::{NaiveDate, NaiveDateTime};

/// Positional placeholder understood by the connection layer.
pub const PLACEHOLDER: &str = "%s";

/// A value passed to the driver as a bound parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
}

impl Value {
    /// Render the value as an inline SQL literal.
    ///
    /// Strings are quoted and escaped, bytes become `0x<hex>`.
    pub fn to_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            Value::Int(i) => i.to_string(),
            Value::UInt(u) => u.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => quote_literal(s),
            Value::Bytes(b) => hex_literal(b),
            Value::Json(j) => quote_literal(&j.to_string()),
            Value::DateTime(dt) => quote_literal(&dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            Value::Date(d) => quote_literal(&d.format("%Y-%m-%d").to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

/// Either a bound value or a verbatim fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Bound(Value),
    Raw(RawFragment),
}

impl SqlValue {
    /// Write this value into `out`, pushing a parameter when it is bound.
    pub(crate) fn write_sql(&self, out: &mut String, params: &mut ParamList) {
        match self {
            SqlValue::Raw(fragment) => out.push_str(fragment.as_sql()),
            SqlValue::Bound(value) => {
                out.push_str(PLACEHOLDER);
                params.push(value.clone());
            }
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, SqlValue::Raw(_))
    }
}

impl From<Value> for SqlValue {
    fn from(value: Value) -> Self {
        SqlValue::Bound(value)
    }
}

impl From<RawFragment> for SqlValue {
    fn from(fragment: RawFragment) -> Self {
        SqlValue::Raw(fragment)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        SqlValue::Bound(value.into())
    }
}

/// Implements `From<$ty>` for both [`Value`] and [`SqlValue`].
macro_rules! impl_value_from {
    ($($ty:ty => |$v:ident| $conv:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $conv
                }
            }

            impl From<$ty> for SqlValue {
                fn from(v: $ty) -> Self {
                    SqlValue::Bound(Value::from(v))
                }
            }
        )*
    };
}

impl_value_from! {
    bool => |v| Value::Bool(v),
    i8 => |v| Value::Int(v.into()),
    i16 => |v| Value::Int(v.into()),
    i32 => |v| Value::Int(v.into()),
    i64 => |v| Value::Int(v),
    u8 => |v| Value::UInt(v.into()),
    u16 => |v| Value::UInt(v.into()),
    u32 => |v| Value::UInt(v.into()),
    u64 => |v| Value::UInt(v),
    f32 => |v| Value::Float(v.into()),
    f64 => |v| Value::Float(v),
    &str => |v| Value::Text(v.to_string()),
    String => |v| Value::Text(v),
    &String => |v| Value::Text(v.clone()),
    Vec<u8> => |v| Value::Bytes(v),
    &[u8] => |v| Value::Bytes(v.to_vec()),
    serde_json::Value => |v| Value::Json(v),
    NaiveDateTime => |v| Value::DateTime(v),
    NaiveDate => |v| Value::Date(v),
}

/// Escape a string the way MySQL's `escape_string` does, and double `%`
/// because statement text is placeholder-interpreted.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\0' => out.push_str("\\0"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '%' => out.push_str("%%"),
            c => out.push(c),
        }
    }
    out
}

/// Quote and escape a string literal: `'it\'s'`.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", escape_string(s))
}

/// Render bytes as a MySQL hex literal (`0xDEAD`); empty input is `X''`.
pub fn hex_literal(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "X''".to_string();
    }
    format!("0x{}", hex::encode(bytes))
}

/// Join literal renderings with `, `. An empty slice yields an empty string.
pub fn literal_list(values: &[Value]) -> String {
    values
        .iter()
        .map(Value::to_literal)
        .collect::<Vec<_>>()
        .join(", ")
}
