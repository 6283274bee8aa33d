//! Pre-formed SQL fragments.
//!
//! A [`RawFragment`] is embedded into statement text verbatim and never goes
//! through parameter binding. The constructors in this module are the
//! intended way to build one; each escapes whatever literal it embeds.
//!
//! ```ignore
//! use sqlgate::raw;
//!
//! let stmt = sqlgate::insert("events")
//!     .set("name", "login")
//!     .set("created_at", raw::now())
//!     .build(None)?;
//! assert_eq!(stmt.params().len(), 1);
//! # Ok::<(), sqlgate::GateError>(())
//! ```

use crate::error::{GateError, GateResult};
use crate::value::{Value, hex_literal as render_hex, literal_list, quote_literal};
use std::fmt;

/// SQL text trusted to be safe as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawFragment(String);

impl RawFragment {
    /// Wrap caller-supplied SQL without any escaping.
    ///
    /// The caller is responsible for the text being safe. Prefer the
    /// constructor functions in this module.
    pub fn trusted(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_sql(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RawFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `NOW()`
pub fn now() -> RawFragment {
    RawFragment("NOW()".to_string())
}

/// `UNHEX('<hex>')`
pub fn unhex(hex: &str) -> RawFragment {
    RawFragment(format!("UNHEX({})", quote_literal(hex)))
}

/// `LOAD_FILE('<path>')`
pub fn load_file(path: &str) -> RawFragment {
    RawFragment(format!("LOAD_FILE({})", quote_literal(path)))
}

/// `JSON_ARRAY(v1, v2, ...)` with each value inlined as a literal.
pub fn json_array(values: &[Value]) -> RawFragment {
    RawFragment(format!("JSON_ARRAY({})", literal_list(values)))
}

/// Byte literal `0x<hex>` for raw bytes.
pub fn hex_bytes(bytes: &[u8]) -> RawFragment {
    RawFragment(render_hex(bytes))
}

/// Byte literal for the UTF-8 encoding of `s`.
pub fn hex_str(s: &str) -> RawFragment {
    hex_bytes(s.as_bytes())
}

/// Byte literal from an already hex-encoded string (`"cafe"` → `0xcafe`).
///
/// Rejects anything that is not an even-length run of hex digits.
pub fn hex_literal(text: &str) -> GateResult<RawFragment> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if digits.is_empty() {
        return Ok(RawFragment("X''".to_string()));
    }
    hex::decode(digits)
        .map_err(|e| GateError::validation(format!("not a hex literal: {text:?} ({e})")))?;
    Ok(RawFragment(format!("0x{digits}")))
}
