//! Safe SQL identifier handling.
//!
//! Identifiers (database, table, column names) cannot be parameter-bound, so
//! they are interpolated into the statement text. [`Ident`] is the only way
//! they get there: every part must match `^[A-Za-z0-9_]+$` (ASCII letters,
//! digits and underscore, fully anchored). Anything else is rejected with
//! [`GateError::InvalidIdentifier`].
//!
//! # Example
//! ```ignore
//! use sqlgate::Ident;
//!
//! let t = Ident::parse("users")?;
//! assert_eq!(t.quoted(), "`users`");
//! assert!(Ident::parse("users`; DROP TABLE x").is_err());
//! # Ok::<(), sqlgate::GateError>(())
//! ```

use crate::error::{GateError, GateResult};
use std::fmt;
use std::sync::OnceLock;

fn identifier_re() -> &'static regex::Regex {
    static IDENT_RE: OnceLock<regex::Regex> = OnceLock::new();
    IDENT_RE.get_or_init(|| {
        regex::Regex::new(r"^[A-Za-z0-9_]+$").expect("invalid built-in identifier regex")
    })
}

/// Returns `true` if `name` may be embedded in SQL text as an identifier.
pub fn is_valid_identifier(name: &str) -> bool {
    identifier_re().is_match(name)
}

/// A validated SQL identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(String);

impl Ident {
    /// Validate `name` and wrap it.
    pub fn parse(name: &str) -> GateResult<Self> {
        if is_valid_identifier(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(GateError::InvalidIdentifier(name.to_string()))
        }
    }

    /// The bare name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render as a backtick-quoted identifier.
    pub fn quoted(&self) -> String {
        let mut out = String::with_capacity(self.0.len() + 2);
        self.write_quoted(&mut out);
        out
    }

    pub(crate) fn write_quoted(&self, out: &mut String) {
        // The charset check guarantees there is no backtick to escape.
        out.push('`');
        out.push_str(&self.0);
        out.push('`');
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Convert an input into an [`Ident`].
///
/// This is mainly for ergonomics in builder APIs.
pub trait IntoIdent {
    fn into_ident(self) -> GateResult<Ident>;
}

impl IntoIdent for Ident {
    fn into_ident(self) -> GateResult<Ident> {
        Ok(self)
    }
}

impl IntoIdent for &Ident {
    fn into_ident(self) -> GateResult<Ident> {
        Ok(self.clone())
    }
}

impl IntoIdent for &str {
    fn into_ident(self) -> GateResult<Ident> {
        Ident::parse(self)
    }
}

impl IntoIdent for String {
    fn into_ident(self) -> GateResult<Ident> {
        Ident::parse(&self)
    }
}

impl IntoIdent for &String {
    fn into_ident(self) -> GateResult<Ident> {
        Ident::parse(self)
    }
}
