//! The seam between sqlgate and a database driver.
//!
//! The gate owns exactly one [`Connection`] and only ever calls it while
//! holding its lock, so implementations need no internal synchronization.

use crate::value::Value;
use std::fmt;

/// A cell as the driver returned it, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Textual view of the cell, if it has one.
    pub fn as_text(&self) -> Option<std::borrow::Cow<'_, str>> {
        match self {
            RawValue::Text(s) => Some(std::borrow::Cow::Borrowed(s)),
            RawValue::Bytes(b) => Some(String::from_utf8_lossy(b)),
            _ => None,
        }
    }
}

/// One row as returned by the driver.
pub type RawRow = Vec<RawValue>;

/// How a driver failure should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// The connection itself is broken (I/O, closed socket, protocol).
    Interface,
    /// The server rejected or failed the statement.
    Execution,
}

/// Error reported by a [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub message: String,
}

impl DriverError {
    pub fn interface(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Interface,
            message: message.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self {
            kind: DriverErrorKind::Execution,
            message: message.into(),
        }
    }

    pub fn is_interface(&self) -> bool {
        self.kind == DriverErrorKind::Interface
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DriverError {}

/// A single database connection.
///
/// SQL text uses `%s` for placeholders and `%%` for a literal percent sign;
/// drivers with a different placeholder syntax translate it.
pub trait Connection: Send {
    /// Execute one statement and return every row it produced.
    fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = Result<Vec<RawRow>, DriverError>> + Send;

    /// Commit the current unit of work.
    fn commit(&mut self) -> impl std::future::Future<Output = Result<(), DriverError>> + Send;

    /// Re-establish the connection after an interface failure.
    fn reconnect(&mut self) -> impl std::future::Future<Output = Result<(), DriverError>> + Send;

    /// Close the connection. Further calls are expected to fail with
    /// [`DriverErrorKind::Interface`].
    fn close(&mut self) -> impl std::future::Future<Output = Result<(), DriverError>> + Send {
        async { Ok(()) }
    }
}
