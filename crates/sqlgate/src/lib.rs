//! # sqlgate
//!
//! Parameterized MySQL statements executed through one shared, lock-guarded
//! connection.
//!
//! ## Features
//!
//! - **Safe by construction**: identifiers are validated and backtick-quoted,
//!   values are always bound as `%s` parameters
//! - **Raw fragments**: `NOW()`, `UNHEX(..)` and friends are a distinct value
//!   kind, inlined verbatim and never bound
//! - **One gate**: `USE` + execute + commit + fetch runs atomically per
//!   statement across every session sharing a connection
//! - **Typed results**: rows are coerced with live column metadata
//!   (`SHOW COLUMNS`), NULL becomes [`Cell::Empty`]
//! - **One error type**: validation, execution and connectivity failures are
//!   all [`GateError`]
//!
//! ## Statements
//!
//! ```ignore
//! use sqlgate::{Clauses, raw};
//!
//! // INSERT INTO `users` (`name`, `age`, `created`) VALUES (%s, %s, NOW())
//! let insert = sqlgate::insert("users")
//!     .set("name", "Alice")
//!     .set("age", 30)
//!     .set("created", raw::now());
//! session.insert(&insert).await?;
//!
//! // SELECT * FROM `users` WHERE age > %s
//! let rows = session
//!     .select("*", &Clauses::new().from("users").filter(("age > %s", 18)))
//!     .await?;
//!
//! // SELECT `name` FROM `users` WHERE id = %s
//! let name = session
//!     .select_value("name", &Clauses::new().from("users").filter(("id = %s", 7)))
//!     .await?;
//! ```
//!
//! ## Drivers
//!
//! Any type implementing [`Connection`] can sit behind a [`Gate`]. The
//! `mysql` feature ships one backed by `sqlx`.

pub mod clause;
pub mod coerce;
pub mod config;
pub mod connection;
pub mod error;
pub mod gate;
pub mod ident;
pub mod param;
pub mod raw;
pub mod session;
pub mod statement;
pub mod value;

mod trace;

#[cfg(feature = "mysql")]
pub mod mysql;

pub use clause::{Clauses, Where};
pub use coerce::{Cell, ColumnMeta, LogicalType, Record};
pub use config::{ConnectOptions, GateConfig};
pub use connection::{Connection, DriverError, DriverErrorKind, RawRow, RawValue};
pub use error::{GateError, GateResult};
pub use gate::Gate;
pub use ident::{Ident, IntoIdent};
pub use param::{IntoParams, ParamList};
pub use raw::RawFragment;
pub use session::Session;
pub use statement::{
    Insert, IntoTarget, Statement, StatementKind, Target, Update, delete, insert, select, show,
    show_columns, update,
};
pub use trace::TARGET as LOG_TARGET;
pub use value::{SqlValue, Value};
