//! The execution gate: the one choke point between statements and the
//! shared connection.
//!
//! Every statement runs as `lock → USE (if a database is set) → execute →
//! commit → collect rows → unlock`. The lock is a tokio [`Mutex`] held by a
//! guard, so it is released on every exit path, including errors and a
//! dropped future. No two callers' `USE`/execute pairs can interleave.
//!
//! # Example
//!
//! ```ignore
//! use sqlgate::{Clauses, Gate};
//!
//! let gate = Gate::new(conn);
//! let mut session = gate.session();
//! session.use_database("shop", Some("users")).await?;
//! let adults = session.select("*", &Clauses::new().filter(("age >= %s", 18))).await?;
//! ```

use crate::config::GateConfig;
use crate::connection::{Connection, DriverError, RawRow};
use crate::error::{GateError, GateResult};
use crate::ident::Ident;
use crate::session::Session;
use crate::statement::Statement;
use crate::trace;
use std::sync::Arc;
use tokio::sync::Mutex;

struct GateInner<C> {
    conn: Mutex<C>,
    config: GateConfig,
}

/// Lock-guarded owner of the single shared connection.
///
/// Cloning is cheap and every clone shares the same connection and lock.
pub struct Gate<C> {
    inner: Arc<GateInner<C>>,
}

impl<C> Clone for Gate<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> std::fmt::Debug for Gate<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl<C: Connection> Gate<C> {
    /// Take ownership of `conn` with the default configuration.
    pub fn new(conn: C) -> Self {
        Self::with_config(conn, GateConfig::default())
    }

    pub fn with_config(conn: C, config: GateConfig) -> Self {
        Self {
            inner: Arc::new(GateInner {
                conn: Mutex::new(conn),
                config,
            }),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.inner.config
    }

    /// Open a new session (cursor) over this gate.
    pub fn session(&self) -> Session<C> {
        Session::new(self.clone())
    }

    /// Run one statement under the lock.
    ///
    /// `database`, when set, is selected with `USE` inside the same critical
    /// section. `table` is only used for logging.
    pub async fn run(
        &self,
        database: Option<&Ident>,
        table: Option<&Ident>,
        stmt: &Statement,
        debug: bool,
    ) -> GateResult<Vec<RawRow>> {
        let config = &self.inner.config;
        if debug {
            trace::statement(config, database, table, stmt);
        }

        let mut conn = self.inner.conn.lock().await;
        match run_locked(&mut *conn, database, stmt).await {
            Ok(rows) => Ok(rows),
            Err(err) if err.is_interface() => {
                let reconnect = conn.reconnect().await;
                let reconnected = reconnect.is_ok();
                trace::connection_lost(
                    stmt,
                    &err.message,
                    reconnect.as_ref().map(|_| ()).map_err(|e| e.message.as_str()),
                );
                Err(GateError::Connectivity {
                    message: err.message,
                    reconnected,
                })
            }
            Err(err) => {
                trace::execution_failed(config, debug, stmt, &err.message);
                Err(GateError::Execution {
                    message: err.message,
                })
            }
        }
    }

    /// Close the shared connection. Sessions still holding the gate will
    /// get connectivity errors afterwards.
    pub async fn disconnect(&self) -> GateResult<()> {
        let mut conn = self.inner.conn.lock().await;
        conn.close().await.map_err(|e| GateError::Connectivity {
            message: e.message,
            reconnected: false,
        })
    }
}

async fn run_locked<C: Connection>(
    conn: &mut C,
    database: Option<&Ident>,
    stmt: &Statement,
) -> Result<Vec<RawRow>, DriverError> {
    if let Some(db) = database {
        let use_db = Statement::use_database(db);
        conn.execute(use_db.sql(), use_db.params()).await?;
    }
    let rows = conn.execute(stmt.sql(), stmt.params()).await?;
    conn.commit().await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::RawValue;
    use crate::value::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// Replays scripted results and records every call.
    #[derive(Default)]
    struct Scripted {
        log: Arc<StdMutex<Vec<String>>>,
        results: VecDeque<Result<Vec<RawRow>, DriverError>>,
        reconnect_ok: bool,
    }

    impl Scripted {
        fn push(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }
    }

    impl Connection for Scripted {
        async fn execute(
            &mut self,
            sql: &str,
            params: &[Value],
        ) -> Result<Vec<RawRow>, DriverError> {
            self.push(format!("execute {sql} {params:?}"));
            if sql.starts_with("USE ") {
                return Ok(vec![]);
            }
            self.results.pop_front().unwrap_or(Ok(vec![]))
        }

        async fn commit(&mut self) -> Result<(), DriverError> {
            self.push("commit".to_string());
            Ok(())
        }

        async fn reconnect(&mut self) -> Result<(), DriverError> {
            self.push("reconnect".to_string());
            if self.reconnect_ok {
                Ok(())
            } else {
                Err(DriverError::interface("still down"))
            }
        }

        async fn close(&mut self) -> Result<(), DriverError> {
            self.push("close".to_string());
            Ok(())
        }
    }

    fn scripted(
        results: Vec<Result<Vec<RawRow>, DriverError>>,
    ) -> (Scripted, Arc<StdMutex<Vec<String>>>) {
        let conn = Scripted {
            results: results.into(),
            reconnect_ok: true,
            ..Default::default()
        };
        let log = Arc::clone(&conn.log);
        (conn, log)
    }

    #[tokio::test]
    async fn use_execute_commit_in_order() {
        let (conn, log) = scripted(vec![Ok(vec![vec![RawValue::Int(1)]])]);
        let gate = Gate::new(conn);
        let db = Ident::parse("shop").unwrap();
        let stmt = Statement::raw("SELECT %s", (1,)).unwrap();

        let rows = gate.run(Some(&db), None, &stmt, false).await.unwrap();
        assert_eq!(rows, vec![vec![RawValue::Int(1)]]);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "execute USE `shop` []".to_string(),
                "execute SELECT %s [Int(1)]".to_string(),
                "commit".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn no_use_without_database() {
        let (conn, log) = scripted(vec![]);
        let gate = Gate::new(conn);
        let stmt = Statement::raw("SELECT 1", ()).unwrap();
        gate.run(None, None, &stmt, true).await.unwrap();
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn execution_error_is_not_committed() {
        let (conn, log) = scripted(vec![Err(DriverError::execution("syntax error"))]);
        let gate = Gate::new(conn);
        let stmt = Statement::raw("SELEC 1", ()).unwrap();

        let err = gate.run(None, None, &stmt, true).await.unwrap_err();
        assert!(matches!(err, GateError::Execution { ref message } if message == "syntax error"));
        assert!(!log.lock().unwrap().iter().any(|l| l == "commit"));
    }

    #[tokio::test]
    async fn interface_error_triggers_reconnect() {
        let (conn, log) = scripted(vec![Err(DriverError::interface("broken pipe"))]);
        let gate = Gate::new(conn);
        let stmt = Statement::raw("SELECT 1", ()).unwrap();

        let err = gate.run(None, None, &stmt, false).await.unwrap_err();
        assert!(matches!(err, GateError::Connectivity { reconnected: true, .. }));
        assert_eq!(log.lock().unwrap().last().unwrap(), "reconnect");
    }

    #[tokio::test]
    async fn failed_reconnect_is_reported() {
        let (mut conn, _log) = scripted(vec![Err(DriverError::interface("broken pipe"))]);
        conn.reconnect_ok = false;
        let gate = Gate::new(conn);
        let stmt = Statement::raw("SELECT 1", ()).unwrap();

        let err = gate.run(None, None, &stmt, false).await.unwrap_err();
        assert!(matches!(err, GateError::Connectivity { reconnected: false, .. }));
    }

    #[tokio::test]
    async fn lock_is_released_after_failure() {
        let (conn, _log) = scripted(vec![
            Err(DriverError::execution("boom")),
            Ok(vec![vec![RawValue::Int(2)]]),
        ]);
        let gate = Gate::new(conn);
        let stmt = Statement::raw("SELECT 2", ()).unwrap();

        assert!(gate.run(None, None, &stmt, false).await.is_err());
        let rows = gate.run(None, None, &stmt, false).await.unwrap();
        assert_eq!(rows, vec![vec![RawValue::Int(2)]]);
    }

    #[tokio::test]
    async fn disconnect_closes_connection() {
        let (conn, log) = scripted(vec![]);
        let gate = Gate::new(conn);
        gate.disconnect().await.unwrap();
        assert_eq!(log.lock().unwrap().as_slice(), ["close".to_string()]);
    }
}
