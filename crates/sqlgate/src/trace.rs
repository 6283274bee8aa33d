use crate::config::GateConfig;
use crate::ident::Ident;
use crate::statement::Statement;
use tracing::Level;

/// Event target for every statement-level log line.
pub const TARGET: &str = "sqlgate.sql";

/// Dispatch a tracing event at a runtime-determined level.
macro_rules! emit_at_level {
    ($level:expr, $($field:tt)*) => {
        match $level {
            Level::ERROR => tracing::error!($($field)*),
            Level::WARN  => tracing::warn!($($field)*),
            Level::INFO  => tracing::info!($($field)*),
            Level::DEBUG => tracing::debug!($($field)*),
            Level::TRACE => tracing::trace!($($field)*),
        }
    };
}

/// Truncate to at most `max` chars without splitting a UTF-8 sequence.
pub(crate) fn truncate_sql(sql: &str, max: Option<usize>) -> String {
    match max {
        Some(max) if sql.chars().count() > max => {
            let cut = sql.char_indices().nth(max).map_or(sql.len(), |(i, _)| i);
            format!("{}...", &sql[..cut])
        }
        _ => sql.to_string(),
    }
}

/// Statement about to be executed (debug mode only).
pub(crate) fn statement(
    config: &GateConfig,
    database: Option<&Ident>,
    table: Option<&Ident>,
    stmt: &Statement,
) {
    let sql = truncate_sql(stmt.sql(), config.max_sql_length);
    let database = database.map_or("-", Ident::as_str);
    let table = table.map_or("-", Ident::as_str);
    emit_at_level!(
        config.log_level,
        target: TARGET,
        kind = %stmt.kind(),
        database,
        table,
        param_count = stmt.params().len(),
        params = ?stmt.params(),
        sql = %sql,
        "executing"
    );
}

/// The server rejected the statement.
pub(crate) fn execution_failed(
    config: &GateConfig,
    debug: bool,
    stmt: &Statement,
    message: &str,
) {
    if debug {
        tracing::error!(
            target: TARGET,
            kind = %stmt.kind(),
            sql = %stmt.sql(),
            params = ?stmt.params(),
            error = %message,
            "statement failed"
        );
    } else {
        let sql = truncate_sql(stmt.sql(), config.max_sql_length);
        tracing::warn!(
            target: TARGET,
            kind = %stmt.kind(),
            sql = %sql,
            error = %message,
            "statement failed"
        );
    }
}

/// The connection dropped; `reconnected` tells whether the retry worked.
pub(crate) fn connection_lost(stmt: &Statement, message: &str, reconnected: Result<(), &str>) {
    match reconnected {
        Ok(()) => tracing::warn!(
            target: TARGET,
            kind = %stmt.kind(),
            error = %message,
            "connection lost; reconnected"
        ),
        Err(reconnect_error) => tracing::error!(
            target: TARGET,
            kind = %stmt.kind(),
            error = %message,
            reconnect_error = %reconnect_error,
            "connection lost; reconnect failed"
        ),
    }
}
