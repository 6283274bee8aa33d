//! Per-caller cursor over a shared [`Gate`].

use crate::clause::Clauses;
use crate::coerce::{self, Cell, ColumnMeta, Record};
use crate::connection::{Connection, RawRow};
use crate::error::{GateError, GateResult};
use crate::gate::Gate;
use crate::ident::{Ident, IntoIdent};
use crate::param::IntoParams;
use crate::raw::RawFragment;
use crate::statement::{self, Insert, IntoTarget, Statement, Target, Update};

/// A cursor: the shared gate plus this caller's defaults.
///
/// The current database is selected with `USE` before every statement; the
/// current table is the FROM/INTO default whenever a statement omits one.
/// Sessions are cheap and independent; they only share the gate's lock.
pub struct Session<C> {
    gate: Gate<C>,
    debug: bool,
    database: Option<Ident>,
    table: Option<Ident>,
}

impl<C> Clone for Session<C> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            debug: self.debug,
            database: self.database.clone(),
            table: self.table.clone(),
        }
    }
}

impl<C> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("debug", &self.debug)
            .field("database", &self.database)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl<C: Connection> Session<C> {
    pub(crate) fn new(gate: Gate<C>) -> Self {
        let debug = gate.config().debug;
        Self {
            gate,
            debug,
            database: None,
            table: None,
        }
    }

    pub fn gate(&self) -> &Gate<C> {
        &self.gate
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Override the debug flag inherited from the gate config.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn database(&self) -> Option<&Ident> {
        self.database.as_ref()
    }

    pub fn table(&self) -> Option<&Ident> {
        self.table.as_ref()
    }

    /// Switch to `database` and make `table` the default table.
    ///
    /// Both names are validated before anything runs. The defaults change
    /// only if the `USE` succeeds; passing no table clears the old one.
    pub async fn use_database<T: IntoIdent>(
        &mut self,
        database: impl IntoIdent,
        table: Option<T>,
    ) -> GateResult<()> {
        let database = database.into_ident()?;
        let table = table.map(IntoIdent::into_ident).transpose()?;

        let stmt = Statement::use_database(&database);
        self.gate
            .run(None, table.as_ref(), &stmt, self.debug)
            .await?;

        self.database = Some(database);
        self.table = table;
        Ok(())
    }

    /// Set the default table without touching the server.
    pub fn set_table(&mut self, table: impl IntoIdent) -> GateResult<()> {
        self.table = Some(table.into_ident()?);
        Ok(())
    }

    /// Run a prepared statement under this session's database.
    pub async fn execute(&self, stmt: &Statement) -> GateResult<Vec<RawRow>> {
        self.gate
            .run(self.database.as_ref(), self.table.as_ref(), stmt, self.debug)
            .await
    }

    /// Run raw SQL with `%s` placeholders.
    pub async fn run(
        &self,
        sql: impl Into<String>,
        params: impl IntoParams,
    ) -> GateResult<Vec<RawRow>> {
        let stmt = Statement::raw(sql, params)?;
        self.execute(&stmt).await
    }

    /// `SELECT target ...`, each row coerced in column order.
    pub async fn select(
        &self,
        target: impl IntoTarget,
        clauses: &Clauses,
    ) -> GateResult<Vec<Vec<Cell>>> {
        let target = target.into_target()?;
        let (rows, shape) = self.select_raw(&target, clauses).await?;
        rows.into_iter()
            .map(|row| coerce::coerce_row(row, &shape))
            .collect()
    }

    /// The first row's `column`, or `None` when nothing matched.
    pub async fn select_value(
        &self,
        column: impl IntoIdent,
        clauses: &Clauses,
    ) -> GateResult<Option<Cell>> {
        let target = Target::Columns(vec![column.into_ident()?]);
        let (rows, shape) = self.select_raw(&target, clauses).await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        Ok(coerce::coerce_row(row, &shape)?.into_iter().next())
    }

    /// Like [`Session::select`] but every row is keyed by column name.
    pub async fn select_records(
        &self,
        target: impl IntoTarget,
        clauses: &Clauses,
    ) -> GateResult<Vec<Record>> {
        let target = target.into_target()?;
        let (rows, shape) = self.select_raw(&target, clauses).await?;
        rows.into_iter()
            .map(|row| coerce::coerce_record(row, &shape))
            .collect()
    }

    /// Whether any row matches. Issues `SELECT 1 ... LIMIT 1`.
    pub async fn exists(&self, clauses: &Clauses) -> GateResult<bool> {
        let clauses = clauses.clone().limit(1);
        let target = Target::Expr(RawFragment::trusted("1"));
        let stmt = statement::select_target(&target, &clauses, self.table.as_ref())?;
        Ok(!self.execute(&stmt).await?.is_empty())
    }

    /// `SHOW <what> ...`, rows returned as the driver produced them.
    pub async fn show(&self, what: impl IntoIdent, clauses: &Clauses) -> GateResult<Vec<RawRow>> {
        let stmt = statement::show(what, clauses, self.table.as_ref())?;
        self.execute(&stmt).await
    }

    /// Column names and types of `table` (default: the current table).
    pub async fn show_columns(&self, table: Option<&str>) -> GateResult<Vec<ColumnMeta>> {
        let table = match table {
            Some(t) => Ident::parse(t)?,
            None => self
                .table
                .clone()
                .ok_or_else(|| GateError::validation("SHOW COLUMNS: no table selected"))?,
        };
        self.columns_of(&table).await
    }

    pub async fn insert(&self, insert: &Insert) -> GateResult<()> {
        let stmt = insert.build(self.table.as_ref())?;
        self.execute(&stmt).await.map(drop)
    }

    pub async fn update(&self, update: &Update) -> GateResult<()> {
        let stmt = update.build(self.table.as_ref())?;
        self.execute(&stmt).await.map(drop)
    }

    pub async fn delete(&self, clauses: &Clauses) -> GateResult<()> {
        let stmt = statement::delete(clauses, self.table.as_ref())?;
        self.execute(&stmt).await.map(drop)
    }

    /// Run the SELECT, then (if it returned rows and has a table) fetch the
    /// table's metadata and derive the coercion shape.
    async fn select_raw(
        &self,
        target: &Target,
        clauses: &Clauses,
    ) -> GateResult<(Vec<RawRow>, Vec<ColumnMeta>)> {
        let stmt = statement::select_target(target, clauses, self.table.as_ref())?;
        let rows = self.execute(&stmt).await?;
        if rows.is_empty() {
            return Ok((rows, Vec::new()));
        }

        let columns = match clauses.resolve_table(self.table.as_ref()) {
            Some(table) => self.columns_of(table).await?,
            None => Vec::new(),
        };
        Ok((rows, coerce::shape_for(target, &columns)))
    }

    async fn columns_of(&self, table: &Ident) -> GateResult<Vec<ColumnMeta>> {
        let stmt = statement::show_columns(table);
        self.execute(&stmt)
            .await?
            .iter()
            .map(ColumnMeta::from_show_columns)
            .collect()
    }
}
