//!
//! faro database
//! -------------
//! `Database` is the relation store: it owns one in-memory SQLite connection,
//! the display name of the instance and the ordered registry of relations it
//! has created. Ingestion, single-statement queries, schema introspection and
//! snapshot export all go through here; the mapping engine persists derived
//! columns back through [`Database::add_table`].
//!
//! Every ingestion runs inside one engine transaction, so a failed write
//! leaves the relation exactly as it was.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use polars::prelude::DataFrame;
use rusqlite::backup::Backup;
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{default_snapshot_path, DatabaseConfig, ReadOptions};
use crate::error::{Error, Result};
use crate::ident::{quote_ident, quote_idents};
use crate::source::Source;
use crate::table::Table;
use crate::value::{ColumnType, Value};

/// Behaviour when ingesting under a name that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IfExists {
    /// Refuse to touch an existing relation.
    #[default]
    Fail,
    /// Drop the existing relation and create it from the source.
    Replace,
    /// Insert the source rows into the existing relation.
    Append,
}

impl FromStr for IfExists {
    type Err = Error;

    fn from_str(s: &str) -> Result<IfExists> {
        match s {
            "fail" => Ok(IfExists::Fail),
            "replace" => Ok(IfExists::Replace),
            "append" => Ok(IfExists::Append),
            other => Err(Error::InvalidPolicy(other.to_string())),
        }
    }
}

impl Display for IfExists {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            IfExists::Fail => "fail",
            IfExists::Replace => "replace",
            IfExists::Append => "append",
        };
        write!(f, "{}", s)
    }
}

pub struct Database {
    conn: Connection,
    config: DatabaseConfig,
    /// Relation names in creation order, no duplicates.
    tables: Vec<String>,
}

/// Count the non-blank statements in `sql` split on `;`.
fn statement_count(sql: &str) -> usize {
    sql.split(';').filter(|s| !s.trim().is_empty()).count()
}

fn ensure_single_statement(sql: &str) -> Result<()> {
    match statement_count(sql) {
        0 => Err(Error::invalid_argument("sql", "no statement to run")),
        1 => Ok(()),
        n => Err(Error::MultiStatement(n)),
    }
}

fn column_defs(df: &DataFrame) -> String {
    df.get_columns()
        .iter()
        .map(|c| {
            let name = quote_ident(c.name().as_str());
            match ColumnType::from_dtype(c.dtype()).sql_type() {
                "" => name,
                ty => format!("{} {}", name, ty),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl Database {
    /// Open a fresh in-memory database with the given display name.
    pub fn new(name: impl Into<String>) -> Result<Database> {
        Database::with_config(DatabaseConfig::new(name))
    }

    pub fn with_config(config: DatabaseConfig) -> Result<Database> {
        let conn = Connection::open_in_memory()?;
        debug!(target: "faro::database", "open: db='{}' in-memory connection established", config.name);
        Ok(Database { conn, config, tables: Vec::new() })
    }

    pub fn name(&self) -> &str { &self.config.name }

    pub fn set_name(&mut self, name: impl Into<String>) { self.config.name = name.into(); }

    pub fn config(&self) -> &DatabaseConfig { &self.config }

    /// Known relation names, in creation order, spelled as in the engine catalog.
    pub fn tables(&self) -> &[String] { &self.tables }

    /// Engine identifiers are ASCII case-insensitive, so is this lookup.
    pub fn has_table(&self, name: &str) -> bool { self.tables.iter().any(|t| t.eq_ignore_ascii_case(name)) }

    /// Ingest `source` under `name` with default read options.
    pub fn add_table(&mut self, source: impl Into<Source>, name: &str, if_exists: IfExists) -> Result<()> {
        self.add_table_with(source, name, if_exists, &ReadOptions::default())
    }

    /// Ingest `source` under `name`, honouring `if_exists`.
    ///
    /// With [`IfExists::Fail`] a known name (compared case-insensitively) is
    /// rejected before any engine call. The frame is written in a single
    /// transaction; the registry is resynchronized only after the commit succeeds.
    pub fn add_table_with(
        &mut self,
        source: impl Into<Source>,
        name: &str,
        if_exists: IfExists,
        opts: &ReadOptions,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(Error::invalid_argument("name", "table name must not be empty"));
        }
        if if_exists == IfExists::Fail && self.has_table(name) {
            return Err(Error::AlreadyExists(name.to_string()));
        }
        let source = source.into();
        let kind = source.kind();
        let df = source.adapt(opts)?;
        let rows = self.write_frame(&df, name, if_exists)?;
        self.sync_registry()?;
        info!(
            target: "faro::database",
            "add_table: db='{}' table='{}' source={} policy={} rows={} columns={}",
            self.name(), name, kind, if_exists, rows, df.width()
        );
        Ok(())
    }

    fn write_frame(&mut self, df: &DataFrame, name: &str, if_exists: IfExists) -> Result<usize> {
        if df.width() == 0 {
            return Err(Error::invalid_argument("source", "source has no columns"));
        }
        // Materialize rows before touching the engine so conversion errors leave it untouched.
        let rows = Table::from_dataframe(df)?.into_rows();
        let table = quote_ident(name);
        let defs = column_defs(df);
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            quote_idents(df.get_column_names().iter().map(|c| c.as_str())),
            vec!["?"; df.width()].join(", ")
        );

        let tx = self.conn.transaction()?;
        match if_exists {
            IfExists::Fail => {
                tx.execute(&format!("CREATE TABLE {} ({})", table, defs), [])?;
            }
            IfExists::Replace => {
                tx.execute(&format!("DROP TABLE IF EXISTS {}", table), [])?;
                tx.execute(&format!("CREATE TABLE {} ({})", table, defs), [])?;
            }
            IfExists::Append => {
                tx.execute(&format!("CREATE TABLE IF NOT EXISTS {} ({})", table, defs), [])?;
            }
        }
        {
            let mut stmt = tx.prepare(&insert)?;
            for row in &rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        debug!(target: "faro::database", "write_frame: table='{}' policy={} inserted={}", name, if_exists, rows.len());
        Ok(rows.len())
    }

    /// Run exactly one read statement and materialize the full result set.
    ///
    /// There is no pagination: the engine is in-memory and results are held in
    /// full. Column names come from the statement descriptor. Engine errors (syntax,
    /// unknown tables) are returned unchanged as [`Error::Engine`].
    pub fn query(&self, sql: &str) -> Result<Table> {
        ensure_single_statement(sql)?;
        debug!(target: "faro::database", "query: db='{}' sql='{}'", self.name(), sql);
        let mut stmt = self.conn.prepare(sql)?;
        if !stmt.readonly() {
            return Err(Error::invalid_argument("sql", "query runs read statements only; use execute for writes"));
        }
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let types: Vec<ColumnType> = stmt.columns().iter().map(|c| ColumnType::from_decl(c.decl_type())).collect();
        let mut rows: Vec<Vec<Value>> = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut out = Vec::with_capacity(types.len());
            for (i, ty) in types.iter().enumerate() {
                out.push(Value::from_sql(row.get_ref(i)?, *ty));
            }
            rows.push(out);
        }
        debug!(target: "faro::database", "query: returned rows={} columns={}", rows.len(), columns.len());
        Ok(Table::with_types(columns, types, rows))
    }

    /// Run exactly one statement that returns no rows (DDL or DML) and return
    /// the number of changed rows. The relation registry is resynchronized with
    /// the engine catalog afterwards.
    pub fn execute(&mut self, sql: &str) -> Result<usize> {
        ensure_single_statement(sql)?;
        debug!(target: "faro::database", "execute: db='{}' sql='{}'", self.name(), sql);
        let changed = self.conn.execute(sql, [])?;
        self.sync_registry()?;
        Ok(changed)
    }

    fn catalog_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid")?;
        let names = stmt.query_map([], |r| r.get::<_, String>(0))?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    // Keeps registry order, takes the catalog's spelling for known names and
    // appends names the registry has not seen yet.
    fn sync_registry(&mut self) -> Result<()> {
        let catalog = self.catalog_tables()?;
        let mut synced: Vec<String> = Vec::with_capacity(catalog.len());
        for known in &self.tables {
            if let Some(c) = catalog.iter().find(|c| c.eq_ignore_ascii_case(known)) {
                if !synced.contains(c) { synced.push(c.clone()); }
            }
        }
        for name in catalog {
            if !synced.contains(&name) { synced.push(name); }
        }
        self.tables = synced;
        Ok(())
    }

    /// Current column names of `table`, in schema order.
    pub fn column_names(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let names = stmt.query_map([table], |r| r.get::<_, String>(0))?.collect::<rusqlite::Result<Vec<_>>>()?;
        if names.is_empty() {
            // pragma_table_info is silent for unknown tables; let the engine report it
            self.conn.prepare(&format!("SELECT * FROM {}", quote_ident(table)))?;
        }
        Ok(names)
    }

    /// Every row and column of `table`.
    pub(crate) fn read_table(&self, table: &str) -> Result<Table> {
        self.query(&format!("SELECT * FROM {}", quote_ident(table)))
    }

    /// Copy the whole in-memory database into a fresh SQLite file at `path`
    /// using the engine's online backup in a single step.
    pub fn export_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut dst = Connection::open(path)?;
        {
            let backup = Backup::new(&self.conn, &mut dst)?;
            backup.run_to_completion(i32::MAX, Duration::ZERO, None)?;
        }
        dst.close().map_err(|(_, e)| Error::Engine(e))?;
        info!(target: "faro::database", "export_snapshot: db='{}' path='{}'", self.name(), path.display());
        Ok(())
    }

    /// Export to `{name}.db`, under the configured snapshot directory if any.
    pub fn export_default_snapshot(&self) -> Result<PathBuf> {
        let path = default_snapshot_path(self.config.snapshot_dir.as_deref(), self.name());
        self.export_snapshot(&path)?;
        Ok(path)
    }

    /// Close the engine connection, reporting any close failure.
    /// Dropping a `Database` also closes it.
    pub fn close(self) -> Result<()> {
        debug!(target: "faro::database", "close: db='{}'", self.config.name);
        self.conn.close().map_err(|(_, e)| Error::Engine(e))
    }
}

impl Display for Database {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Database(\"{}\")", self.name())
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database").field("name", &self.config.name).field("tables", &self.tables).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "database_tests.rs"]
mod database_tests;
