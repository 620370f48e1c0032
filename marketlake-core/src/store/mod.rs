//! SQLite persistence for the four market tables.
//!
//! Writes go through a single generic upsert keyed on each table's primary
//! key, so re-running a collector never duplicates rows. Reads are plain SQL
//! returning a column-named [`QueryResult`].

pub mod row;
pub mod table;

use std::path::{Path, PathBuf};

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{CoinDailyPrice, CoinSnapshot, OilDailyPrice, StockDailyBar};

pub use row::{Cell, IntoRow, QueryResult, Row};
pub use table::Table;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("schema violation on {table}: {reason}")]
    SchemaViolation { table: &'static str, reason: String },

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("cannot prepare database location {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One row of a batch that was not written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowRejection {
    pub index: usize,
    pub reason: String,
}

/// Result of [`MarketStore::upsert_batch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub written: usize,
    pub rejected: Vec<RowRejection>,
}

impl BatchOutcome {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Row count and date coverage of one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStats {
    pub table: Table,
    pub rows: i64,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
}

/// Handle on the market database.
pub struct MarketStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl MarketStore {
    /// Open or create a database file, creating its parent directory.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened market database");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an existing database without write access.
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!(path = %path.display(), "opened market database read-only");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            path: None,
        })
    }

    /// Backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Create every table that does not exist yet.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        for table in Table::ALL {
            self.conn.execute_batch(table.create_sql())?;
        }
        info!("market schema ready");
        Ok(())
    }

    /// Insert a row, or overwrite the supplied columns of the row sharing its
    /// key. Rejected before touching the database when a key is missing, null
    /// or empty, or when a column is unknown.
    pub fn upsert_row(&self, table: Table, row: &Row) -> Result<(), StoreError> {
        validate_row(table, row)?;
        let sql = upsert_sql(table, row);
        self.conn.execute(&sql, params_from_iter(row.values()))?;
        Ok(())
    }

    pub fn upsert<R: IntoRow>(&self, record: &R) -> Result<(), StoreError> {
        self.upsert_row(R::TABLE, &record.to_row())
    }

    pub fn upsert_coin_snapshot(&self, snapshot: &CoinSnapshot) -> Result<(), StoreError> {
        self.upsert(snapshot)
    }

    pub fn upsert_coin_price(&self, price: &CoinDailyPrice) -> Result<(), StoreError> {
        self.upsert(price)
    }

    pub fn upsert_oil_price(&self, price: &OilDailyPrice) -> Result<(), StoreError> {
        self.upsert(price)
    }

    pub fn upsert_stock_bar(&self, bar: &StockDailyBar) -> Result<(), StoreError> {
        self.upsert(bar)
    }

    /// Upsert each record independently.
    ///
    /// There is no enclosing transaction: a rejected record does not roll
    /// back the ones written before it.
    pub fn upsert_batch<R: IntoRow>(&self, records: &[R]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for (index, record) in records.iter().enumerate() {
            match self.upsert(record) {
                Ok(()) => outcome.written += 1,
                Err(e) => {
                    warn!(table = %R::TABLE, index, error = %e, "row rejected");
                    outcome.rejected.push(RowRejection {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }
        debug!(
            table = %R::TABLE,
            written = outcome.written,
            rejected = outcome.rejected.len(),
            "batch upserted"
        );
        outcome
    }

    /// Run arbitrary SQL. The text is executed as given.
    pub fn run_query(&self, sql: &str) -> Result<QueryResult, StoreError> {
        self.run_query_with(sql, &[])
    }

    /// Run arbitrary SQL with positional `?` parameters.
    pub fn run_query_with(&self, sql: &str, params: &[Value]) -> Result<QueryResult, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let width = columns.len();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(Cell::from(row.get_ref(i)?));
            }
            out.push(cells);
        }
        Ok(QueryResult { columns, rows: out })
    }

    pub fn count_rows(&self, table: Table) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table.name()));
        Ok(self.conn.query_row(&sql, [], |r| r.get(0))?)
    }

    /// Row counts and date coverage for every table.
    pub fn table_stats(&self) -> Result<Vec<TableStats>, StoreError> {
        Table::ALL
            .into_iter()
            .map(|table| {
                let name = quote_ident(table.name());
                match table.date_column() {
                    Some(col) => {
                        let col = quote_ident(col);
                        let sql = format!("SELECT COUNT(*), MIN({col}), MAX({col}) FROM {name}");
                        let (rows, first_date, last_date) = self
                            .conn
                            .query_row(&sql, [], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?;
                        Ok(TableStats {
                            table,
                            rows,
                            first_date,
                            last_date,
                        })
                    }
                    None => Ok(TableStats {
                        table,
                        rows: self.count_rows(table)?,
                        first_date: None,
                        last_date: None,
                    }),
                }
            })
            .collect()
    }
}

fn validate_row(table: Table, row: &Row) -> Result<(), StoreError> {
    let violation = |reason: String| StoreError::SchemaViolation {
        table: table.name(),
        reason,
    };

    if let Some(unknown) = row.keys().find(|c| !table.has_column(c)) {
        return Err(violation(format!("unknown column '{unknown}'")));
    }
    for key in table.key_columns() {
        match row.get(*key) {
            None => return Err(violation(format!("missing key column '{key}'"))),
            Some(Value::Null) => return Err(violation(format!("key column '{key}' is null"))),
            Some(Value::Text(s)) if s.trim().is_empty() => {
                return Err(violation(format!("key column '{key}' is empty")))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn upsert_sql(table: Table, row: &Row) -> String {
    let columns: Vec<String> = row.keys().map(|c| quote_ident(c)).collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    let conflict: Vec<String> = table.key_columns().iter().map(|c| quote_ident(c)).collect();
    let updates: Vec<String> = row
        .keys()
        .filter(|c| !table.is_key(c))
        .map(|c| {
            let q = quote_ident(c);
            format!("{q} = excluded.{q}")
        })
        .collect();

    let action = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {}",
        quote_ident(table.name()),
        columns.join(", "),
        placeholders.join(", "),
        conflict.join(", "),
        action
    )
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
