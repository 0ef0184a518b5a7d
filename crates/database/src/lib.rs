//! Synchronous embedded-database façade (§4.5): [`Connection`] owns a
//! [`StorageEngine`] and an optional physical [`Wal`], parses/plans/executes
//! SQL text, and drives `begin`/`commit`/`rollback` by snapshotting page
//! pre-images into a [`buffer::RecordingPager`] and replaying them into the
//! WAL (or restoring them directly, for an in-memory connection with no log
//! to replay).
//!
//! There is no async runtime and no replication here: a `Connection` is not
//! `Sync`, is driven to completion on every call, and callers serialize
//! access to it externally (§5).

mod error_code;

#[cfg(test)]
mod tests;

use common::{Config, DbError, DbResult};
use executor::ExecResult;
use parser::{parse_sql, Statement};
use planner::{plan, ExecutionStep};
use std::path::{Path, PathBuf};
use storage::StorageEngine;
use types::Value;
use wal::Wal;

pub use error_code::ErrorCode;

/// A database connection: the single owner of its storage engine and (for a
/// file-backed connection) its write-ahead log.
pub struct Connection {
    storage: StorageEngine,
    wal: Option<Wal>,
    active_txn: Option<u64>,
    next_txn_id: u64,
    snapshots: hashbrown::HashMap<u32, Vec<u8>>,
}

impl Connection {
    /// Opens (creating if necessary) a file-backed connection at `path`,
    /// replaying and checkpointing its WAL (`<path>.wal`) on open.
    pub fn open(path: impl AsRef<Path>, config: Config) -> DbResult<Self> {
        let db_path = path.as_ref().to_path_buf();
        let wal_path = wal_path_for(&db_path);
        // The WAL must replay into `db_path` before the pager opens it:
        // `Wal::open` checkpoints through its own file handle, and a pager
        // that had already cached page 1 or a table's btree pages would
        // never see those replayed bytes.
        let wal = Wal::open(&wal_path, &db_path)?;
        let storage = StorageEngine::open(&db_path, &config)?;
        Ok(Self {
            storage,
            wal: Some(wal),
            active_txn: None,
            next_txn_id: 1,
            snapshots: hashbrown::HashMap::new(),
        })
    }

    /// `open` with `Config::default()`.
    pub fn open_default(path: impl AsRef<Path>) -> DbResult<Self> {
        Self::open(path, Config::default())
    }

    /// Opens a connection with no backing file at all.
    pub fn open_memory(config: Config) -> Self {
        Self {
            storage: StorageEngine::open_memory(&config),
            wal: None,
            active_txn: None,
            next_txn_id: 1,
            snapshots: hashbrown::HashMap::new(),
        }
    }

    /// `open_memory` with `Config::default()`.
    pub fn open_memory_default() -> Self {
        Self::open_memory(Config::default())
    }

    /// Flushes the pager (a no-op for an in-memory connection) and consumes
    /// the connection.
    pub fn close(mut self) -> DbResult<()> {
        self.storage.flush()
    }

    /// Parses, plans, and runs every statement in `sql` in turn, returning
    /// the last statement's result.
    pub fn execute(&mut self, sql: &str) -> DbResult<ExecResult> {
        let statements = parse_sql(sql)?;
        let mut result = ExecResult::default();
        for statement in statements {
            result = self.execute_statement(statement, &[])?;
        }
        Ok(result)
    }

    /// Parses and plans `sql`, caching the plan and counting `?` placeholders
    /// textually so the caller can bind them before `step`ping.
    pub fn prepare(&self, sql: &str) -> DbResult<PreparedStatement> {
        let mut statements = parse_sql(sql)?;
        if statements.len() != 1 {
            return Err(DbError::UnsupportedFeature(
                "prepare expects exactly one statement".to_string(),
            ));
        }
        let statement = statements.remove(0);
        let parameter_count = sql.matches('?').count() as u32;
        let steps = plan(statement)?;
        Ok(PreparedStatement {
            steps,
            parameter_count,
            bound: vec![Value::Null; parameter_count as usize],
        })
    }

    /// Begins a transaction. Fails with [`DbError::TransactionAlreadyActive`]
    /// if one is already active.
    pub fn begin(&mut self) -> DbResult<()> {
        if self.active_txn.is_some() {
            return Err(DbError::TransactionAlreadyActive);
        }
        let txn_id = match &mut self.wal {
            Some(wal) => wal.begin()?,
            None => {
                let id = self.next_txn_id;
                self.next_txn_id += 1;
                id
            }
        };
        self.active_txn = Some(txn_id);
        self.snapshots.clear();
        Ok(())
    }

    /// Records every dirtied page's pre/post image into the WAL (if one is
    /// open) and fsyncs it, then clears the transaction.
    pub fn commit(&mut self) -> DbResult<()> {
        let txn_id = self.active_txn.take().ok_or(DbError::NoActiveTransaction)?;
        let snapshots: Vec<(u32, Vec<u8>)> = self.snapshots.drain().collect();
        if let Some(wal) = &mut self.wal {
            for (page_id, pre_image) in snapshots {
                let page = self.storage.pager_mut().get(page_id)?;
                wal.record_page_write(txn_id, page_id, 0, &pre_image, &page.bytes)?;
            }
            wal.commit(txn_id)?;
        }
        Ok(())
    }

    /// Restores every page dirtied during the transaction to its pre-image
    /// so a caller inspecting the table immediately afterward sees
    /// pre-transaction state, then clears the transaction.
    pub fn rollback(&mut self) -> DbResult<()> {
        let txn_id = self.active_txn.take().ok_or(DbError::NoActiveTransaction)?;
        let snapshots: Vec<(u32, Vec<u8>)> = self.snapshots.drain().collect();
        for (page_id, pre_image) in snapshots {
            let page = self.storage.pager_mut().get_mut(page_id)?;
            page.bytes.copy_from_slice(&pre_image);
            self.storage.pager_mut().mark_dirty(page_id)?;
        }
        if let Some(wal) = &mut self.wal {
            wal.rollback(txn_id)?;
        }
        Ok(())
    }

    fn execute_statement(&mut self, statement: Statement, params: &[Value]) -> DbResult<ExecResult> {
        match statement {
            Statement::Begin => {
                self.begin()?;
                Ok(ExecResult::default())
            }
            Statement::Commit => {
                self.commit()?;
                Ok(ExecResult::default())
            }
            Statement::Rollback => {
                self.rollback()?;
                Ok(ExecResult::default())
            }
            other => {
                let steps = plan(other)?;
                self.run_plan(&steps, params)
            }
        }
    }

    /// Runs a precomputed step list, threading the active transaction's
    /// pre-image map through to the executor when one is open.
    fn run_plan(&mut self, steps: &[ExecutionStep], params: &[Value]) -> DbResult<ExecResult> {
        let record_into = if self.active_txn.is_some() {
            Some(&mut self.snapshots)
        } else {
            None
        };
        executor::execute(steps, &mut self.storage, params, record_into)
    }
}

fn wal_path_for(db_path: &Path) -> PathBuf {
    let mut wal_path = db_path.as_os_str().to_os_string();
    wal_path.push(".wal");
    PathBuf::from(wal_path)
}

/// A parsed and planned statement with positional `?` slots, reusable across
/// many [`PreparedStatement::step`] calls (§4.5, the S3 prepared-insert-loop
/// scenario).
pub struct PreparedStatement {
    steps: Vec<ExecutionStep>,
    parameter_count: u32,
    bound: Vec<Value>,
}

impl PreparedStatement {
    pub fn parameter_count(&self) -> u32 {
        self.parameter_count
    }

    /// Binds `value` to the `index`-th `?`, deep-copying `Text`/`Blob` data.
    /// Rebinding an already-bound index replaces (and drops) the previous
    /// value.
    pub fn bind_parameter(&mut self, index: u32, value: Value) -> DbResult<()> {
        if index >= self.parameter_count {
            return Err(DbError::InvalidParameterIndex(index));
        }
        self.bound[index as usize] = value;
        Ok(())
    }

    /// Resets every bound parameter to `Null` without discarding the cached
    /// plan.
    pub fn reset(&mut self) {
        for value in &mut self.bound {
            *value = Value::Null;
        }
    }

    /// Executes the cached plan once against `conn`, substituting each
    /// `Parameter(i)` with the `i`-th bound value.
    pub fn step(&mut self, conn: &mut Connection) -> DbResult<ExecResult> {
        conn.run_plan(&self.steps, &self.bound)
    }
}
