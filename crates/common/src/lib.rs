//! Shared error, row, and configuration types used across every subsystem.
//!
//! `DbError` is the single error currency of the engine: every fallible public
//! function in every crate returns a `DbResult<T>`. `Row` is the positional
//! value sequence that flows from the B-tree up through the executor. `Config`
//! carries the pager/WAL tuning knobs with defaults matching the spec's
//! constants.


use std::io;
use thiserror::Error;
use types::Value;

/// Ordered sequence of [`Value`]s. Positions correspond to schema columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row(pub Vec<Value>);

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row::new(values)
    }
}

/// Canonical error type shared across database subsystems.
///
/// One variant family per component (§7 of the spec); each carries enough
/// context to format a useful message without the caller needing to match on
/// an inner kind enum.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("pager: page {0} is not cached")]
    PageNotCached(u32),
    #[error("pager: short write on page {0}: wrote {1} of {2} bytes")]
    ShortWrite(u32, usize, usize),
    #[error("pager io error: {0}")]
    PagerIo(String),

    #[error("wal: no active transaction")]
    NoActiveTransaction,
    #[error("wal: a transaction is already active")]
    TransactionAlreadyActive,
    #[error("wal io error: {0}")]
    WalIo(String),

    #[error("btree: node order mismatch: page encoded with order {found}, tree expects {expected}")]
    OrderMismatch { expected: u32, found: u32 },
    #[error("btree: invalid value type tag {0}")]
    InvalidValueType(u8),

    #[error("storage: table '{0}' not found")]
    TableNotFound(String),
    #[error("storage: table '{0}' already exists")]
    TableAlreadyExists(String),
    #[error("storage: unique constraint violated on column '{0}'")]
    UniqueConstraintViolation(String),

    #[error("parser: unexpected token {0}")]
    UnexpectedToken(String),
    #[error("parser: unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("parser: unterminated string literal")]
    UnterminatedString,
    #[error("parser: expected an identifier, found {0}")]
    ExpectedIdentifier(String),
    #[error("parser: expected a value, found {0}")]
    ExpectedValue(String),
    #[error("parser: expected an operator, found {0}")]
    ExpectedOperator(String),
    #[error("parser: expected a number, found {0}")]
    ExpectedNumber(String),
    #[error("parser: unknown data type '{0}'")]
    UnknownDataType(String),

    #[error("execution: parameter index {0} is out of range")]
    InvalidParameterIndex(u32),
    #[error("execution: unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Runtime configuration for the pager/WAL subsystems.
///
/// Defaults match the spec's constants exactly: a 4096-byte page, a cache
/// capped at 1000 pages, and eviction batching down to 750 once the cap is
/// exceeded.
///
/// ```
/// use common::Config;
///
/// let config = Config::builder().page_size(8192).build();
/// assert_eq!(config.max_cached_pages, 1000);
/// ```
#[derive(Clone, Debug, bon::Builder)]
pub struct Config {
    #[builder(default = 4096)]
    pub page_size: usize,
    #[builder(default = 1000)]
    pub max_cached_pages: usize,
    #[builder(default = 750)]
    pub eviction_target: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: 4096,
            max_cached_pages: 1000,
            eviction_target: 750,
        }
    }
}
