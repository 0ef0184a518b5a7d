//! Shared schema value types: [`Column`], [`TableSchema`], and column defaults.
//!
//! These are the vocabulary a `CREATE TABLE` parsed from SQL text and a
//! `TableSchema` held by a `storage::Table` share throughout the pipeline, so
//! that the front end and the storage engine never disagree about what a
//! column is.


use types::{ColumnType, Value};

/// What a column's value defaults to when an `INSERT` omits it.
///
/// `FunctionCall` is kept unresolved (verbatim, per §4.8) — evaluating a
/// default function call is a front-end concern the executor does not
/// currently implement; only `None`/`Literal` defaults are applied at insert
/// time.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnDefault {
    None,
    Literal(Value),
    FunctionCall(String, Vec<Value>),
}

/// A single column in a [`TableSchema`].
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub is_primary_key: bool,
    pub is_nullable: bool,
    pub default: ColumnDefault,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            is_primary_key: false,
            is_nullable: true,
            default: ColumnDefault::None,
        }
    }
}

/// Ordered sequence of [`Column`]s describing a table's row shape.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableSchema {
    pub columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Resolves a column name to its ordinal position.
    ///
    /// Used only by the planner/executor's positional simplification
    /// (§4.9/§9) — full name resolution for arbitrary column positions in
    /// `Filter`/`Project`/`Update` is explicitly future work; today only the
    /// existence check (not the returned index) is load-bearing for those
    /// operators, which always read/write column 0.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}
