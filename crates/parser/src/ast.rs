//! Statement tree produced by the parser (§4.7). Every owned `String` here
//! has already been copied out of the tokenizer's source-text borrows, so the
//! AST outlives the text it was parsed from.

use catalog::ColumnDefault;
use expr::{Condition, Expression};
use types::ColumnType;

/// A column reference in a `SELECT` list, with an optional alias
/// (`col AS alias` or the bare `col alias` form §4.7 allows).
#[derive(Clone, Debug, PartialEq)]
pub enum SelectItem {
    Wildcard,
    Column { name: String, alias: Option<String> },
}

/// One `CREATE TABLE` column definition, already carrying the shared
/// [`catalog::ColumnDefault`] representation the storage engine will use.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub is_primary_key: bool,
    pub is_nullable: bool,
    pub is_unique: bool,
    pub default: ColumnDefault,
}

/// A fully parsed SQL statement.
#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Select {
        columns: Vec<SelectItem>,
        table: String,
        selection: Option<Condition>,
        limit: Option<u64>,
        offset: Option<u64>,
    },
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        /// One `Vec<Expression>` per `VALUES (...)` row.
        rows: Vec<Vec<Expression>>,
    },
    CreateTable {
        name: String,
        if_not_exists: bool,
        columns: Vec<ColumnDef>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Expression)>,
        selection: Option<Condition>,
    },
    Delete {
        table: String,
        selection: Option<Condition>,
    },
    Begin,
    Commit,
    Rollback,
}
