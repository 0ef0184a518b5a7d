//! Query planner (§4.8): lowers a parsed [`parser::Statement`] into a flat,
//! ordered [`Vec<ExecutionStep>`] the executor runs sequentially.
//!
//! There is no logical/physical plan tree here, no catalog-bound name
//! binding, and no access-method selection — every table is scanned, and
//! the filter/project/limit steps carry the AST's condition/column data
//! deep-cloned so the plan can outlive the parser's buffers (§3
//! "Ownership", §4.8's closing paragraph).


use catalog::{Column, TableSchema};
use common::DbResult;
use expr::{Condition, Expression};
use parser::{ColumnDef, SelectItem, Statement};

/// One step of a flat execution plan, run in order by the executor (§4.9).
#[derive(Clone, Debug, PartialEq)]
pub enum ExecutionStep {
    TableScan {
        table: String,
    },
    Filter {
        condition: Condition,
    },
    /// `columns = [SelectItem::Wildcard]` short-circuits projection at
    /// execution rather than being expanded against the schema here (§9).
    Project {
        columns: Vec<SelectItem>,
    },
    Limit {
        limit: Option<u64>,
        offset: Option<u64>,
    },
    Insert {
        table: String,
        columns: Option<Vec<String>>,
        rows: Vec<Vec<Expression>>,
    },
    CreateTable {
        name: String,
        schema: TableSchema,
        if_not_exists: bool,
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

/// Lowers `statement` into its ordered execution steps.
pub fn plan(statement: Statement) -> DbResult<Vec<ExecutionStep>> {
    let steps = match statement {
        Statement::Select {
            columns,
            table,
            selection,
            limit,
            offset,
        } => {
            let mut steps = vec![ExecutionStep::TableScan { table }];
            if let Some(condition) = selection {
                steps.push(ExecutionStep::Filter { condition });
            }
            steps.push(ExecutionStep::Project { columns });
            if limit.is_some() || offset.is_some() {
                steps.push(ExecutionStep::Limit { limit, offset });
            }
            steps
        }
        Statement::Insert {
            table,
            columns,
            rows,
        } => vec![ExecutionStep::Insert {
            table,
            columns,
            rows,
        }],
        Statement::CreateTable {
            name,
            if_not_exists,
            columns,
        } => {
            let schema = TableSchema::new(columns.into_iter().map(lower_column).collect());
            vec![ExecutionStep::CreateTable {
                name,
                schema,
                if_not_exists,
            }]
        }
        Statement::Update {
            table,
            assignments,
            selection,
        } => vec![ExecutionStep::Update {
            table,
            assignments,
            selection,
        }],
        Statement::Delete { table, selection } => vec![ExecutionStep::Delete { table, selection }],
        Statement::Begin => vec![ExecutionStep::Begin],
        Statement::Commit => vec![ExecutionStep::Commit],
        Statement::Rollback => vec![ExecutionStep::Rollback],
    };
    Ok(steps)
}

/// Lowers a parsed `CREATE TABLE` column into the catalog's `Column`.
///
/// `is_unique` is parsed (§4.7's grammar names it as a constraint) but has
/// no counterpart on `catalog::Column` and is dropped here: uniqueness is
/// not enforced anywhere in the executor, matching how `is_primary_key`
/// alone carries no uniqueness guarantee either (see DESIGN.md).
fn lower_column(col: ColumnDef) -> Column {
    Column {
        name: col.name,
        ty: col.ty,
        is_primary_key: col.is_primary_key,
        is_nullable: col.is_nullable,
        default: col.default,
    }
}
