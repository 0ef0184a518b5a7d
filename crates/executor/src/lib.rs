//! Sequential step interpreter (§4.9): runs a [`planner::ExecutionStep`]
//! list against a [`storage::StorageEngine`] and accumulates an
//! [`ExecResult`].
//!
//! There is no pull-based iterator protocol here — each step runs in
//! order, fully materializing its output `Vec<Row>` before the next step
//! runs. This matches the flat, non-optimizing plan shape the planner
//! produces; there is nothing to pull from or push into beyond a single
//! `Vec<Row>` threaded step to step.

#[cfg(test)]
mod tests;

use catalog::ColumnDefault;
use common::{DbError, DbResult, Row};
use expr::{evaluate, evaluate_expr, Condition, Expression};
use parser::SelectItem;
use planner::ExecutionStep;
use storage::StorageEngine;
use types::Value;

/// The accumulated output of running a plan: every row the last `Project`
/// (or scan) step produced, plus a count of rows touched by DML steps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecResult {
    pub rows: Vec<Row>,
    pub affected_rows: u64,
}

/// Runs `steps` against `storage`, substituting `Parameter(i)` expressions
/// with `params[i]` wherever a step carries one (prepared-statement
/// execution). `record_into`, when present, receives the pre-image of every
/// page a mutating step dirties — the same hook `StorageEngine`'s insert/
/// update/delete methods already expose for a `buffer::RecordingPager`-backed
/// transaction.
pub fn execute(
    steps: &[ExecutionStep],
    storage: &mut StorageEngine,
    params: &[Value],
    mut record_into: Option<&mut hashbrown::HashMap<u32, Vec<u8>>>,
) -> DbResult<ExecResult> {
    let mut result = ExecResult::default();

    for step in steps {
        match step {
            ExecutionStep::TableScan { table } => {
                result.rows = storage
                    .scan_table(table)?
                    .into_iter()
                    .map(|(_, row)| row)
                    .collect();
            }
            ExecutionStep::Filter { condition } => {
                result.rows = filter_rows(result.rows.drain(..), condition, params)?;
            }
            ExecutionStep::Project { columns } => {
                if !matches!(columns.as_slice(), [SelectItem::Wildcard]) {
                    let n = columns.len();
                    result.rows = result.rows.drain(..).map(|row| project_row(&row, n)).collect();
                }
            }
            ExecutionStep::Limit { limit, offset } => {
                result.rows = apply_limit(std::mem::take(&mut result.rows), *limit, *offset);
            }
            ExecutionStep::Insert {
                table,
                columns,
                rows,
            } => {
                result.affected_rows += execute_insert(
                    storage,
                    table,
                    columns.as_deref(),
                    rows,
                    params,
                    record_into.as_deref_mut(),
                )?;
            }
            ExecutionStep::CreateTable {
                name,
                schema,
                if_not_exists,
            } => {
                storage.create_table(name, schema.clone(), *if_not_exists)?;
                result.affected_rows = 1;
            }
            ExecutionStep::Update {
                table,
                assignments,
                selection,
            } => {
                result.affected_rows += execute_update(
                    storage,
                    table,
                    assignments,
                    selection.as_ref(),
                    params,
                    record_into.as_deref_mut(),
                )?;
            }
            ExecutionStep::Delete { table, selection } => {
                result.affected_rows += execute_delete(
                    storage,
                    table,
                    selection.as_ref(),
                    params,
                    record_into.as_deref_mut(),
                )?;
            }
            // Transaction control is intercepted by the `database` crate's
            // `Connection` before a plan reaches this interpreter; seeing
            // one here is a no-op rather than an error, so this crate's own
            // tests can drive a plan without a `Connection` in front of it.
            ExecutionStep::Begin | ExecutionStep::Commit | ExecutionStep::Rollback => {}
        }
    }

    Ok(result)
}

fn filter_rows(
    rows: impl Iterator<Item = Row>,
    condition: &Condition,
    params: &[Value],
) -> DbResult<Vec<Row>> {
    let mut kept = Vec::new();
    for row in rows {
        if evaluate(condition, &row, params)? {
            kept.push(row);
        }
    }
    Ok(kept)
}

/// Positionally clones the first `n` values of `row`, `Null`-padding any
/// column past the row's own length (§4.9 Project).
fn project_row(row: &Row, n: usize) -> Row {
    let mut values = Vec::with_capacity(n);
    for i in 0..n {
        values.push(row.get(i).cloned().unwrap_or(Value::Null));
    }
    Row::new(values)
}

fn apply_limit(rows: Vec<Row>, limit: Option<u64>, offset: Option<u64>) -> Vec<Row> {
    let offset = offset.unwrap_or(0) as usize;
    if offset >= rows.len() {
        return Vec::new();
    }
    let end = match limit {
        Some(n) => offset.saturating_add(n as usize).min(rows.len()),
        None => rows.len(),
    };
    rows[offset..end].to_vec()
}

fn execute_insert(
    storage: &mut StorageEngine,
    table: &str,
    columns: Option<&[String]>,
    rows: &[Vec<Expression>],
    params: &[Value],
    mut record_into: Option<&mut hashbrown::HashMap<u32, Vec<u8>>>,
) -> DbResult<u64> {
    let schema = storage
        .get_table(table)
        .ok_or_else(|| DbError::TableNotFound(table.to_string()))?
        .schema
        .clone();

    let empty = Row::new(Vec::new());
    let mut affected = 0u64;
    for row_exprs in rows {
        let mut values: Vec<Option<Value>> = vec![None; schema.len()];
        match columns {
            // An explicit column list maps each VALUES position to the
            // schema column it names; columns left unnamed fall through to
            // their default below.
            Some(names) => {
                for (expr, name) in row_exprs.iter().zip(names) {
                    if let Some(idx) = schema.column_index(name) {
                        values[idx] = Some(evaluate_expr(expr, &empty, params)?);
                    }
                }
            }
            // No column list: VALUES are positional against the schema in
            // declaration order; a short tuple leaves its trailing columns
            // to their default.
            None => {
                for (i, expr) in row_exprs.iter().enumerate().take(schema.len()) {
                    values[i] = Some(evaluate_expr(expr, &empty, params)?);
                }
            }
        }
        let row = values
            .into_iter()
            .zip(schema.columns.iter())
            .map(|(value, column)| value.unwrap_or_else(|| default_value(&column.default)))
            .collect();
        storage.insert_row(table, Row::new(row), record_into.as_deref_mut())?;
        affected += 1;
    }
    Ok(affected)
}

/// A column's value when an `INSERT` omits it: its `Literal` default if one
/// was declared, `Null` otherwise — `FunctionCall` defaults are preserved
/// verbatim in the schema (§4.8) but not evaluated here, so an omitted
/// column with one also becomes `Null`.
fn default_value(default: &ColumnDefault) -> Value {
    match default {
        ColumnDefault::Literal(value) => value.clone(),
        ColumnDefault::None | ColumnDefault::FunctionCall(..) => Value::Null,
    }
}

fn execute_update(
    storage: &mut StorageEngine,
    table: &str,
    assignments: &[(String, Expression)],
    selection: Option<&Condition>,
    params: &[Value],
    mut record_into: Option<&mut hashbrown::HashMap<u32, Vec<u8>>>,
) -> DbResult<u64> {
    let rows = storage.scan_table(table)?;
    let mut affected = 0u64;
    for (key, mut row) in rows {
        if let Some(cond) = selection {
            if !evaluate(cond, &row, params)? {
                continue;
            }
        }
        // Documented simplification (§4.9/§9): every assignment writes
        // column 0 positionally, regardless of the column name parsed.
        if let Some((_, value_expr)) = assignments.first() {
            let value = evaluate_expr(value_expr, &row, params)?;
            if !row.0.is_empty() {
                row.0[0] = value;
            }
        }
        storage.update_row(table, key, row, record_into.as_deref_mut())?;
        affected += 1;
    }
    Ok(affected)
}

fn execute_delete(
    storage: &mut StorageEngine,
    table: &str,
    selection: Option<&Condition>,
    params: &[Value],
    mut record_into: Option<&mut hashbrown::HashMap<u32, Vec<u8>>>,
) -> DbResult<u64> {
    let rows = storage.scan_table(table)?;
    let mut affected = 0u64;
    for (key, row) in rows {
        let matches = match selection {
            Some(cond) => evaluate(cond, &row, params)?,
            None => true,
        };
        if matches {
            storage.delete_row(table, key, record_into.as_deref_mut())?;
            affected += 1;
        }
    }
    Ok(affected)
}
