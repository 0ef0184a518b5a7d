//! Expression and condition trees shared by the planner and the executor.
//!
//! A [`Condition`] is the left-leaning boolean tree a `WHERE` clause parses
//! into; an [`Expression`] is the scalar sub-language it and `SET`/`VALUES`
//! lists are built from. Both are evaluated against a single [`Row`] plus the
//! parameter list bound to the statement driving execution — there is no
//! notion of joining against more than one row here.

#[cfg(test)]
mod tests;

use common::{DbError, DbResult, Row};
use std::cmp::Ordering;
use types::Value;

/// Binary comparison operator. `And`/`Or` live on [`Condition::Logical`]
/// instead, since they combine conditions rather than values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Logical operator joining two [`Condition`]s.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// A scalar expression: a column reference, a literal constant, or an
/// unbound `?` placeholder.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    /// A column reference. Resolution is positional (§4.9/§9): every
    /// `Column` currently reads row index 0 regardless of the name carried
    /// here. The name is retained so a future column-index map can replace
    /// this without changing the AST/plan shape.
    Column(String),
    Literal(Value),
    /// `?` in source text, auto-numbered left-to-right starting at 0.
    Parameter(u32),
}

/// A `WHERE`-clause predicate: a left-leaning tree of comparisons joined by
/// `AND`/`OR`, represented with explicit `Box` indirection since Rust has no
/// self-referential borrows for the recursive shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Comparison(Expression, BinaryOp, Expression),
    Logical(Box<Condition>, LogicalOp, Box<Condition>),
}

/// Evaluates `expr` against `row`, substituting `Parameter(i)` with
/// `params[i]`.
///
/// `Column` is resolved positionally: it always yields `row`'s value at
/// index 0 (or `Null` if the row is empty), per the documented simplification
/// in §4.9/§9 — full name-to-ordinal resolution is future work.
pub fn evaluate_expr(expr: &Expression, row: &Row, params: &[Value]) -> DbResult<Value> {
    match expr {
        Expression::Literal(v) => Ok(v.clone()),
        Expression::Column(_) => Ok(row.get(0).cloned().unwrap_or(Value::Null)),
        Expression::Parameter(i) => params
            .get(*i as usize)
            .cloned()
            .ok_or(DbError::InvalidParameterIndex(*i)),
    }
}

/// Evaluates `cond` against `row`, short-circuiting `AND`/`OR`.
pub fn evaluate(cond: &Condition, row: &Row, params: &[Value]) -> DbResult<bool> {
    match cond {
        Condition::Comparison(left, op, right) => {
            let lv = evaluate_expr(left, row, params)?;
            let rv = evaluate_expr(right, row, params)?;
            compare(&lv, *op, &rv)
        }
        Condition::Logical(left, LogicalOp::And, right) => {
            Ok(evaluate(left, row, params)? && evaluate(right, row, params)?)
        }
        Condition::Logical(left, LogicalOp::Or, right) => {
            Ok(evaluate(left, row, params)? || evaluate(right, row, params)?)
        }
    }
}

/// Compares `l op r` using the §3 ordering rules (`Null < {Integer, Real} <
/// Text < Blob`, `Integer` promoted to `Real` for numeric comparisons).
fn compare(l: &Value, op: BinaryOp, r: &Value) -> DbResult<bool> {
    let ord = l.cmp_value(r).ok_or_else(|| {
        DbError::UnsupportedFeature(format!(
            "cannot compare unbound parameter values: {l:?} vs {r:?}"
        ))
    })?;
    Ok(match op {
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::Ne => ord != Ordering::Equal,
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::Ge => ord != Ordering::Less,
    })
}
