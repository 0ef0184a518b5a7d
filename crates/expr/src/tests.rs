use crate::*;
use common::Row;
use types::Value;

fn row(values: Vec<Value>) -> Row {
    Row::new(values)
}

#[test]
fn column_resolves_positionally_to_index_zero() {
    let r = row(vec![Value::Integer(7), Value::Text("ignored".into())]);
    let v = evaluate_expr(&Expression::Column("anything".into()), &r, &[]).unwrap();
    assert_eq!(v, Value::Integer(7));
}

#[test]
fn column_on_empty_row_is_null() {
    let r = row(vec![]);
    let v = evaluate_expr(&Expression::Column("x".into()), &r, &[]).unwrap();
    assert_eq!(v, Value::Null);
}

#[test]
fn literal_clones_its_value() {
    let r = row(vec![]);
    let v = evaluate_expr(&Expression::Literal(Value::Text("hi".into())), &r, &[]).unwrap();
    assert_eq!(v, Value::Text("hi".into()));
}

#[test]
fn parameter_substitutes_bound_value() {
    let r = row(vec![]);
    let params = vec![Value::Integer(42)];
    let v = evaluate_expr(&Expression::Parameter(0), &r, &params).unwrap();
    assert_eq!(v, Value::Integer(42));
}

#[test]
fn parameter_out_of_range_is_an_error() {
    let r = row(vec![]);
    let err = evaluate_expr(&Expression::Parameter(3), &r, &[]).unwrap_err();
    assert!(matches!(err, common::DbError::InvalidParameterIndex(3)));
}

#[test]
fn comparison_true_and_false() {
    let r = row(vec![Value::Integer(5)]);
    let cond = Condition::Comparison(
        Expression::Column("id".into()),
        BinaryOp::Eq,
        Expression::Literal(Value::Integer(5)),
    );
    assert!(evaluate(&cond, &r, &[]).unwrap());

    let cond = Condition::Comparison(
        Expression::Column("id".into()),
        BinaryOp::Gt,
        Expression::Literal(Value::Integer(10)),
    );
    assert!(!evaluate(&cond, &r, &[]).unwrap());
}

#[test]
fn logical_and_short_circuits_on_false_left() {
    let r = row(vec![Value::Integer(1)]);
    let always_false = Condition::Comparison(
        Expression::Column("id".into()),
        BinaryOp::Eq,
        Expression::Literal(Value::Integer(999)),
    );
    let parameter_would_error = Condition::Comparison(
        Expression::Parameter(0),
        BinaryOp::Eq,
        Expression::Literal(Value::Integer(1)),
    );
    let cond = Condition::Logical(
        Box::new(always_false),
        LogicalOp::And,
        Box::new(parameter_would_error),
    );
    assert!(!evaluate(&cond, &r, &[]).unwrap());
}

#[test]
fn logical_or_short_circuits_on_true_left() {
    let r = row(vec![Value::Integer(1)]);
    let always_true = Condition::Comparison(
        Expression::Column("id".into()),
        BinaryOp::Eq,
        Expression::Literal(Value::Integer(1)),
    );
    let parameter_would_error = Condition::Comparison(
        Expression::Parameter(0),
        BinaryOp::Eq,
        Expression::Literal(Value::Integer(1)),
    );
    let cond = Condition::Logical(
        Box::new(always_true),
        LogicalOp::Or,
        Box::new(parameter_would_error),
    );
    assert!(evaluate(&cond, &r, &[]).unwrap());
}

#[test]
fn numeric_comparison_promotes_integer_to_real() {
    let r = row(vec![]);
    let cond = Condition::Comparison(
        Expression::Literal(Value::Integer(2)),
        BinaryOp::Lt,
        Expression::Literal(Value::Real(2.5)),
    );
    assert!(evaluate(&cond, &r, &[]).unwrap());
}

#[test]
fn null_orders_below_every_other_tag() {
    let r = row(vec![]);
    let cond = Condition::Comparison(
        Expression::Literal(Value::Null),
        BinaryOp::Lt,
        Expression::Literal(Value::Blob(vec![0])),
    );
    assert!(evaluate(&cond, &r, &[]).unwrap());
}
