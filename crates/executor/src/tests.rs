use super::*;
use catalog::{Column, ColumnDefault, TableSchema};
use common::Config;
use expr::BinaryOp;
use parser::SelectItem;
use types::ColumnType;

fn users_schema() -> TableSchema {
    TableSchema::new(vec![
        Column::new("id", ColumnType::Integer),
        Column::new("name", ColumnType::Text),
    ])
}

fn memory_storage_with_users() -> StorageEngine {
    let mut storage = StorageEngine::open_memory(&Config::default());
    storage
        .create_table("users", users_schema(), false)
        .unwrap();
    storage
}

fn insert(storage: &mut StorageEngine, id: i64, name: &str) {
    storage
        .insert_row(
            "users",
            Row::new(vec![Value::Integer(id), Value::Text(name.to_string())]),
            None,
        )
        .unwrap();
}

#[test]
fn table_scan_returns_every_row_in_key_order() {
    let mut storage = memory_storage_with_users();
    insert(&mut storage, 1, "ada");
    insert(&mut storage, 2, "will");

    let steps = vec![ExecutionStep::TableScan {
        table: "users".to_string(),
    }];
    let result = execute(&steps, &mut storage, &[], None).unwrap();
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0].get(0), Some(&Value::Integer(1)));
    assert_eq!(result.rows[1].get(0), Some(&Value::Integer(2)));
}

#[test]
fn filter_drops_rows_that_do_not_match() {
    let mut storage = memory_storage_with_users();
    insert(&mut storage, 1, "ada");
    insert(&mut storage, 2, "will");

    let steps = vec![
        ExecutionStep::TableScan {
            table: "users".to_string(),
        },
        ExecutionStep::Filter {
            condition: Condition::Comparison(
                Expression::Column("id".to_string()),
                BinaryOp::Eq,
                Expression::Literal(Value::Integer(2)),
            ),
        },
    ];
    let result = execute(&steps, &mut storage, &[], None).unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].get(0), Some(&Value::Integer(2)));
}

#[test]
fn project_wildcard_is_a_no_op() {
    let mut storage = memory_storage_with_users();
    insert(&mut storage, 1, "ada");

    let steps = vec![
        ExecutionStep::TableScan {
            table: "users".to_string(),
        },
        ExecutionStep::Project {
            columns: vec![SelectItem::Wildcard],
        },
    ];
    let result = execute(&steps, &mut storage, &[], None).unwrap();
    assert_eq!(result.rows[0].len(), 2);
}

#[test]
fn project_pads_missing_columns_with_null() {
    let mut storage = memory_storage_with_users();
    insert(&mut storage, 1, "ada");

    let steps = vec![
        ExecutionStep::TableScan {
            table: "users".to_string(),
        },
        ExecutionStep::Project {
            columns: vec![
                SelectItem::Column {
                    name: "id".to_string(),
                    alias: None,
                },
                SelectItem::Column {
                    name: "name".to_string(),
                    alias: None,
                },
                SelectItem::Column {
                    name: "extra".to_string(),
                    alias: None,
                },
            ],
        },
    ];
    let result = execute(&steps, &mut storage, &[], None).unwrap();
    assert_eq!(result.rows[0].len(), 3);
    assert_eq!(result.rows[0].get(2), Some(&Value::Null));
}

#[test]
fn limit_and_offset_slice_the_result() {
    let mut storage = memory_storage_with_users();
    for i in 1..=5 {
        insert(&mut storage, i, "x");
    }

    let steps = vec![
        ExecutionStep::TableScan {
            table: "users".to_string(),
        },
        ExecutionStep::Limit {
            limit: Some(2),
            offset: Some(1),
        },
    ];
    let result = execute(&steps, &mut storage, &[], None).unwrap();
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.rows[0].get(0), Some(&Value::Integer(2)));
    assert_eq!(result.rows[1].get(0), Some(&Value::Integer(3)));
}

#[test]
fn offset_past_the_end_yields_no_rows() {
    let mut storage = memory_storage_with_users();
    insert(&mut storage, 1, "ada");

    let steps = vec![
        ExecutionStep::TableScan {
            table: "users".to_string(),
        },
        ExecutionStep::Limit {
            limit: None,
            offset: Some(10),
        },
    ];
    let result = execute(&steps, &mut storage, &[], None).unwrap();
    assert!(result.rows.is_empty());
}

#[test]
fn insert_step_substitutes_bound_parameters() {
    let mut storage = memory_storage_with_users();
    let steps = vec![ExecutionStep::Insert {
        table: "users".to_string(),
        columns: None,
        rows: vec![vec![Expression::Parameter(0), Expression::Parameter(1)]],
    }];
    let params = vec![Value::Integer(7), Value::Text("ada".to_string())];
    let result = execute(&steps, &mut storage, &params, None).unwrap();
    assert_eq!(result.affected_rows, 1);

    let rows = storage.scan_table("users").unwrap();
    assert_eq!(rows[0].1.get(0), Some(&Value::Integer(7)));
    assert_eq!(rows[0].1.get(1), Some(&Value::Text("ada".to_string())));
}

#[test]
fn insert_applies_literal_default_for_a_column_omitted_by_name() {
    let mut schema = users_schema();
    schema.columns[1].default = ColumnDefault::Literal(Value::Text("anonymous".to_string()));
    let mut storage = StorageEngine::open_memory(&Config::default());
    storage.create_table("users", schema, false).unwrap();

    let steps = vec![ExecutionStep::Insert {
        table: "users".to_string(),
        columns: Some(vec!["id".to_string()]),
        rows: vec![vec![Expression::Literal(Value::Integer(1))]],
    }];
    let result = execute(&steps, &mut storage, &[], None).unwrap();
    assert_eq!(result.affected_rows, 1);

    let rows = storage.scan_table("users").unwrap();
    assert_eq!(rows[0].1.get(0), Some(&Value::Integer(1)));
    assert_eq!(rows[0].1.get(1), Some(&Value::Text("anonymous".to_string())));
}

#[test]
fn insert_without_a_default_fills_an_omitted_column_with_null() {
    let mut storage = memory_storage_with_users();

    let steps = vec![ExecutionStep::Insert {
        table: "users".to_string(),
        columns: Some(vec!["id".to_string()]),
        rows: vec![vec![Expression::Literal(Value::Integer(1))]],
    }];
    execute(&steps, &mut storage, &[], None).unwrap();

    let rows = storage.scan_table("users").unwrap();
    assert_eq!(rows[0].1.get(1), Some(&Value::Null));
}

#[test]
fn create_table_step_registers_the_schema() {
    let mut storage = StorageEngine::open_memory(&Config::default());
    let steps = vec![ExecutionStep::CreateTable {
        name: "t".to_string(),
        schema: users_schema(),
        if_not_exists: false,
    }];
    let result = execute(&steps, &mut storage, &[], None).unwrap();
    assert_eq!(result.affected_rows, 1);
    assert!(storage.get_table("t").is_some());
}

#[test]
fn update_step_writes_column_zero_for_matching_rows() {
    let mut storage = memory_storage_with_users();
    insert(&mut storage, 1, "ada");
    insert(&mut storage, 2, "will");

    let steps = vec![ExecutionStep::Update {
        table: "users".to_string(),
        assignments: vec![("id".to_string(), Expression::Literal(Value::Integer(99)))],
        selection: Some(Condition::Comparison(
            Expression::Column("id".to_string()),
            BinaryOp::Eq,
            Expression::Literal(Value::Integer(2)),
        )),
    }];
    let result = execute(&steps, &mut storage, &[], None).unwrap();
    assert_eq!(result.affected_rows, 1);

    let rows = storage.scan_table("users").unwrap();
    assert!(rows.iter().any(|(_, r)| r.get(0) == Some(&Value::Integer(99))));
    assert!(rows.iter().any(|(_, r)| r.get(0) == Some(&Value::Integer(1))));
}

#[test]
fn delete_step_removes_matching_rows_only() {
    let mut storage = memory_storage_with_users();
    insert(&mut storage, 1, "ada");
    insert(&mut storage, 2, "will");

    let steps = vec![ExecutionStep::Delete {
        table: "users".to_string(),
        selection: Some(Condition::Comparison(
            Expression::Column("id".to_string()),
            BinaryOp::Eq,
            Expression::Literal(Value::Integer(1)),
        )),
    }];
    let result = execute(&steps, &mut storage, &[], None).unwrap();
    assert_eq!(result.affected_rows, 1);

    let rows = storage.scan_table("users").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1.get(0), Some(&Value::Integer(2)));
}

#[test]
fn delete_without_selection_removes_every_row() {
    let mut storage = memory_storage_with_users();
    insert(&mut storage, 1, "ada");
    insert(&mut storage, 2, "will");

    let steps = vec![ExecutionStep::Delete {
        table: "users".to_string(),
        selection: None,
    }];
    execute(&steps, &mut storage, &[], None).unwrap();
    assert!(storage.scan_table("users").unwrap().is_empty());
}

#[test]
fn scanning_a_missing_table_is_an_error() {
    let mut storage = StorageEngine::open_memory(&Config::default());
    let steps = vec![ExecutionStep::TableScan {
        table: "missing".to_string(),
    }];
    let err = execute(&steps, &mut storage, &[], None).unwrap_err();
    assert!(matches!(err, DbError::TableNotFound(_)));
}
