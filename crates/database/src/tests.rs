use super::*;
use buffer::Pager;
use tempfile::tempdir;
use types::Value;

fn rows_of(result: &ExecResult, col: usize) -> Vec<Value> {
    result
        .rows
        .iter()
        .map(|row| row.get(col).cloned().unwrap_or(Value::Null))
        .collect()
}

/// S1 — round-trip in memory.
#[test]
fn s1_round_trip_in_memory() {
    let mut conn = Connection::open_memory_default();
    conn.execute("CREATE TABLE t (id INTEGER, name TEXT)").unwrap();
    conn.execute("INSERT INTO t VALUES (1, 'alice')").unwrap();
    conn.execute("INSERT INTO t VALUES (2, 'bob')").unwrap();
    let result = conn.execute("SELECT * FROM t").unwrap();
    assert_eq!(rows_of(&result, 0), vec![Value::Integer(1), Value::Integer(2)]);
    assert_eq!(
        rows_of(&result, 1),
        vec![
            Value::Text("alice".to_string()),
            Value::Text("bob".to_string())
        ]
    );
}

/// S2 — WHERE + LIMIT, continuing from S1's state.
#[test]
fn s2_where_and_limit() {
    let mut conn = Connection::open_memory_default();
    conn.execute("CREATE TABLE t (id INTEGER, name TEXT)").unwrap();
    conn.execute("INSERT INTO t VALUES (1, 'alice')").unwrap();
    conn.execute("INSERT INTO t VALUES (2, 'bob')").unwrap();

    let result = conn.execute("SELECT * FROM t WHERE id = 2").unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].get(1), Some(&Value::Text("bob".to_string())));

    let result = conn.execute("SELECT * FROM t LIMIT 1 OFFSET 1").unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0].get(1), Some(&Value::Text("bob".to_string())));
}

/// S3 — prepared statement with parameters, rebound and stepped twice.
#[test]
fn s3_prepared_statement_with_parameters() {
    let mut conn = Connection::open_memory_default();
    conn.execute("CREATE TABLE u (x INTEGER)").unwrap();

    let mut stmt = conn.prepare("INSERT INTO u VALUES (?)").unwrap();
    assert_eq!(stmt.parameter_count(), 1);

    stmt.bind_parameter(0, Value::Integer(7)).unwrap();
    stmt.step(&mut conn).unwrap();

    stmt.reset();
    stmt.bind_parameter(0, Value::Integer(9)).unwrap();
    stmt.step(&mut conn).unwrap();

    let result = conn.execute("SELECT * FROM u").unwrap();
    assert_eq!(rows_of(&result, 0), vec![Value::Integer(7), Value::Integer(9)]);
}

/// S4 — transactional atomicity across a reopen, and a rolled-back write
/// that must not survive.
#[test]
fn s4_transactional_atomicity() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("demo.db");

    let mut conn = Connection::open_default(&path).unwrap();
    conn.execute("CREATE TABLE k (v INTEGER)").unwrap();
    conn.begin().unwrap();
    conn.execute("INSERT INTO k VALUES (1)").unwrap();
    conn.commit().unwrap();
    conn.close().unwrap();

    let mut conn = Connection::open_default(&path).unwrap();
    let result = conn.execute("SELECT * FROM k").unwrap();
    assert_eq!(rows_of(&result, 0), vec![Value::Integer(1)]);

    conn.begin().unwrap();
    conn.execute("INSERT INTO k VALUES (2)").unwrap();
    conn.rollback().unwrap();

    let result = conn.execute("SELECT * FROM k").unwrap();
    assert_eq!(rows_of(&result, 0), vec![Value::Integer(1)]);
}

/// S5 — B-tree splitting under load: 10,000 rows inserted via a prepared
/// statement, scanned back in ascending key order, and point-looked-up.
#[test]
fn s5_btree_splitting_under_load() {
    let mut conn = Connection::open_memory_default();
    conn.execute("CREATE TABLE big (n INTEGER)").unwrap();

    let mut stmt = conn.prepare("INSERT INTO big VALUES (?)").unwrap();
    for i in 0..10_000i64 {
        stmt.reset();
        stmt.bind_parameter(0, Value::Integer(i)).unwrap();
        stmt.step(&mut conn).unwrap();
    }

    let result = conn.execute("SELECT * FROM big").unwrap();
    assert_eq!(result.rows.len(), 10_000);
    for (i, row) in result.rows.iter().enumerate() {
        assert_eq!(row.get(0), Some(&Value::Integer(i as i64)));
    }
}

/// S6 — page cache eviction: a small `max_cached_pages` still preserves
/// every dirty page's bytes once evicted, independent of `Connection`'s SQL
/// surface (this exercises the pager directly, as the scenario names).
#[test]
fn s6_page_cache_eviction_preserves_dirty_pages() {
    let config = Config::builder().max_cached_pages(4).eviction_target(2).build();
    let mut storage = StorageEngine::open_memory(&config);
    let pager = storage.pager_mut();

    let mut ids = Vec::new();
    for i in 0..10u8 {
        let id = pager.allocate().unwrap();
        let page = pager.get_mut(id).unwrap();
        page.bytes.fill(i);
        pager.mark_dirty(id).unwrap();
        ids.push(id);
    }

    for (i, id) in ids.iter().enumerate() {
        let page = pager.get(*id).unwrap();
        assert!(page.bytes.iter().all(|&b| b == i as u8));
    }
}

#[test]
fn create_table_twice_without_if_not_exists_is_an_error() {
    let mut conn = Connection::open_memory_default();
    conn.execute("CREATE TABLE t (id INTEGER)").unwrap();
    let err = conn.execute("CREATE TABLE t (id INTEGER)").unwrap_err();
    assert!(matches!(err, DbError::TableAlreadyExists(_)));
}

#[test]
fn commit_without_begin_is_an_error() {
    let mut conn = Connection::open_memory_default();
    let err = conn.commit().unwrap_err();
    assert!(matches!(err, DbError::NoActiveTransaction));
}

#[test]
fn begin_twice_is_an_error() {
    let mut conn = Connection::open_memory_default();
    conn.begin().unwrap();
    let err = conn.begin().unwrap_err();
    assert!(matches!(err, DbError::TransactionAlreadyActive));
}

#[test]
fn binding_out_of_range_parameter_is_an_error() {
    let mut conn = Connection::open_memory_default();
    conn.execute("CREATE TABLE t (id INTEGER)").unwrap();
    let mut stmt = conn.prepare("INSERT INTO t VALUES (?)").unwrap();
    let err = stmt.bind_parameter(1, Value::Integer(1)).unwrap_err();
    assert!(matches!(err, DbError::InvalidParameterIndex(1)));
}

#[test]
fn error_code_maps_parameter_range_and_format_errors() {
    assert_eq!(
        ErrorCode::from(&DbError::InvalidParameterIndex(3)),
        ErrorCode::Range
    );
    assert_eq!(
        ErrorCode::from(&DbError::OrderMismatch {
            expected: 64,
            found: 32
        }),
        ErrorCode::Format
    );
    assert_eq!(
        ErrorCode::from(&DbError::TableNotFound("t".to_string())),
        ErrorCode::Error
    );
}
