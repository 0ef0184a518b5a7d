//! Durable table directory, materialized into the single reserved page
//! [`CATALOG_PAGE_ID`] of every database file.
//!
//! §4.4 ties a `Table`'s identity to its name and B-tree root page; without
//! somewhere durable to remember that mapping, a reopened connection would
//! have a populated pager but no way to find its tables again. This page is
//! rewritten in full on every `create_table`/`drop_table` and read back once,
//! on `StorageEngine::open`.

use buffer::Pager;
use catalog::{Column, ColumnDefault, TableSchema};
use common::{DbError, DbResult};
use std::collections::HashMap;
use types::{ColumnType, Value};

use crate::Table;

pub const CATALOG_PAGE_ID: u32 = 1;

const MAGIC: [u8; 4] = *b"SQLC";

const TYPE_INTEGER: u8 = 0;
const TYPE_TEXT: u8 = 1;
const TYPE_REAL: u8 = 2;
const TYPE_BLOB: u8 = 3;

const DEFAULT_NONE: u8 = 0;
const DEFAULT_LITERAL: u8 = 1;
const DEFAULT_FUNCTION_CALL: u8 = 2;

const VALUE_NULL: u8 = 0;
const VALUE_INTEGER: u8 = 1;
const VALUE_REAL: u8 = 2;
const VALUE_TEXT: u8 = 3;
const VALUE_BLOB: u8 = 4;

/// A catalog entry read back from disk: everything needed to rebuild a
/// `storage::Table` except its row count, which is recomputed from the tree.
pub struct CatalogEntry {
    pub name: String,
    pub root_page_id: u32,
    pub schema: TableSchema,
}

/// Reads and decodes the catalog page. Returns `None` if the page has never
/// been written at all (a zero-filled page, indistinguishable from a
/// brand-new database file with nothing bootstrapped yet) — distinct from
/// `Some(vec![])`, an already-bootstrapped catalog that just has zero tables.
pub fn load(pager: &mut dyn Pager) -> DbResult<Option<Vec<CatalogEntry>>> {
    let page = pager.get(CATALOG_PAGE_ID)?;
    if page.bytes.len() < MAGIC.len() || page.bytes[..MAGIC.len()] != MAGIC {
        return Ok(None);
    }
    let bytes = page.bytes.clone();
    let mut cursor = MAGIC.len();
    let table_count = read_u32(&bytes, &mut cursor);
    let mut entries = Vec::with_capacity(table_count as usize);
    for _ in 0..table_count {
        let name = read_string(&bytes, &mut cursor);
        let root_page_id = read_u32(&bytes, &mut cursor);
        let column_count = read_u32(&bytes, &mut cursor);
        let mut columns = Vec::with_capacity(column_count as usize);
        for _ in 0..column_count {
            columns.push(read_column(&bytes, &mut cursor)?);
        }
        entries.push(CatalogEntry {
            name,
            root_page_id,
            schema: TableSchema::new(columns),
        });
    }
    Ok(Some(entries))
}

/// Re-encodes every table's name, root page, and schema and writes it back
/// over the reserved page, marking it dirty for the next flush (or the
/// caller's own transaction recording, if one is active).
pub fn store(pager: &mut dyn Pager, tables: &HashMap<String, Table>) -> DbResult<()> {
    let page_size = pager.page_size();
    let mut buf = Vec::with_capacity(page_size);
    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&(tables.len() as u32).to_le_bytes());
    for (name, table) in tables {
        write_string(&mut buf, name);
        buf.extend_from_slice(&table.btree.root_page_id().to_le_bytes());
        buf.extend_from_slice(&(table.schema.columns.len() as u32).to_le_bytes());
        for column in &table.schema.columns {
            write_column(&mut buf, column);
        }
    }
    if buf.len() > page_size {
        return Err(DbError::ShortWrite(CATALOG_PAGE_ID, page_size, buf.len()));
    }
    buf.resize(page_size, 0);
    let page = pager.get_mut(CATALOG_PAGE_ID)?;
    page.bytes.copy_from_slice(&buf);
    pager.mark_dirty(CATALOG_PAGE_ID)
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn read_string(buf: &[u8], cursor: &mut usize) -> String {
    let len = read_u32(buf, cursor) as usize;
    let s = String::from_utf8_lossy(&buf[*cursor..*cursor + len]).into_owned();
    *cursor += len;
    s
}

fn read_u32(buf: &[u8], cursor: &mut usize) -> u32 {
    let value = u32::from_le_bytes(buf[*cursor..*cursor + 4].try_into().unwrap());
    *cursor += 4;
    value
}

fn write_column(buf: &mut Vec<u8>, column: &Column) {
    write_string(buf, &column.name);
    let ty = match column.ty {
        ColumnType::Integer => TYPE_INTEGER,
        ColumnType::Text => TYPE_TEXT,
        ColumnType::Real => TYPE_REAL,
        ColumnType::Blob => TYPE_BLOB,
    };
    buf.push(ty);
    buf.push(column.is_primary_key as u8);
    buf.push(column.is_nullable as u8);
    match &column.default {
        ColumnDefault::None => buf.push(DEFAULT_NONE),
        ColumnDefault::Literal(value) => {
            buf.push(DEFAULT_LITERAL);
            write_value(buf, value);
        }
        ColumnDefault::FunctionCall(name, args) => {
            buf.push(DEFAULT_FUNCTION_CALL);
            write_string(buf, name);
            buf.extend_from_slice(&(args.len() as u32).to_le_bytes());
            for arg in args {
                write_value(buf, arg);
            }
        }
    }
}

fn read_column(buf: &[u8], cursor: &mut usize) -> DbResult<Column> {
    let name = read_string(buf, cursor);
    let ty = match buf[*cursor] {
        TYPE_INTEGER => ColumnType::Integer,
        TYPE_TEXT => ColumnType::Text,
        TYPE_REAL => ColumnType::Real,
        TYPE_BLOB => ColumnType::Blob,
        tag => return Err(DbError::InvalidValueType(tag)),
    };
    *cursor += 1;
    let is_primary_key = buf[*cursor] != 0;
    *cursor += 1;
    let is_nullable = buf[*cursor] != 0;
    *cursor += 1;
    let default = match buf[*cursor] {
        DEFAULT_NONE => {
            *cursor += 1;
            ColumnDefault::None
        }
        DEFAULT_LITERAL => {
            *cursor += 1;
            ColumnDefault::Literal(read_value(buf, cursor)?)
        }
        DEFAULT_FUNCTION_CALL => {
            *cursor += 1;
            let name = read_string(buf, cursor);
            let arg_count = read_u32(buf, cursor);
            let mut args = Vec::with_capacity(arg_count as usize);
            for _ in 0..arg_count {
                args.push(read_value(buf, cursor)?);
            }
            ColumnDefault::FunctionCall(name, args)
        }
        tag => return Err(DbError::InvalidValueType(tag)),
    };
    Ok(Column {
        name,
        ty,
        is_primary_key,
        is_nullable,
        default,
    })
}

fn write_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.push(VALUE_NULL),
        Value::Integer(i) => {
            buf.push(VALUE_INTEGER);
            buf.extend_from_slice(&i.to_le_bytes());
        }
        Value::Real(r) => {
            buf.push(VALUE_REAL);
            buf.extend_from_slice(&r.to_bits().to_le_bytes());
        }
        Value::Text(s) => {
            buf.push(VALUE_TEXT);
            write_string(buf, s);
        }
        Value::Blob(b) => {
            buf.push(VALUE_BLOB);
            buf.extend_from_slice(&(b.len() as u32).to_le_bytes());
            buf.extend_from_slice(b);
        }
        Value::Parameter(_) => unreachable!("a column default is never an unbound parameter"),
    }
}

fn read_value(buf: &[u8], cursor: &mut usize) -> DbResult<Value> {
    let tag = buf[*cursor];
    *cursor += 1;
    let value = match tag {
        VALUE_NULL => Value::Null,
        VALUE_INTEGER => {
            let v = i64::from_le_bytes(buf[*cursor..*cursor + 8].try_into().unwrap());
            *cursor += 8;
            Value::Integer(v)
        }
        VALUE_REAL => {
            let bits = u64::from_le_bytes(buf[*cursor..*cursor + 8].try_into().unwrap());
            *cursor += 8;
            Value::Real(f64::from_bits(bits))
        }
        VALUE_TEXT => Value::Text(read_string(buf, cursor)),
        VALUE_BLOB => {
            let len = read_u32(buf, cursor) as usize;
            let bytes = buf[*cursor..*cursor + len].to_vec();
            *cursor += len;
            Value::Blob(bytes)
        }
        other => return Err(DbError::InvalidValueType(other)),
    };
    Ok(value)
}
