//! Hand-rolled byte layout for a [`Node`] materialized into one page.
//!
//! `byte 0: is_leaf`, `bytes 1..5: key_count (u32 LE)`, `bytes 5..9: order
//! (u32 LE)`, then `key_count` `u64` LE keys, then either `key_count` encoded
//! rows (leaf) or `key_count+1` child page ids (internal). The `order` field
//! is checked against the tree's configured order on every decode so that a
//! page written by a tree of a different order is rejected rather than
//! silently misread.

use crate::node::Node;
use common::{DbError, DbResult, Row};
use types::Value;

const IS_LEAF_OFFSET: usize = 0;
const KEY_COUNT_OFFSET: usize = 1;
const ORDER_OFFSET: usize = 5;
const KEYS_OFFSET: usize = 9;

const TAG_NULL: u8 = 0;
const TAG_INTEGER: u8 = 1;
const TAG_REAL: u8 = 2;
const TAG_TEXT: u8 = 3;
const TAG_BLOB: u8 = 4;

pub fn encode_node(node: &Node, order: u32, page_size: usize) -> DbResult<Vec<u8>> {
    let mut buf = vec![0u8; page_size];

    let (is_leaf, key_count, keys) = match node {
        Node::Leaf { keys, .. } => (1u8, keys.len() as u32, keys),
        Node::Internal { keys, .. } => (0u8, keys.len() as u32, keys),
    };

    buf[IS_LEAF_OFFSET] = is_leaf;
    buf[KEY_COUNT_OFFSET..KEY_COUNT_OFFSET + 4].copy_from_slice(&key_count.to_le_bytes());
    buf[ORDER_OFFSET..ORDER_OFFSET + 4].copy_from_slice(&order.to_le_bytes());

    let mut cursor = KEYS_OFFSET;
    for key in keys {
        write_bytes(&mut buf, &mut cursor, &key.to_le_bytes(), page_size)?;
    }

    match node {
        Node::Leaf { rows, .. } => {
            for row in rows {
                encode_row(row, &mut buf, &mut cursor, page_size)?;
            }
        }
        Node::Internal { children, .. } => {
            for child in children {
                write_bytes(&mut buf, &mut cursor, &child.to_le_bytes(), page_size)?;
            }
        }
    }

    Ok(buf)
}

pub fn decode_node(bytes: &[u8], expected_order: u32) -> DbResult<Node> {
    let is_leaf = bytes[IS_LEAF_OFFSET] != 0;
    let key_count =
        u32::from_le_bytes(bytes[KEY_COUNT_OFFSET..KEY_COUNT_OFFSET + 4].try_into().unwrap()) as usize;
    let order = u32::from_le_bytes(bytes[ORDER_OFFSET..ORDER_OFFSET + 4].try_into().unwrap());
    if order != expected_order {
        return Err(DbError::OrderMismatch {
            expected: expected_order,
            found: order,
        });
    }

    let mut cursor = KEYS_OFFSET;
    let mut keys = Vec::with_capacity(key_count);
    for _ in 0..key_count {
        keys.push(u64::from_le_bytes(read_bytes(bytes, &mut cursor, 8).try_into().unwrap()));
    }

    if is_leaf {
        let mut rows = Vec::with_capacity(key_count);
        for _ in 0..key_count {
            rows.push(decode_row(bytes, &mut cursor)?);
        }
        Ok(Node::Leaf { keys, rows })
    } else {
        let mut children = Vec::with_capacity(key_count + 1);
        for _ in 0..key_count + 1 {
            children.push(u32::from_le_bytes(read_bytes(bytes, &mut cursor, 4).try_into().unwrap()));
        }
        Ok(Node::Internal { keys, children })
    }
}

fn write_bytes(buf: &mut [u8], cursor: &mut usize, bytes: &[u8], page_size: usize) -> DbResult<()> {
    if *cursor + bytes.len() > page_size {
        return Err(DbError::PagerIo(format!(
            "b-tree node overflowed page: needed {} bytes at offset {}, page size {}",
            bytes.len(),
            cursor,
            page_size
        )));
    }
    buf[*cursor..*cursor + bytes.len()].copy_from_slice(bytes);
    *cursor += bytes.len();
    Ok(())
}

fn read_bytes<'a>(buf: &'a [u8], cursor: &mut usize, len: usize) -> &'a [u8] {
    let slice = &buf[*cursor..*cursor + len];
    *cursor += len;
    slice
}

fn encode_row(row: &Row, buf: &mut [u8], cursor: &mut usize, page_size: usize) -> DbResult<()> {
    write_bytes(buf, cursor, &(row.0.len() as u32).to_le_bytes(), page_size)?;
    for value in &row.0 {
        match value {
            Value::Null => write_bytes(buf, cursor, &[TAG_NULL], page_size)?,
            Value::Integer(i) => {
                write_bytes(buf, cursor, &[TAG_INTEGER], page_size)?;
                write_bytes(buf, cursor, &i.to_le_bytes(), page_size)?;
            }
            Value::Real(r) => {
                write_bytes(buf, cursor, &[TAG_REAL], page_size)?;
                write_bytes(buf, cursor, &r.to_bits().to_le_bytes(), page_size)?;
            }
            Value::Text(s) => {
                write_bytes(buf, cursor, &[TAG_TEXT], page_size)?;
                write_bytes(buf, cursor, &(s.len() as u32).to_le_bytes(), page_size)?;
                write_bytes(buf, cursor, s.as_bytes(), page_size)?;
            }
            Value::Blob(b) => {
                write_bytes(buf, cursor, &[TAG_BLOB], page_size)?;
                write_bytes(buf, cursor, &(b.len() as u32).to_le_bytes(), page_size)?;
                write_bytes(buf, cursor, b, page_size)?;
            }
            Value::Parameter(_) => {
                return Err(DbError::PagerIo(
                    "cannot persist an unbound parameter value".into(),
                ));
            }
        }
    }
    Ok(())
}

fn decode_row(buf: &[u8], cursor: &mut usize) -> DbResult<Row> {
    let value_count = u32::from_le_bytes(read_bytes(buf, cursor, 4).try_into().unwrap());
    let mut values = Vec::with_capacity(value_count as usize);
    for _ in 0..value_count {
        let tag = read_bytes(buf, cursor, 1)[0];
        let value = match tag {
            TAG_NULL => Value::Null,
            TAG_INTEGER => Value::Integer(i64::from_le_bytes(read_bytes(buf, cursor, 8).try_into().unwrap())),
            TAG_REAL => {
                let bits = u64::from_le_bytes(read_bytes(buf, cursor, 8).try_into().unwrap());
                Value::Real(f64::from_bits(bits))
            }
            TAG_TEXT => {
                let len = u32::from_le_bytes(read_bytes(buf, cursor, 4).try_into().unwrap()) as usize;
                let bytes = read_bytes(buf, cursor, len);
                Value::Text(
                    String::from_utf8(bytes.to_vec())
                        .map_err(|_| DbError::InvalidValueType(TAG_TEXT))?,
                )
            }
            TAG_BLOB => {
                let len = u32::from_le_bytes(read_bytes(buf, cursor, 4).try_into().unwrap()) as usize;
                Value::Blob(read_bytes(buf, cursor, len).to_vec())
            }
            other => return Err(DbError::InvalidValueType(other)),
        };
        values.push(value);
    }
    Ok(Row(values))
}
