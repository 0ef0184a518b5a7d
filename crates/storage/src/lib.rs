//! Storage engine: a name-keyed map of [`Table`]s sharing one [`Pager`].
//!
//! A `Table` owns its schema, its clustered [`btree::BTree`], and the next
//! row id it will hand out on insert. Mutating methods optionally thread a
//! page pre-image map through to a [`buffer::RecordingPager`], so a caller
//! driving a write-ahead-logged transaction can capture what changed without
//! this crate knowing anything about the WAL.

mod catalog_page;


use btree::BTree;
use buffer::{FilePager, MemPager, Pager, RecordingPager};
use catalog::TableSchema;
use common::{Config, DbError, DbResult, Row};
use std::collections::HashMap;
use std::path::Path;

/// A single table: its column shape, its clustered tree, and the row id
/// counter used to assign new rows their key.
pub struct Table {
    pub schema: TableSchema,
    pub btree: BTree,
    pub next_row_id: u64,
}

/// Owns the single [`Pager`] shared by every table's tree and the name→table
/// mapping describing what tables currently exist.
pub struct StorageEngine {
    pager: Box<dyn Pager>,
    tables: HashMap<String, Table>,
}

impl StorageEngine {
    /// Opens (creating if necessary) a file-backed storage engine, rebuilding
    /// its table directory from the reserved catalog page (§4.4) so a
    /// reopened connection sees every table a prior session committed.
    pub fn open(path: impl AsRef<Path>, config: &Config) -> DbResult<Self> {
        let mut pager: Box<dyn Pager> = Box::new(FilePager::open(path, config)?);
        let tables = bootstrap_catalog(pager.as_mut())?;
        Ok(Self { pager, tables })
    }

    /// Creates a storage engine with no backing file at all.
    pub fn open_memory(config: &Config) -> Self {
        let mut pager: Box<dyn Pager> = Box::new(MemPager::new(config));
        let tables = bootstrap_catalog(pager.as_mut()).expect("a fresh in-memory pager never fails to bootstrap");
        Self { pager, tables }
    }

    pub fn pager_mut(&mut self) -> &mut dyn Pager {
        self.pager.as_mut()
    }

    /// Registers a new table with a fresh, empty tree. Duplicate names are
    /// silently accepted when `if_not_exists` is set, otherwise rejected.
    pub fn create_table(&mut self, name: &str, schema: TableSchema, if_not_exists: bool) -> DbResult<()> {
        if self.tables.contains_key(name) {
            return if if_not_exists {
                Ok(())
            } else {
                Err(DbError::TableAlreadyExists(name.to_string()))
            };
        }
        let btree = BTree::create(self.pager.as_mut(), btree::DEFAULT_ORDER)?;
        self.tables.insert(
            name.to_string(),
            Table {
                schema,
                btree,
                next_row_id: 0,
            },
        );
        catalog_page::store(self.pager.as_mut(), &self.tables)
    }

    /// Removes a table's schema and tree handle. The pages the tree occupied
    /// are not reclaimed into any freelist.
    pub fn drop_table(&mut self, name: &str) -> DbResult<()> {
        self.tables
            .remove(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))?;
        catalog_page::store(self.pager.as_mut(), &self.tables)
    }

    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Inserts `row`, assigning it the table's next row id. Returns the
    /// assigned id.
    pub fn insert_row(
        &mut self,
        table_name: &str,
        row: Row,
        record_into: Option<&mut hashbrown::HashMap<u32, Vec<u8>>>,
    ) -> DbResult<u64> {
        let table = self
            .tables
            .get_mut(table_name)
            .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))?;
        let row_id = table.next_row_id;
        table.next_row_id += 1;
        match record_into {
            Some(snapshots) => {
                let mut recording = RecordingPager::new(self.pager.as_mut(), snapshots);
                table.btree.insert(&mut recording, row_id, row)?;
            }
            None => table.btree.insert(self.pager.as_mut(), row_id, row)?,
        }
        Ok(row_id)
    }

    pub fn scan_table(&mut self, table_name: &str) -> DbResult<Vec<(u64, Row)>> {
        let table = self
            .tables
            .get(table_name)
            .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))?;
        table.btree.scan_all(self.pager.as_mut())
    }

    pub fn update_row(
        &mut self,
        table_name: &str,
        row_id: u64,
        new_row: Row,
        record_into: Option<&mut hashbrown::HashMap<u32, Vec<u8>>>,
    ) -> DbResult<bool> {
        let table = self
            .tables
            .get_mut(table_name)
            .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))?;
        match record_into {
            Some(snapshots) => {
                let mut recording = RecordingPager::new(self.pager.as_mut(), snapshots);
                table.btree.update(&mut recording, row_id, new_row)
            }
            None => table.btree.update(self.pager.as_mut(), row_id, new_row),
        }
    }

    pub fn delete_row(
        &mut self,
        table_name: &str,
        row_id: u64,
        record_into: Option<&mut hashbrown::HashMap<u32, Vec<u8>>>,
    ) -> DbResult<bool> {
        let table = self
            .tables
            .get_mut(table_name)
            .ok_or_else(|| DbError::TableNotFound(table_name.to_string()))?;
        match record_into {
            Some(snapshots) => {
                let mut recording = RecordingPager::new(self.pager.as_mut(), snapshots);
                table.btree.delete(&mut recording, row_id)
            }
            None => table.btree.delete(self.pager.as_mut(), row_id),
        }
    }

    pub fn flush(&mut self) -> DbResult<()> {
        self.pager.flush()
    }
}

/// Rebuilds the `name -> Table` map from the catalog page, or — for a
/// brand-new pager with nothing written yet — claims page 1 for the catalog
/// (so no table's B-tree root ever collides with it) and persists an empty
/// one.
///
/// A table's `next_row_id` isn't itself persisted; it's cheaper and simpler
/// to recompute it from the tree's own keys on open than to keep a second
/// durable counter in sync with every insert.
fn bootstrap_catalog(pager: &mut dyn Pager) -> DbResult<HashMap<String, Table>> {
    let mut tables = HashMap::new();
    match catalog_page::load(pager)? {
        Some(entries) => {
            for entry in entries {
                let btree = BTree::open(entry.root_page_id, btree::DEFAULT_ORDER);
                let next_row_id = btree
                    .scan_all(pager)?
                    .iter()
                    .map(|(key, _)| *key)
                    .max()
                    .map(|max_key| max_key + 1)
                    .unwrap_or(0);
                tables.insert(
                    entry.name,
                    Table {
                        schema: entry.schema,
                        btree,
                        next_row_id,
                    },
                );
            }
        }
        None => {
            let claimed = pager.allocate()?;
            debug_assert_eq!(claimed, catalog_page::CATALOG_PAGE_ID);
            catalog_page::store(pager, &tables)?;
        }
    }
    Ok(tables)
}
