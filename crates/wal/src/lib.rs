//! Physical, transactional write-ahead log.
//!
//! Unlike a logical redo log that replays high-level operations, this WAL
//! records raw page byte ranges: `Begin` opens a transaction, `PageWrite`
//! captures a page's pre- and post-image, `Commit`/`Rollback` close it.
//! Recovery on [`Wal::open`] replays only transactions that reached a
//! `Commit` record; an incomplete tail (no terminator, or a `Rollback`) is
//! discarded.
//!
//! # Example
//!
//! ```no_run
//! use wal::Wal;
//!
//! let mut wal = Wal::open("demo.db.wal", "demo.db").unwrap();
//! let txn_id = wal.begin().unwrap();
//! wal.record_page_write(txn_id, 1, 0, &[0u8; 4096], &[1u8; 4096]).unwrap();
//! wal.commit(txn_id).unwrap();
//! ```


use common::{DbError, DbResult};
use log::{debug, trace, warn};
use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

/// The four record kinds in §4.2's physical WAL format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryKind {
    Begin = 0,
    PageWrite = 1,
    Commit = 2,
    Rollback = 3,
}

impl EntryKind {
    fn from_tag(tag: u8) -> DbResult<Self> {
        match tag {
            0 => Ok(Self::Begin),
            1 => Ok(Self::PageWrite),
            2 => Ok(Self::Commit),
            3 => Ok(Self::Rollback),
            other => Err(DbError::WalIo(format!("unknown WAL entry kind tag {other}"))),
        }
    }
}

/// One WAL record as laid out on disk: `kind:u8, txn_id:u64, page_id:u32,
/// offset:u32, old_len:u32, new_len:u32, old_bytes, new_bytes` (all integers
/// little-endian). `page_id`/`offset`/`old_bytes`/`new_bytes` are only
/// meaningful for [`EntryKind::PageWrite`]; other kinds leave them empty/zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub kind: EntryKind,
    pub txn_id: u64,
    pub page_id: u32,
    pub offset: u32,
    pub old_bytes: Vec<u8>,
    pub new_bytes: Vec<u8>,
}

impl Entry {
    fn begin(txn_id: u64) -> Self {
        Self {
            kind: EntryKind::Begin,
            txn_id,
            page_id: 0,
            offset: 0,
            old_bytes: Vec::new(),
            new_bytes: Vec::new(),
        }
    }

    fn commit(txn_id: u64) -> Self {
        Self {
            kind: EntryKind::Commit,
            txn_id,
            page_id: 0,
            offset: 0,
            old_bytes: Vec::new(),
            new_bytes: Vec::new(),
        }
    }

    fn rollback(txn_id: u64) -> Self {
        Self {
            kind: EntryKind::Rollback,
            txn_id,
            page_id: 0,
            offset: 0,
            old_bytes: Vec::new(),
            new_bytes: Vec::new(),
        }
    }

    fn page_write(txn_id: u64, page_id: u32, offset: u32, old_bytes: &[u8], new_bytes: &[u8]) -> Self {
        Self {
            kind: EntryKind::PageWrite,
            txn_id,
            page_id,
            offset,
            old_bytes: old_bytes.to_vec(),
            new_bytes: new_bytes.to_vec(),
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.kind as u8);
        out.extend_from_slice(&self.txn_id.to_le_bytes());
        out.extend_from_slice(&self.page_id.to_le_bytes());
        out.extend_from_slice(&self.offset.to_le_bytes());
        out.extend_from_slice(&(self.old_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.new_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.old_bytes);
        out.extend_from_slice(&self.new_bytes);
    }

    /// Reads one entry starting at the file's current position. Returns
    /// `Ok(None)` on a clean EOF (no bytes at all read); any other failure to
    /// read a complete record (a torn write from a crash mid-append) is
    /// treated the same way by the caller: the tail is discarded.
    fn decode(file: &mut File) -> DbResult<Option<Self>> {
        let mut header = [0u8; 1 + 8 + 4 + 4 + 4 + 4];
        match read_exact_or_eof(file, &mut header)? {
            false => return Ok(None),
            true => {}
        }
        let kind = EntryKind::from_tag(header[0])?;
        let txn_id = u64::from_le_bytes(header[1..9].try_into().unwrap());
        let page_id = u32::from_le_bytes(header[9..13].try_into().unwrap());
        let offset = u32::from_le_bytes(header[13..17].try_into().unwrap());
        let old_len = u32::from_le_bytes(header[17..21].try_into().unwrap()) as usize;
        let new_len = u32::from_le_bytes(header[21..25].try_into().unwrap()) as usize;

        let mut old_bytes = vec![0u8; old_len];
        let mut new_bytes = vec![0u8; new_len];
        if !read_exact_or_eof(file, &mut old_bytes)? || !read_exact_or_eof(file, &mut new_bytes)? {
            return Ok(None);
        }

        Ok(Some(Self {
            kind,
            txn_id,
            page_id,
            offset,
            old_bytes,
            new_bytes,
        }))
    }
}

/// Like `read_exact`, but a zero-byte read at the very start is reported as
/// `Ok(false)` (clean EOF) instead of an error, and a short read partway
/// through is also reported as `Ok(false)` (a torn trailing record).
fn read_exact_or_eof(file: &mut File, buf: &mut [u8]) -> DbResult<bool> {
    if buf.is_empty() {
        return Ok(true);
    }
    let mut read = 0;
    while read < buf.len() {
        let n = file
            .read(&mut buf[read..])
            .map_err(|e| DbError::WalIo(e.to_string()))?;
        if n == 0 {
            // EOF, whether clean (read == 0) or torn (0 < read < buf.len()).
            return Ok(false);
        }
        read += n;
    }
    Ok(true)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Active(u64),
}

/// Manages a single append-only WAL file paired with a main database file.
pub struct Wal {
    wal_path: PathBuf,
    db_path: PathBuf,
    file: File,
    state: State,
    next_txn_id: u64,
}

impl Wal {
    /// Opens (creating if necessary) the WAL at `wal_path`, replays any
    /// fully-committed transactions into `db_path`, then truncates the WAL
    /// (checkpoint-on-open).
    pub fn open(wal_path: impl AsRef<Path>, db_path: impl AsRef<Path>) -> DbResult<Self> {
        let wal_path = wal_path.as_ref().to_path_buf();
        let db_path = db_path.as_ref().to_path_buf();

        Self::checkpoint_file(&wal_path, &db_path)?;

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&wal_path)
            .map_err(|e| DbError::WalIo(format!("open {}: {e}", wal_path.display())))?;

        Ok(Self {
            wal_path,
            db_path,
            file,
            state: State::Idle,
            next_txn_id: 1,
        })
    }

    /// Replays committed transactions from an existing WAL file into the
    /// main file, then truncates the WAL to zero length. A missing WAL file
    /// is treated as "nothing to replay".
    fn checkpoint_file(wal_path: &Path, db_path: &Path) -> DbResult<()> {
        if !wal_path.exists() {
            return Ok(());
        }

        let entries = Self::read_all_entries(wal_path)?;
        let committed = committed_page_writes(&entries);
        if committed.is_empty() {
            debug!("wal: nothing to replay at {}", wal_path.display());
        } else {
            debug!(
                "wal: replaying {} page writes from {} into {}",
                committed.len(),
                wal_path.display(),
                db_path.display()
            );
            let mut db_file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .open(db_path)
                .map_err(|e| DbError::WalIo(format!("open {}: {e}", db_path.display())))?;
            for (page_id, offset, new_bytes) in committed {
                let pos = (page_id as u64 - 1) * 4096 + offset as u64;
                db_file
                    .seek(SeekFrom::Start(pos))
                    .map_err(|e| DbError::WalIo(e.to_string()))?;
                db_file
                    .write_all(&new_bytes)
                    .map_err(|e| DbError::WalIo(e.to_string()))?;
            }
            db_file.sync_all().map_err(|e| DbError::WalIo(e.to_string()))?;
        }

        // Checkpoint: truncate the WAL now that its effects are durable in the main file.
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(wal_path)
            .map_err(|e| DbError::WalIo(format!("truncate {}: {e}", wal_path.display())))?;
        Ok(())
    }

    fn read_all_entries(path: &Path) -> DbResult<Vec<Entry>> {
        let mut file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|e| DbError::WalIo(format!("open {}: {e}", path.display())))?;
        let mut entries = Vec::new();
        while let Some(entry) = Entry::decode(&mut file)? {
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Begins a new transaction. Fails if one is already active.
    pub fn begin(&mut self) -> DbResult<u64> {
        if matches!(self.state, State::Active(_)) {
            return Err(DbError::WalIo("transaction already active".into()));
        }
        let txn_id = self.next_txn_id;
        self.next_txn_id += 1;
        self.append(&Entry::begin(txn_id))?;
        self.state = State::Active(txn_id);
        trace!("wal: begin txn {txn_id}");
        Ok(txn_id)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active(_))
    }

    /// Records one page's pre/post image under the active transaction.
    pub fn record_page_write(
        &mut self,
        txn_id: u64,
        page_id: u32,
        offset: u32,
        old_bytes: &[u8],
        new_bytes: &[u8],
    ) -> DbResult<()> {
        self.require_active(txn_id)?;
        self.append(&Entry::page_write(txn_id, page_id, offset, old_bytes, new_bytes))
    }

    /// Appends the `Commit` record and fsyncs before returning, making the
    /// transaction durable.
    pub fn commit(&mut self, txn_id: u64) -> DbResult<()> {
        self.require_active(txn_id)?;
        self.append(&Entry::commit(txn_id))?;
        self.file.sync_all().map_err(|e| DbError::WalIo(e.to_string()))?;
        self.state = State::Idle;
        debug!("wal: committed txn {txn_id}");
        Ok(())
    }

    /// Appends the `Rollback` record. No durability guarantee is made for
    /// this record itself; it exists purely so replay on the next open
    /// recognizes and discards the transaction's writes.
    pub fn rollback(&mut self, txn_id: u64) -> DbResult<()> {
        self.require_active(txn_id)?;
        self.append(&Entry::rollback(txn_id))?;
        self.state = State::Idle;
        debug!("wal: rolled back txn {txn_id}");
        Ok(())
    }

    fn require_active(&self, txn_id: u64) -> DbResult<()> {
        match self.state {
            State::Active(active) if active == txn_id => Ok(()),
            State::Active(_) => Err(DbError::WalIo("txn_id does not match active transaction".into())),
            State::Idle => Err(DbError::WalIo("no active transaction".into())),
        }
    }

    fn append(&mut self, entry: &Entry) -> DbResult<()> {
        let mut buf = Vec::new();
        entry.encode(&mut buf);
        self.file.write_all(&buf).map_err(|e| DbError::WalIo(e.to_string()))?;
        self.file.flush().map_err(|e| DbError::WalIo(e.to_string()))?;
        Ok(())
    }

    /// Path of the WAL file on disk (for diagnostics/tests).
    pub fn path(&self) -> &Path {
        &self.wal_path
    }
}

impl Drop for Wal {
    fn drop(&mut self) {
        if self.is_active() {
            warn!("wal: dropped with a transaction still active; its effects are lost");
        }
    }
}

/// Collects `(page_id, offset, new_bytes)` for every `PageWrite` belonging to
/// a transaction whose terminal record is `Commit`. Transactions ending in
/// `Rollback`, or with no terminator at all (a torn tail), contribute
/// nothing.
fn committed_page_writes(entries: &[Entry]) -> Vec<(u32, u32, Vec<u8>)> {
    use std::collections::HashMap;

    let mut writes_by_txn: HashMap<u64, Vec<(u32, u32, Vec<u8>)>> = HashMap::new();
    let mut committed: Vec<u64> = Vec::new();

    for entry in entries {
        match entry.kind {
            EntryKind::Begin => {
                writes_by_txn.entry(entry.txn_id).or_default();
            }
            EntryKind::PageWrite => {
                writes_by_txn
                    .entry(entry.txn_id)
                    .or_default()
                    .push((entry.page_id, entry.offset, entry.new_bytes.clone()));
            }
            EntryKind::Commit => committed.push(entry.txn_id),
            EntryKind::Rollback => {
                writes_by_txn.remove(&entry.txn_id);
            }
        }
    }

    let mut out = Vec::new();
    for txn_id in committed {
        if let Some(writes) = writes_by_txn.remove(&txn_id) {
            out.extend(writes);
        }
    }
    out
}
