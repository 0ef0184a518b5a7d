//! Page-level buffer pool: a bounded, LRU-evicted cache of fixed-size pages
//! over a single file (or, for [`MemPager`], over nothing at all).
//!
//! The B-tree is the only caller: it reads and writes whole pages through the
//! [`Pager`] trait and never touches a file handle directly.
//!
//! # Example
//!
//! ```no_run
//! use buffer::{FilePager, Pager};
//! use common::Config;
//!
//! let config = Config::default();
//! let mut pager = FilePager::open("/tmp/demo.db", &config).unwrap();
//! let id = pager.allocate().unwrap();
//! pager.get_mut(id).unwrap().bytes[0] = 42;
//! pager.mark_dirty(id).unwrap();
//! pager.flush().unwrap();
//! ```


use common::{Config, DbError, DbResult};
use hashbrown::HashSet;
use log::{debug, trace};
use lru::LruCache;
use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

/// A single fixed-size page: an id (never 0) plus its raw bytes.
#[derive(Debug, Clone)]
pub struct Page {
    pub id: u32,
    pub bytes: Vec<u8>,
}

impl Page {
    pub fn new(id: u32, page_size: usize) -> Self {
        Self {
            id,
            bytes: vec![0u8; page_size],
        }
    }
}

/// Provides stable page identifiers and a cached byte view of each page.
///
/// Implementors own the lifecycle of pages: loading from the backing store,
/// evicting under memory pressure, and tracking which pages must be written
/// back before they can be dropped from the cache.
pub trait Pager {
    /// Allocates a freshly zeroed page, returning its id. Never returns 0.
    fn allocate(&mut self) -> DbResult<u32>;
    /// Fetches a page, loading it from the backing store on a cache miss.
    fn get(&mut self, page_id: u32) -> DbResult<&Page>;
    /// Like [`Pager::get`], for callers about to mutate the page in place.
    fn get_mut(&mut self, page_id: u32) -> DbResult<&mut Page>;
    /// Flags a cached page dirty. Fails with [`DbError::PageNotCached`] if
    /// the page is not currently resident.
    fn mark_dirty(&mut self, page_id: u32) -> DbResult<()>;
    /// Writes every dirty page back to the backing store and clears dirty
    /// bits. Idempotent.
    fn flush(&mut self) -> DbResult<()>;
    fn page_size(&self) -> usize;
}

fn read_page_from_file(file: &mut File, page_size: usize, page_id: u32) -> DbResult<Page> {
    let offset = (page_id as u64 - 1) * page_size as u64;
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| DbError::PagerIo(format!("seek to page {page_id}: {e}")))?;
    let mut bytes = vec![0u8; page_size];
    let mut read_buf = vec![0u8; page_size];
    let n = file
        .read(&mut read_buf)
        .map_err(|e| DbError::PagerIo(format!("read page {page_id}: {e}")))?;
    bytes[..n].copy_from_slice(&read_buf[..n]);
    Ok(Page { id: page_id, bytes })
}

fn write_page_to_file(file: &mut File, page_size: usize, page: &Page) -> DbResult<()> {
    let offset = (page.id as u64 - 1) * page_size as u64;
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| DbError::PagerIo(format!("seek to page {}: {e}", page.id)))?;
    file.write_all(&page.bytes)
        .map_err(|e| DbError::PagerIo(format!("write page {}: {e}", page.id)))?;
    Ok(())
}

/// File-backed pager with LRU eviction, batch-evicting down to
/// `eviction_target` once `max_cached_pages` is exceeded.
pub struct FilePager {
    file: File,
    page_size: usize,
    max_cached_pages: usize,
    eviction_target: usize,
    next_page_id: u32,
    cache: LruCache<u32, Page>,
    dirty: HashSet<u32>,
}

impl FilePager {
    /// Opens (creating if necessary) the database file at `path`.
    ///
    /// `next_page_id` is inferred from the file's length (`len/page_size +
    /// 1`) — there is no superblock.
    pub fn open(path: impl AsRef<Path>, config: &Config) -> DbResult<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| DbError::PagerIo(format!("open {}: {e}", path.display())))?;
        let len = file
            .metadata()
            .map_err(|e| DbError::PagerIo(e.to_string()))?
            .len();
        let next_page_id = (len / config.page_size as u64) as u32 + 1;
        debug!(
            "pager: opened {} ({len} bytes), next_page_id={next_page_id}",
            path.display()
        );
        Ok(Self {
            file,
            page_size: config.page_size,
            max_cached_pages: config.max_cached_pages,
            eviction_target: config.eviction_target,
            next_page_id,
            cache: LruCache::unbounded(),
            dirty: HashSet::new(),
        })
    }

    fn evict_if_needed(&mut self) -> DbResult<()> {
        if self.cache.len() <= self.max_cached_pages {
            return Ok(());
        }
        debug!(
            "pager: cache at {} pages (max {}), evicting to {}",
            self.cache.len(),
            self.max_cached_pages,
            self.eviction_target
        );
        while self.cache.len() > self.eviction_target {
            let Some((id, page)) = self.cache.pop_lru() else {
                break;
            };
            if self.dirty.remove(&id) {
                trace!("pager: writing back dirty page {id} on eviction");
                write_page_to_file(&mut self.file, self.page_size, &page)?;
            }
        }
        Ok(())
    }

    fn ensure_cached(&mut self, page_id: u32) -> DbResult<()> {
        if self.cache.contains(&page_id) {
            return Ok(());
        }
        let page = read_page_from_file(&mut self.file, self.page_size, page_id)?;
        self.cache.put(page_id, page);
        self.evict_if_needed()
    }
}

impl Pager for FilePager {
    fn allocate(&mut self) -> DbResult<u32> {
        let id = self.next_page_id;
        self.next_page_id += 1;
        self.cache.put(id, Page::new(id, self.page_size));
        self.dirty.insert(id);
        self.evict_if_needed()?;
        trace!("pager: allocated page {id}");
        Ok(id)
    }

    fn get(&mut self, page_id: u32) -> DbResult<&Page> {
        self.ensure_cached(page_id)?;
        Ok(self.cache.get(&page_id).expect("just cached"))
    }

    fn get_mut(&mut self, page_id: u32) -> DbResult<&mut Page> {
        self.ensure_cached(page_id)?;
        Ok(self.cache.get_mut(&page_id).expect("just cached"))
    }

    fn mark_dirty(&mut self, page_id: u32) -> DbResult<()> {
        if !self.cache.contains(&page_id) {
            return Err(DbError::PageNotCached(page_id));
        }
        self.dirty.insert(page_id);
        Ok(())
    }

    fn flush(&mut self) -> DbResult<()> {
        let dirty_ids: Vec<u32> = self.dirty.drain().collect();
        for id in dirty_ids {
            if let Some(page) = self.cache.peek(&id) {
                write_page_to_file(&mut self.file, self.page_size, page)?;
            }
        }
        self.file
            .sync_all()
            .map_err(|e| DbError::PagerIo(format!("fsync: {e}")))?;
        Ok(())
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}

/// Wraps a [`Pager`] to snapshot each page's pre-image the first time it is
/// mutated, for the lifetime of a WAL transaction.
///
/// `snapshots` is owned by the caller (the `database` crate's active
/// transaction state) so it survives across the several `execute()` calls
/// that make up one `begin`/`commit` pair; this wrapper only ever sees one
/// statement's worth of calls. A page's pre-image is captured on its first
/// `get_mut`/`allocate` since `snapshots` was last cleared, never again —
/// that first image is the one a rollback must restore.
pub struct RecordingPager<'p> {
    inner: &'p mut dyn Pager,
    snapshots: &'p mut hashbrown::HashMap<u32, Vec<u8>>,
}

impl<'p> RecordingPager<'p> {
    pub fn new(inner: &'p mut dyn Pager, snapshots: &'p mut hashbrown::HashMap<u32, Vec<u8>>) -> Self {
        Self { inner, snapshots }
    }

    fn capture(&mut self, page_id: u32, pre_image: impl FnOnce() -> Vec<u8>) {
        self.snapshots.entry(page_id).or_insert_with(pre_image);
    }
}

impl<'p> Pager for RecordingPager<'p> {
    fn allocate(&mut self) -> DbResult<u32> {
        let id = self.inner.allocate()?;
        let page_size = self.inner.page_size();
        self.capture(id, || vec![0u8; page_size]);
        Ok(id)
    }

    fn get(&mut self, page_id: u32) -> DbResult<&Page> {
        self.inner.get(page_id)
    }

    fn get_mut(&mut self, page_id: u32) -> DbResult<&mut Page> {
        if !self.snapshots.contains_key(&page_id) {
            let pre_image = self.inner.get(page_id)?.bytes.clone();
            self.snapshots.insert(page_id, pre_image);
        }
        self.inner.get_mut(page_id)
    }

    fn mark_dirty(&mut self, page_id: u32) -> DbResult<()> {
        self.inner.mark_dirty(page_id)
    }

    fn flush(&mut self) -> DbResult<()> {
        self.inner.flush()
    }

    fn page_size(&self) -> usize {
        self.inner.page_size()
    }
}

/// Pure in-memory pager: no file handle, `flush` does no I/O.
///
/// Evicted dirty pages are preserved in an in-memory `backing` map (standing
/// in for "disk") so that eviction never loses data even though there is no
/// file underneath.
pub struct MemPager {
    page_size: usize,
    max_cached_pages: usize,
    eviction_target: usize,
    next_page_id: u32,
    cache: LruCache<u32, Page>,
    dirty: HashSet<u32>,
    backing: hashbrown::HashMap<u32, Vec<u8>>,
}

impl MemPager {
    pub fn new(config: &Config) -> Self {
        Self {
            page_size: config.page_size,
            max_cached_pages: config.max_cached_pages,
            eviction_target: config.eviction_target,
            next_page_id: 1,
            cache: LruCache::unbounded(),
            dirty: HashSet::new(),
            backing: hashbrown::HashMap::new(),
        }
    }

    fn evict_if_needed(&mut self) {
        if self.cache.len() <= self.max_cached_pages {
            return;
        }
        while self.cache.len() > self.eviction_target {
            let Some((id, page)) = self.cache.pop_lru() else {
                break;
            };
            if self.dirty.remove(&id) {
                self.backing.insert(id, page.bytes);
            }
        }
    }

    fn ensure_cached(&mut self, page_id: u32) {
        if self.cache.contains(&page_id) {
            return;
        }
        let bytes = self
            .backing
            .get(&page_id)
            .cloned()
            .unwrap_or_else(|| vec![0u8; self.page_size]);
        self.cache.put(page_id, Page { id: page_id, bytes });
        self.evict_if_needed();
    }
}

impl Default for MemPager {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Pager for MemPager {
    fn allocate(&mut self) -> DbResult<u32> {
        let id = self.next_page_id;
        self.next_page_id += 1;
        self.cache.put(id, Page::new(id, self.page_size));
        self.dirty.insert(id);
        self.evict_if_needed();
        Ok(id)
    }

    fn get(&mut self, page_id: u32) -> DbResult<&Page> {
        self.ensure_cached(page_id);
        Ok(self.cache.get(&page_id).expect("just cached"))
    }

    fn get_mut(&mut self, page_id: u32) -> DbResult<&mut Page> {
        self.ensure_cached(page_id);
        Ok(self.cache.get_mut(&page_id).expect("just cached"))
    }

    fn mark_dirty(&mut self, page_id: u32) -> DbResult<()> {
        if !self.cache.contains(&page_id) {
            return Err(DbError::PageNotCached(page_id));
        }
        self.dirty.insert(page_id);
        Ok(())
    }

    fn flush(&mut self) -> DbResult<()> {
        for id in self.dirty.drain().collect::<Vec<_>>() {
            if let Some(page) = self.cache.peek(&id) {
                self.backing.insert(id, page.bytes.clone());
            }
        }
        Ok(())
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}
