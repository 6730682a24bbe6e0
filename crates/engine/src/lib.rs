//! # Engine — the siltkv storage engine
//!
//! The central orchestrator tying the [`memtable`], [`wal`], and [`sstable`]
//! crates into a persistent LSM-tree key-value store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                     DB                        │
//! │                                               │
//! │ write.rs → WAL append → memtable insert       │
//! │              |                                │
//! │              |  (entry count >= threshold?)   │
//! │              |            yes                 │
//! │              v                                │
//! │           flush() → new SSTable,              │
//! │                     WAL watermark advanced    │
//! │              |                                │
//! │              |  (table count >= threshold?)   │
//! │              |            yes                 │
//! │              v                                │
//! │           compact() → oldest tables merged    │
//! │                                               │
//! │ read.rs → memtable → SSTables newest→oldest   │
//! │            (first hit wins)                   │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! | Module         | Purpose                                            |
//! |----------------|----------------------------------------------------|
//! | `lib.rs`       | `Db` struct, options, open, accessors              |
//! | [`recovery`]   | SSTable directory scan, WAL replay, tmp cleanup    |
//! | [`write`]      | `set()`, `delete()`, `force_flush()`, `flush()`    |
//! | [`read`]       | `get()`, `keys()`, the layered lookup              |
//! | [`compaction`] | oldest-first merge loop                            |
//! | [`error`]      | the engine error taxonomy                          |
//!
//! ## Crash safety
//!
//! Every mutation is appended (and fsynced) to the WAL before it touches
//! the memtable. The WAL watermark only advances after a flush has renamed
//! a fully written SSTable into place, so at every crash point the union of
//! SSTables and the unflushed WAL window reproduces exactly the
//! acknowledged state. Recovery replays that window straight into the
//! memtable without re-logging it.
//!
//! ## Concurrency
//!
//! The memtable and table list sit behind one reader-writer lock; the WAL
//! serializes on its own mutex. Mutations take the state lock exclusively,
//! then the WAL lock (always in that order). `get` probes the memtable
//! under the shared lock, then snapshots the table handles and searches
//! them with no lock held, which is safe because tables are immutable.

mod compaction;
mod error;
mod read;
mod recovery;
mod write;

pub use error::{Error, Result};

use memtable::Memtable;
use sstable::SsTable;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;
use wal::Wal;

/// Default memtable entry count that triggers a flush.
pub const DEFAULT_THRESHOLD: usize = 100;

/// Default SSTable count that triggers compaction.
pub const DEFAULT_COMPACTION_THRESHOLD: usize = 2;

/// Engine tuning knobs. `..Default::default()` fills in the rest:
///
/// ```
/// use engine::Options;
///
/// let opts = Options {
///     threshold: 5,
///     ..Default::default()
/// };
/// assert_eq!(opts.compaction_threshold, 2);
/// ```
#[derive(Debug, Clone)]
pub struct Options {
    /// Memtable entry count at which a `set` triggers a flush.
    pub threshold: usize,
    /// SSTable count at which the oldest tables are merged. Must be at
    /// least 2.
    pub compaction_threshold: usize,
    /// Fsync every WAL append. On by default; tests and benchmarks that do
    /// not need crash durability can turn it off.
    pub wal_sync: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
            wal_sync: true,
        }
    }
}

/// A loaded SSTable and where it lives on disk. Cloning is cheap: the
/// parsed table itself is shared through the `Arc`.
#[derive(Clone)]
pub(crate) struct TableHandle {
    pub(crate) path: PathBuf,
    pub(crate) table: Arc<SsTable>,
}

/// Everything guarded by the state lock. `tables` is oldest-first: index 0
/// is the oldest table, the last element the newest flush or merge.
pub(crate) struct State {
    pub(crate) mem: Memtable,
    pub(crate) tables: Vec<TableHandle>,
}

/// The persistent key-value store.
///
/// Byte-string keys map to byte-string values. `set`/`delete` are durable
/// once they return; `get` sees every acknowledged write (read-your-writes
/// holds across threads). All methods take `&self` and are safe to call
/// from many request-handler threads at once.
pub struct Db {
    state: RwLock<State>,
    wal: Wal,
    sstable_dir: PathBuf,
    threshold: usize,
    compaction_threshold: usize,
}

impl Db {
    /// Opens (or creates) a database from a WAL file and a directory of
    /// SSTables, then recovers: existing tables are loaded oldest-first by
    /// modification time, and the unflushed WAL window is replayed into a
    /// fresh memtable. A missing SSTable directory just means an empty
    /// table list; a corrupt table or WAL aborts the open.
    pub fn open<P1: AsRef<Path>, P2: AsRef<Path>>(
        wal_path: P1,
        sstable_dir: P2,
        options: Options,
    ) -> Result<Self> {
        if options.threshold == 0 {
            return Err(Error::InvalidArgument(
                "threshold must be at least 1".into(),
            ));
        }
        if options.compaction_threshold < 2 {
            return Err(Error::InvalidArgument(
                "compaction_threshold must be at least 2".into(),
            ));
        }

        let sstable_dir = sstable_dir.as_ref().to_path_buf();
        let wal = Wal::open(wal_path.as_ref(), options.wal_sync)?;

        let tables = recovery::load_tables(&sstable_dir)?;
        let mut mem = Memtable::new();
        let replayed = recovery::replay_into(&wal, &mut mem)?;

        info!(
            sstables = tables.len(),
            replayed_records = replayed,
            memtable_entries = mem.len(),
            "database opened"
        );

        Ok(Self {
            state: RwLock::new(State { mem, tables }),
            wal,
            sstable_dir,
            threshold: options.threshold,
            compaction_threshold: options.compaction_threshold,
        })
    }

    /// Number of SSTables currently on disk.
    #[must_use]
    pub fn sstable_count(&self) -> usize {
        self.read_state().map(|s| s.tables.len()).unwrap_or(0)
    }

    /// SSTable paths, oldest first.
    #[must_use]
    pub fn sstable_paths(&self) -> Vec<PathBuf> {
        self.read_state()
            .map(|s| s.tables.iter().map(|h| h.path.clone()).collect())
            .unwrap_or_default()
    }

    /// Entries currently buffered in the memtable, tombstones included.
    #[must_use]
    pub fn memtable_len(&self) -> usize {
        self.read_state().map(|s| s.mem.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    #[must_use]
    pub fn compaction_threshold(&self) -> usize {
        self.compaction_threshold
    }

    pub(crate) fn wal(&self) -> &Wal {
        &self.wal
    }

    pub(crate) fn sstable_dir(&self) -> &Path {
        &self.sstable_dir
    }

    pub(crate) fn read_state(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| poisoned("state lock poisoned"))
    }

    pub(crate) fn write_state(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| poisoned("state lock poisoned"))
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (mem_len, table_count) = match self.read_state() {
            Ok(s) => (s.mem.len(), s.tables.len()),
            Err(_) => (0, 0),
        };
        f.debug_struct("Db")
            .field("sstable_dir", &self.sstable_dir)
            .field("threshold", &self.threshold)
            .field("compaction_threshold", &self.compaction_threshold)
            .field("memtable_entries", &mem_len)
            .field("sstable_count", &table_count)
            .finish()
    }
}

fn poisoned(msg: &str) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::Other, msg.to_string()))
}

#[cfg(test)]
mod tests;
