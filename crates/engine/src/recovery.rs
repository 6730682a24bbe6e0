//! Cold-start recovery: scan the SSTable directory and replay the WAL.

use memtable::Memtable;
use sstable::SsTable;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};
use wal::{Op, Wal};

use crate::{Result, TableHandle};

/// Loads every SSTable under `dir`, ordered oldest-first by modification
/// time. A missing directory yields an empty list; it is created lazily by
/// the first flush.
///
/// Leftover `.sst.tmp` files from an interrupted flush or merge are removed
/// here; they were never renamed into place, so nothing references them.
/// Any other stray file is skipped with a warning. A table that fails to
/// parse or checksum aborts the open.
pub(crate) fn load_tables(dir: &Path) -> Result<Vec<TableHandle>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut found: Vec<(PathBuf, SystemTime)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.ends_with(".sst.tmp") {
            debug!(path = %path.display(), "removing interrupted table write");
            let _ = fs::remove_file(&path);
            continue;
        }
        if !name.ends_with(".sst") {
            warn!(path = %path.display(), "ignoring stray file in sstable directory");
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        found.push((path, modified));
    }

    found.sort_by(|a, b| a.1.cmp(&b.1));

    let mut tables = Vec::with_capacity(found.len());
    for (path, _) in found {
        let table = SsTable::read(&path)?;
        debug!(path = %path.display(), entries = table.len(), "loaded sstable");
        tables.push(TableHandle {
            path,
            table: Arc::new(table),
        });
    }
    Ok(tables)
}

/// Replays the WAL's unflushed window straight into `mem`, returning the
/// record count.
///
/// Replay applies mutations to the memtable directly rather than through
/// the public `set`/`delete` path: nothing is re-logged (the records are
/// already in the WAL) and no flush can trigger mid-recovery. A `Del`
/// record always lands as a tombstone, which is harmless even when the key
/// exists nowhere else.
pub(crate) fn replay_into(wal: &Wal, mem: &mut Memtable) -> Result<usize> {
    let count = wal.replay(|record| match record.op {
        Op::Set => mem.put(record.key, record.value),
        Op::Del => {
            mem.delete(record.key);
        }
    })?;
    Ok(count)
}
