//! Write path: `set()`, `delete()`, `force_flush()`, and the internal
//! `flush()`.
//!
//! Every mutation is appended to the WAL before the memtable changes, so a
//! crash after the append replays the mutation and a crash before it never
//! acknowledged anything. Both happen under the exclusive state lock; the
//! WAL's own mutex is always taken second.

use sstable::{fresh_table_path, SsTable, SsTableWriter, FLUSH_PREFIX};
use std::fs;
use std::sync::Arc;
use tracing::info;
use wal::Record;

use crate::{read, Db, Error, Result, State, TableHandle};

/// What the memtable knows about a key, decoupled from the map borrow.
enum MemProbe {
    Live,
    Tombstone,
    Absent,
}

impl Db {
    /// Inserts or updates a key-value pair.
    ///
    /// The key must be non-empty. When the memtable reaches the configured
    /// entry threshold the call also flushes it to a new SSTable and runs
    /// the compaction policy, so an occasional `set` pays for the batch.
    pub fn set(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidArgument("key must not be empty".into()));
        }

        let mut state = self.write_state()?;

        self.wal().append(&Record::set(key.clone(), value.clone()))?;
        state.mem.put(key, value);

        if state.mem.len() >= self.threshold() {
            self.flush(&mut state)?;
        }
        Ok(())
    }

    /// Deletes a key, returning the value it had immediately before.
    ///
    /// Three cases, resolved under the exclusive lock:
    ///
    /// - already tombstoned in the memtable: `KeyNotFound`, nothing logged;
    /// - live in the memtable: tombstone it, log a `Del`, return the value;
    /// - absent from the memtable: resolve the key from the SSTables
    ///   (newest to oldest). A miss or tombstone there is `KeyNotFound`
    ///   with no state change; a live value gets a tombstone installed in
    ///   the memtable, a `Del` logged, and the value returned.
    ///
    /// Deleting an absent key therefore writes no WAL record at all.
    pub fn delete(&self, key: &[u8]) -> Result<Vec<u8>> {
        if key.is_empty() {
            return Err(Error::InvalidArgument("key must not be empty".into()));
        }

        let mut state = self.write_state()?;

        let probe = match state.mem.get(key) {
            Some(Some(_)) => MemProbe::Live,
            Some(None) => MemProbe::Tombstone,
            None => MemProbe::Absent,
        };

        match probe {
            MemProbe::Tombstone => Err(Error::KeyNotFound),
            MemProbe::Live => {
                self.wal().append(&Record::del(key.to_vec()))?;
                state
                    .mem
                    .delete(key.to_vec())
                    .ok_or(Error::KeyNotFound)
            }
            MemProbe::Absent => {
                // the lookup itself may say KeyNotFound, in which case no
                // record is written and nothing changes
                let previous = read::lookup_in_tables(&state.tables, key)?;
                self.wal().append(&Record::del(key.to_vec()))?;
                state.mem.delete(key.to_vec());
                Ok(previous)
            }
        }
    }

    /// Flushes the memtable to a new SSTable even below the threshold.
    /// A no-op when the memtable is empty.
    pub fn force_flush(&self) -> Result<()> {
        let mut state = self.write_state()?;
        if state.mem.is_empty() {
            return Ok(());
        }
        self.flush(&mut state)
    }

    /// Flush: persist the memtable as `sstable_file_<YYMMDDHHMMSS>.sst`,
    /// reset it, hand the flushed window back to the WAL, then apply the
    /// compaction policy.
    ///
    /// Ordering is what makes this crash-atomic: the table is fully
    /// written and renamed into place before `mark_flushed` moves the
    /// watermark. A crash in between replays records whose effects are
    /// already in the table, which is idempotent.
    pub(crate) fn flush(&self, state: &mut State) -> Result<()> {
        fs::create_dir_all(self.sstable_dir())?;

        let path = fresh_table_path(self.sstable_dir(), FLUSH_PREFIX);
        SsTableWriter::write_from_memtable(&path, &state.mem)?;

        // read back what landed; this also re-verifies the checksum
        let table = SsTable::read(&path)?;
        info!(
            path = %path.display(),
            entries = table.len(),
            "flushed memtable to sstable"
        );

        state.tables.push(TableHandle {
            path,
            table: Arc::new(table),
        });
        state.mem.clear();

        self.wal().mark_flushed()?;

        self.maybe_compact(state)
    }
}
