//! Compaction: bound the SSTable count by merging the oldest tables.
//!
//! The policy is deliberately conservative. While the table count is at or
//! above `compaction_threshold`, the oldest `compaction_threshold` tables
//! are merged into one, which takes their place at the oldest position.
//! Tombstones are preserved (nothing here knows whether an even older
//! table still holds the key), and the memtable and WAL are untouched.

use sstable::SsTable;
use std::fs::{self, FileTimes, OpenOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::{Db, Result, State, TableHandle};

impl Db {
    /// Runs the compaction policy until the table count drops below the
    /// threshold. Called automatically after every flush; public so a host
    /// can also trigger it explicitly.
    pub fn compact(&self) -> Result<()> {
        let mut state = self.write_state()?;
        self.maybe_compact(&mut state)
    }

    pub(crate) fn maybe_compact(&self, state: &mut State) -> Result<()> {
        while state.tables.len() >= self.compaction_threshold() {
            let take = self.compaction_threshold();
            let input_paths: Vec<PathBuf> = state.tables[..take]
                .iter()
                .map(|h| h.path.clone())
                .collect();

            // the newest input's mtime; the merged file inherits it below
            let inherited_mtime = fs::metadata(&input_paths[take - 1])?.modified()?;

            let merged_path = sstable::merge(&input_paths, self.sstable_dir())?;

            // The merged table replaces the *oldest* tables, so it must
            // also sort before the remaining newer tables when a restart
            // re-orders the directory by mtime. Stamp it with the newest
            // input's mtime instead of "now".
            let file = OpenOptions::new().append(true).open(&merged_path)?;
            file.set_times(FileTimes::new().set_modified(inherited_mtime))?;

            let merged = SsTable::read(&merged_path)?;
            info!(
                inputs = take,
                path = %merged_path.display(),
                entries = merged.len(),
                "compacted sstables"
            );

            let handle = TableHandle {
                path: merged_path,
                table: Arc::new(merged),
            };
            state.tables.splice(..take, std::iter::once(handle));

            for path in &input_paths {
                // a straggler here is re-merged on a later pass; never
                // fatal to the compaction that already landed
                let _ = fs::remove_file(path);
            }
        }
        Ok(())
    }
}
