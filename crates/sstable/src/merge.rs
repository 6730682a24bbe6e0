//! Compaction merge: folds several SSTables into one.
//!
//! Inputs are supplied oldest-first. Entries are folded into a working
//! memtable in that order, so a later (newer) table's entry for a key
//! overwrites an earlier one, and the newest value wins. Tombstones are
//! folded like any other entry and survive into the output: a key deleted
//! in the newest input stays deleted, shadowing whatever tables remain
//! below the merged one.

use memtable::Memtable;
use std::path::{Path, PathBuf};

use crate::format::{fresh_table_path, Operation, COMPACT_PREFIX};
use crate::{Result, SsTable, SsTableError, SsTableWriter};

/// Merges `inputs` (oldest-first) into a single new table under `out_dir`,
/// named `compact_sstable_<YYMMDDHHMMSS>.sst`. Returns the new path.
///
/// The input files are left in place; deleting them after the merged table
/// is durable is the caller's job.
pub fn merge<P: AsRef<Path>>(inputs: &[P], out_dir: &Path) -> Result<PathBuf> {
    if inputs.is_empty() {
        return Err(SsTableError::InvalidArgument(
            "merge needs at least one input table",
        ));
    }

    let mut folded = Memtable::new();
    for path in inputs {
        let table = SsTable::read(path)?;
        for entry in table.entries() {
            match entry.operation {
                Operation::Set => folded.put(entry.key.clone(), entry.value.clone()),
                Operation::Del => {
                    folded.delete(entry.key.clone());
                }
            }
        }
    }

    let out_path = fresh_table_path(out_dir, COMPACT_PREFIX);
    SsTableWriter::write_from_memtable(&out_path, &folded)?;
    Ok(out_path)
}
