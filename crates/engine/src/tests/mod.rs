use crate::{Db, Options};
use std::fs;
use std::path::Path;


/// Opens a database rooted at `dir` with compaction effectively disabled,
/// so tests exercise flushing and lookup without tables collapsing.
pub(crate) fn open_db(dir: &Path, threshold: usize) -> Db {
    Db::open(
        dir.join("wal.log"),
        dir.join("sst"),
        Options {
            threshold,
            compaction_threshold: 1000,
            wal_sync: false,
        },
    )
    .unwrap()
}

pub(crate) fn count_sst_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|s| s.to_str())
                .map(|ext| ext == "sst")
                .unwrap_or(false)
        })
        .count()
}
