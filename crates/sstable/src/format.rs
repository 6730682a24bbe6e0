use chrono::{Duration, Local};
use std::path::{Path, PathBuf};

use crate::{Result, SsTableError};

/// Magic number identifying an SSTable file.
pub const MAGIC: u32 = 221003;

/// Current format version. Readers reject anything else.
pub const VERSION: u16 = 2;

/// Filename prefix for tables produced by a memtable flush.
pub const FLUSH_PREFIX: &str = "sstable_file_";

/// Filename prefix for tables produced by compaction.
pub const COMPACT_PREFIX: &str = "compact_sstable_";

/// YYMMDDHHMMSS, the timestamp embedded in table filenames.
pub const TIMESTAMP_FORMAT: &str = "%y%m%d%H%M%S";

/// What an entry does to its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Set,
    Del,
}

impl Operation {
    pub(crate) fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Operation::Set),
            1 => Ok(Operation::Del),
            other => Err(SsTableError::BadFormat(format!(
                "unknown operation byte {other:#04x}"
            ))),
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Operation::Set => 0,
            Operation::Del => 1,
        }
    }
}

/// One record in a table's body. Tombstones (`Del`) have an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub operation: Operation,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Picks an unused `<prefix><YYMMDDHHMMSS>.sst` path under `dir`.
///
/// Two flushes (or two compaction rounds) inside the same wall-clock second
/// would otherwise collide on the same name; the timestamp is bumped ahead
/// one second at a time until the name is free.
pub fn fresh_table_path(dir: &Path, prefix: &str) -> PathBuf {
    let mut stamp = Local::now();
    loop {
        let name = format!("{prefix}{}.sst", stamp.format(TIMESTAMP_FORMAT));
        let path = dir.join(name);
        if !path.exists() {
            return path;
        }
        stamp = stamp + Duration::seconds(1);
    }
}
