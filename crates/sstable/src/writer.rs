use byteorder::{BigEndian, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use memtable::Memtable;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::format::{Operation, MAGIC, VERSION};
use crate::{Result, SsTableError};

/// Encodes a memtable into an SSTable file.
pub struct SsTableWriter {}

impl SsTableWriter {
    /// Writes the memtable to a new SSTable at `path`.
    ///
    /// One entry is emitted per key, in ascending order (the memtable
    /// iterates sorted, so no extra sort pass is needed). A live entry
    /// becomes `Set` with its value; a tombstone becomes a single `Del`
    /// entry with an empty value.
    ///
    /// The table is written to `<path>.tmp`, fsynced, and renamed into
    /// place, so a crash mid-write never leaves a half-table under the
    /// final name. On error the temp file is removed.
    pub fn write_from_memtable(path: &Path, mem: &Memtable) -> Result<()> {
        if mem.is_empty() {
            return Err(SsTableError::InvalidArgument(
                "refusing to write a table with no entries",
            ));
        }

        let tmp_path = path.with_extension("sst.tmp");
        if let Err(e) = write_table(&tmp_path, mem) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

fn write_table(tmp_path: &Path, mem: &Memtable) -> Result<()> {
    let (smallest, largest) = match (mem.smallest(), mem.largest()) {
        (Some(s), Some(l)) => (s, l),
        _ => {
            return Err(SsTableError::InvalidArgument(
                "refusing to write a table with no entries",
            ))
        }
    };

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(tmp_path)?;
    let mut w = BufWriter::new(file);

    // header
    w.write_u32::<BigEndian>(MAGIC)?;
    w.write_u32::<BigEndian>(mem.len() as u32)?;
    w.write_u32::<BigEndian>(smallest.len() as u32)?;
    w.write_all(smallest)?;
    w.write_u32::<BigEndian>(largest.len() as u32)?;
    w.write_all(largest)?;
    w.write_u16::<BigEndian>(VERSION)?;

    // body, checksumming key and value bytes as they land
    let mut hasher = Crc32::new();
    for (key, value) in mem.iter() {
        let (op, bytes): (Operation, &[u8]) = match value {
            Some(v) => (Operation::Set, v),
            None => (Operation::Del, &[]),
        };
        w.write_u8(op.as_u8())?;
        w.write_u32::<BigEndian>(key.len() as u32)?;
        w.write_u32::<BigEndian>(bytes.len() as u32)?;
        w.write_all(key)?;
        w.write_all(bytes)?;
        hasher.update(key);
        hasher.update(bytes);
    }

    // trailer
    w.write_u32::<BigEndian>(hasher.finalize())?;
    w.flush()?;

    let file = w
        .into_inner()
        .map_err(|e| SsTableError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}
