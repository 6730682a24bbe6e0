use byteorder::{BigEndian, ReadBytesExt};
use crc32fast::Hasher as Crc32;
use std::fs;
use std::path::Path;

use crate::format::{Entry, Operation, MAGIC, VERSION};
use crate::{Result, SsTableError};

/// A fully parsed SSTable.
///
/// [`read`](SsTable::read) loads and validates the whole file once; lookups
/// afterwards are in-memory binary searches over the sorted entry vector.
/// The engine keeps parsed tables cached for the life of the file, so a
/// point lookup never re-reads disk.
#[derive(Debug)]
pub struct SsTable {
    smallest_key: Vec<u8>,
    largest_key: Vec<u8>,
    version: u16,
    entries: Vec<Entry>,
    checksum: u32,
}

impl SsTable {
    /// Reads and validates the table at `path`.
    ///
    /// Validation covers the magic number and version, the entry ordering
    /// invariant, agreement between the header's smallest/largest keys and
    /// the first/last entries, and the CRC-32 trailer recomputed over every
    /// entry's key and value bytes.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        let mut r: &[u8] = &bytes;

        // header
        let magic = read_u32(&mut r, "header")?;
        if magic != MAGIC {
            return Err(SsTableError::BadFormat(format!(
                "bad magic number {magic} (expected {MAGIC})"
            )));
        }
        let entry_count = read_u32(&mut r, "header")?;
        let smallest_len = read_u32(&mut r, "header")? as usize;
        let smallest_key = read_bytes(&mut r, smallest_len, "header")?;
        let largest_len = read_u32(&mut r, "header")? as usize;
        let largest_key = read_bytes(&mut r, largest_len, "header")?;
        let version = read_u16(&mut r, "header")?;
        if version != VERSION {
            return Err(SsTableError::BadFormat(format!(
                "unsupported version {version} (expected {VERSION})"
            )));
        }
        if entry_count == 0 {
            return Err(SsTableError::BadFormat("table has no entries".into()));
        }

        // body
        let mut hasher = Crc32::new();
        let mut entries: Vec<Entry> = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let op = read_u8(&mut r, "entry")?;
            let operation = Operation::from_u8(op)?;
            let key_len = read_u32(&mut r, "entry")? as usize;
            let value_len = read_u32(&mut r, "entry")? as usize;
            let key = read_bytes(&mut r, key_len, "entry key")?;
            let value = read_bytes(&mut r, value_len, "entry value")?;

            if let Some(prev) = entries.last() {
                if prev.key > key {
                    return Err(SsTableError::BadFormat(
                        "entries are not sorted by key".into(),
                    ));
                }
            }

            hasher.update(&key);
            hasher.update(&value);
            entries.push(Entry {
                operation,
                key,
                value,
            });
        }

        // trailer
        let checksum = read_u32(&mut r, "trailer")?;
        let computed = hasher.finalize();
        if checksum != computed {
            return Err(SsTableError::ChecksumMismatch {
                stored: checksum,
                computed,
            });
        }

        // the header's key range must agree with the body
        match (entries.first(), entries.last()) {
            (Some(first), Some(last))
                if first.key == smallest_key && last.key == largest_key => {}
            _ => {
                return Err(SsTableError::BadFormat(
                    "header key range disagrees with entries".into(),
                ))
            }
        }

        Ok(Self {
            smallest_key,
            largest_key,
            version,
            entries,
            checksum,
        })
    }

    /// Point lookup by binary search. Returns the entry whether it is a
    /// `Set` or a tombstone; the caller decides what a `Del` hit means.
    pub fn get(&self, key: &[u8]) -> Option<&Entry> {
        self.entries
            .binary_search_by(|e| e.key.as_slice().cmp(key))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn smallest_key(&self) -> &[u8] {
        &self.smallest_key
    }

    pub fn largest_key(&self) -> &[u8] {
        &self.largest_key
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn checksum(&self) -> u32 {
        self.checksum
    }
}

fn read_u8(r: &mut &[u8], what: &'static str) -> Result<u8> {
    r.read_u8().map_err(|_| SsTableError::Truncated(what))
}

fn read_u16(r: &mut &[u8], what: &'static str) -> Result<u16> {
    r.read_u16::<BigEndian>()
        .map_err(|_| SsTableError::Truncated(what))
}

fn read_u32(r: &mut &[u8], what: &'static str) -> Result<u32> {
    r.read_u32::<BigEndian>()
        .map_err(|_| SsTableError::Truncated(what))
}

fn read_bytes(r: &mut &[u8], len: usize, what: &'static str) -> Result<Vec<u8>> {
    if r.len() < len {
        return Err(SsTableError::Truncated(what));
    }
    let (head, tail) = r.split_at(len);
    *r = tail;
    Ok(head.to_vec())
}
