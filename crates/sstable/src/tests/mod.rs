use crc32fast::Hasher as Crc32;
use memtable::Memtable;

mod merge_tests;
mod writer_tests;

/// Builds a memtable from (key, Some(value) | None) pairs.
pub(crate) fn build_memtable(entries: &[(&[u8], Option<&[u8]>)]) -> Memtable {
    let mut mem = Memtable::new();
    for (key, value) in entries {
        match value {
            Some(v) => mem.put(key.to_vec(), v.to_vec()),
            None => {
                mem.delete(key.to_vec());
            }
        }
    }
    mem
}

/// The trailer checksum: CRC-32 over each entry's key then value, in
/// ascending key order.
pub(crate) fn expected_crc(entries: &[(&[u8], &[u8])]) -> u32 {
    let mut hasher = Crc32::new();
    for (key, value) in entries {
        hasher.update(key);
        hasher.update(value);
    }
    hasher.finalize()
}
