//! # SSTable — Sorted String Table
//!
//! Immutable, on-disk storage files for the siltkv storage engine.
//!
//! When the memtable reaches its entry threshold the engine flushes it to
//! disk as an SSTable. SSTables are *write-once, read-many*: once created
//! they are never modified, only replaced during compaction.
//!
//! ## File layout (v2, current)
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ HEADER                                                        │
//! │                                                               │
//! │ magic (u32) | entry_count (u32)                               │
//! │ smallest_len (u32) | smallest_key                             │
//! │ largest_len (u32)  | largest_key                              │
//! │ version (u16)                                                 │
//! ├───────────────────────────────────────────────────────────────┤
//! │ BODY (entries, ascending by key)                              │
//! │                                                               │
//! │ op (u8, 0=Set 1=Del) | key_len (u32) | value_len (u32)        │
//! │ key bytes | value bytes                                       │
//! │                                                               │
//! │ ... repeated entry_count times ...                            │
//! ├───────────────────────────────────────────────────────────────┤
//! │ TRAILER                                                       │
//! │                                                               │
//! │ crc32 (u32) over each entry's (key || value) in file order    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are big-endian. The magic value is `221003`; the CRC uses
//! the IEEE 802.3 polynomial. Version 1 of this format stored the smallest
//! and largest keys in fixed 4-byte header fields, which cannot represent
//! real keys; v2 length-prefixes them instead, and readers reject any
//! version other than 2.
//!
//! A `Del` entry is a tombstone: its value is empty and it shadows any
//! older value for the same key in tables further down the stack.

mod format;
mod merge;
mod reader;
mod writer;

pub use format::{
    fresh_table_path, Entry, Operation, COMPACT_PREFIX, FLUSH_PREFIX, MAGIC, VERSION,
};
pub use merge::merge;
pub use reader::SsTable;
pub use writer::SsTableWriter;

use std::io;
use thiserror::Error;

/// Errors surfaced by the SSTable codec.
#[derive(Debug, Error)]
pub enum SsTableError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Magic or version mismatch, or an unparseable record.
    #[error("bad table format: {0}")]
    BadFormat(String),

    /// The stored CRC does not match the recomputed one.
    #[error("checksum mismatch (stored {stored:#010x}, computed {computed:#010x})")]
    ChecksumMismatch { stored: u32, computed: u32 },

    /// The file ended mid-structure.
    #[error("table truncated reading {0}")]
    Truncated(&'static str),

    /// The caller asked for something the codec cannot encode.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

pub type Result<T> = std::result::Result<T, SsTableError>;

#[cfg(test)]
mod tests;
