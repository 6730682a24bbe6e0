//! # WAL — Write-Ahead Log
//!
//! Durability layer for the siltkv storage engine. Every mutation is
//! appended here before it is applied to the memtable, so a crash between
//! an acknowledged write and the next flush loses nothing: on restart the
//! unflushed suffix of the log is replayed into a fresh memtable.
//!
//! ## File layout
//!
//! ```text
//! bytes [0..16)  : u64 offset | u64 watermark          (big-endian)
//! bytes [16..)   : records { u8 op | u32 key_len | u32 value_len
//!                          | key bytes | value bytes } (big-endian)
//! ```
//!
//! `offset` is the position where the next record will be written.
//! `watermark` is the position of the first record not yet captured by an
//! SSTable flush. The invariant `16 <= watermark <= offset <= file_size`
//! holds at every crash point:
//!
//! - fresh: `offset == watermark == 16`
//! - has-unreplayed: `offset > watermark` (recovery replays this window)
//! - drained: `offset == watermark > 16` (flush landed, truncation pending)
//!
//! ## Durability
//!
//! With `sync` enabled (the default in the engine), `append` fsyncs the
//! record bytes before the metadata header is rewritten, and fsyncs the
//! header write as well. A record is therefore fully on disk before any
//! future open can observe an `offset` that covers it.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;

/// Size of the metadata header at the start of the file.
pub const METADATA_SIZE: u64 = 16;

/// Size of the per-record header: op (1) + key_len (4) + value_len (4).
pub const RECORD_HEADER_SIZE: usize = 9;

/// Errors surfaced by WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The log ended in the middle of a record.
    #[error("log truncated mid-record")]
    Truncated,

    /// A record carried an operation byte this version does not know.
    #[error("unknown operation byte {0:#04x}")]
    BadRecord(u8),

    /// The metadata header violates `16 <= watermark <= offset <= size`.
    #[error("metadata header out of bounds (offset {offset}, watermark {watermark}, size {size})")]
    BadMetadata {
        offset: u64,
        watermark: u64,
        size: u64,
    },
}

/// Mutation kind carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Set,
    Del,
}

impl Op {
    fn from_u8(byte: u8) -> Result<Self, WalError> {
        match byte {
            0 => Ok(Op::Set),
            1 => Ok(Op::Del),
            other => Err(WalError::BadRecord(other)),
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Op::Set => 0,
            Op::Del => 1,
        }
    }
}

/// A single logged mutation. `Del` records carry an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub op: Op,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Record {
    pub fn set(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            op: Op::Set,
            key,
            value,
        }
    }

    pub fn del(key: Vec<u8>) -> Self {
        Self {
            op: Op::Del,
            key,
            value: Vec::new(),
        }
    }

    fn encoded_len(&self) -> u64 {
        (RECORD_HEADER_SIZE + self.key.len() + self.value.len()) as u64
    }
}

/// Snapshot of the metadata header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// Write position of the next record.
    pub offset: u64,
    /// First record not yet captured by a flush.
    pub watermark: u64,
}

impl Metadata {
    fn fresh() -> Self {
        Self {
            offset: METADATA_SIZE,
            watermark: METADATA_SIZE,
        }
    }
}

struct Inner {
    file: File,
    meta: Metadata,
    sync: bool,
    /// Reusable scratch buffer so append does not allocate per record.
    buf: Vec<u8>,
}

/// The write-ahead log. All operations serialize on an internal mutex so
/// that a record's header and body are always contiguous in the file.
pub struct Wal {
    inner: Mutex<Inner>,
}

impl Wal {
    /// Opens or creates the log at `path`.
    ///
    /// An existing metadata header is read back and validated; a fresh or
    /// undersized file gets `offset = watermark = 16`. The header is
    /// rewritten on every open so the on-disk state is valid from the
    /// first moment.
    ///
    /// When `sync` is set, every append fsyncs the record bytes before the
    /// header rewrite and fsyncs the header as well.
    pub fn open<P: AsRef<Path>>(path: P, sync: bool) -> Result<Self, WalError> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        let mut file = options.open(path.as_ref())?;

        let size = file.metadata()?.len();
        let meta = if size >= METADATA_SIZE {
            let meta = read_metadata(&mut file)?;
            if meta.watermark < METADATA_SIZE || meta.watermark > meta.offset || meta.offset > size
            {
                return Err(WalError::BadMetadata {
                    offset: meta.offset,
                    watermark: meta.watermark,
                    size,
                });
            }
            meta
        } else {
            Metadata::fresh()
        };

        write_metadata(&mut file, meta)?;
        if sync {
            file.sync_data()?;
        }

        debug!(
            offset = meta.offset,
            watermark = meta.watermark,
            "write-ahead log opened"
        );

        Ok(Self {
            inner: Mutex::new(Inner {
                file,
                meta,
                sync,
                buf: Vec::with_capacity(256),
            }),
        })
    }

    /// Appends a record at the current offset and advances it.
    ///
    /// The record bytes are written (and fsynced, when `sync` is on) before
    /// the metadata header is rewritten, so an interrupted append leaves the
    /// old header pointing at a fully valid prefix of the log.
    pub fn append(&self, record: &Record) -> Result<(), WalError> {
        let mut inner = self.lock()?;

        // Frame the record in the reusable scratch buffer, then land it in
        // a single write.
        let mut buf = std::mem::take(&mut inner.buf);
        buf.clear();
        buf.write_u8(record.op.as_u8())?;
        buf.write_u32::<BigEndian>(record.key.len() as u32)?;
        buf.write_u32::<BigEndian>(record.value.len() as u32)?;
        buf.extend_from_slice(&record.key);
        buf.extend_from_slice(&record.value);

        let offset = inner.meta.offset;
        inner.file.seek(SeekFrom::Start(offset))?;
        let written = inner.file.write_all(&buf);
        inner.buf = buf;
        written?;
        inner.file.flush()?;
        if inner.sync {
            inner.file.sync_data()?;
        }

        inner.meta.offset += record.encoded_len();
        let meta = inner.meta;
        write_metadata(&mut inner.file, meta)?;
        if inner.sync {
            inner.file.sync_data()?;
        }

        Ok(())
    }

    /// Replays every record in `[watermark, offset)` through `apply`,
    /// returning how many were seen.
    ///
    /// Replay is read-only: the persisted watermark does not move, so a
    /// crash at any point during or after recovery leaves the unflushed
    /// window intact for the next attempt. Only a flush advances the
    /// watermark, via [`Wal::mark_flushed`].
    pub fn replay<F>(&self, mut apply: F) -> Result<usize, WalError>
    where
        F: FnMut(Record),
    {
        let mut inner = self.lock()?;
        let limit = inner.meta.offset;
        let mut pos = inner.meta.watermark;
        let mut count = 0usize;

        inner.file.seek(SeekFrom::Start(pos))?;
        while pos < limit {
            let (record, next) = read_record(&mut inner.file, pos, limit)?;
            apply(record);
            pos = next;
            count += 1;
        }

        Ok(count)
    }

    /// Marks everything up to the current offset as captured by a flush.
    ///
    /// Two persisted steps, each leaving a header `open` accepts:
    /// first the drained state (`watermark = offset`), then a reset to the
    /// fresh state with the record region truncated away. A crash between
    /// the steps replays nothing that the flush already persisted.
    pub fn mark_flushed(&self) -> Result<(), WalError> {
        let mut inner = self.lock()?;

        inner.meta.watermark = inner.meta.offset;
        let drained = inner.meta;
        write_metadata(&mut inner.file, drained)?;
        if inner.sync {
            inner.file.sync_data()?;
        }

        inner.meta = Metadata::fresh();
        let fresh = inner.meta;
        write_metadata(&mut inner.file, fresh)?;
        inner.file.set_len(METADATA_SIZE)?;
        if inner.sync {
            inner.file.sync_data()?;
        }

        debug!("write-ahead log drained and truncated");
        Ok(())
    }

    /// Snapshot of the in-memory metadata.
    pub fn metadata(&self) -> Result<Metadata, WalError> {
        Ok(self.lock()?.meta)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, WalError> {
        self.inner
            .lock()
            .map_err(|_| WalError::Io(io::Error::new(io::ErrorKind::Other, "wal mutex poisoned")))
    }
}

fn read_metadata(file: &mut File) -> Result<Metadata, WalError> {
    file.seek(SeekFrom::Start(0))?;
    let offset = file.read_u64::<BigEndian>()?;
    let watermark = file.read_u64::<BigEndian>()?;
    Ok(Metadata { offset, watermark })
}

fn write_metadata(file: &mut File, meta: Metadata) -> Result<(), WalError> {
    file.seek(SeekFrom::Start(0))?;
    file.write_u64::<BigEndian>(meta.offset)?;
    file.write_u64::<BigEndian>(meta.watermark)?;
    file.flush()?;
    Ok(())
}

/// Reads the record starting at `pos`; the file cursor is already there.
/// `limit` is the metadata offset, past which nothing may be consumed.
fn read_record(file: &mut File, pos: u64, limit: u64) -> Result<(Record, u64), WalError> {
    if pos + RECORD_HEADER_SIZE as u64 > limit {
        return Err(WalError::Truncated);
    }

    let mut header = [0u8; RECORD_HEADER_SIZE];
    file.read_exact(&mut header).map_err(eof_as_truncated)?;

    let op = Op::from_u8(header[0])?;
    let mut lengths = &header[1..];
    let key_len = lengths.read_u32::<BigEndian>()? as u64;
    let value_len = lengths.read_u32::<BigEndian>()? as u64;

    let end = pos + RECORD_HEADER_SIZE as u64 + key_len + value_len;
    if end > limit {
        return Err(WalError::Truncated);
    }

    let mut key = vec![0u8; key_len as usize];
    file.read_exact(&mut key).map_err(eof_as_truncated)?;
    let mut value = vec![0u8; value_len as usize];
    file.read_exact(&mut value).map_err(eof_as_truncated)?;

    Ok((Record { op, key, value }, end))
}

fn eof_as_truncated(e: io::Error) -> WalError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        WalError::Truncated
    } else {
        WalError::Io(e)
    }
}
