use std::io;
use thiserror::Error;

/// The error surface of the storage engine.
///
/// `KeyNotFound` is a normal outcome of `get` and `delete` (the key is
/// absent, or its most recent record is a tombstone). Every other kind is
/// fatal to the in-progress operation; the engine state stays consistent
/// because no metadata advances unless the preceding data write succeeded.
#[derive(Debug, Error)]
pub enum Error {
    /// The key is absent or its newest record is a tombstone.
    #[error("key not found")]
    KeyNotFound,

    /// An SSTable or WAL structure could not be parsed (magic or version
    /// mismatch, unknown operation byte, out-of-bounds metadata).
    #[error("bad format: {0}")]
    BadFormat(String),

    /// An SSTable's trailing CRC did not match the recomputed value.
    #[error("checksum mismatch (stored {stored:#010x}, computed {computed:#010x})")]
    ChecksumMismatch { stored: u32, computed: u32 },

    /// A file ended in the middle of a record.
    #[error("truncated {0}")]
    Truncated(String),

    /// Underlying storage failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The caller passed something the engine cannot accept, such as an
    /// empty key or a zero flush threshold.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<wal::WalError> for Error {
    fn from(e: wal::WalError) -> Self {
        match e {
            wal::WalError::Io(io) => Error::Io(io),
            wal::WalError::Truncated => Error::Truncated("write-ahead log record".into()),
            wal::WalError::BadRecord(byte) => Error::BadFormat(format!(
                "write-ahead log record has unknown operation byte {byte:#04x}"
            )),
            wal::WalError::BadMetadata {
                offset,
                watermark,
                size,
            } => Error::BadFormat(format!(
                "write-ahead log metadata out of bounds \
                 (offset {offset}, watermark {watermark}, size {size})"
            )),
        }
    }
}

impl From<sstable::SsTableError> for Error {
    fn from(e: sstable::SsTableError) -> Self {
        match e {
            sstable::SsTableError::Io(io) => Error::Io(io),
            sstable::SsTableError::BadFormat(msg) => Error::BadFormat(msg),
            sstable::SsTableError::ChecksumMismatch { stored, computed } => {
                Error::ChecksumMismatch { stored, computed }
            }
            sstable::SsTableError::Truncated(what) => {
                Error::Truncated(format!("sstable {what}"))
            }
            sstable::SsTableError::InvalidArgument(msg) => Error::InvalidArgument(msg.into()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
