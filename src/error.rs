use thiserror::Error;

use crate::compression::Encoding;
use crate::record::Record;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt page: {0}")]
    CorruptPage(String),

    #[error("{encoding} decompression failed: {source}")]
    Decompress {
        encoding: Encoding,
        #[source]
        source: std::io::Error,
    },

    #[error("{encoding} compression failed: {source}")]
    Compress {
        encoding: Encoding,
        #[source]
        source: std::io::Error,
    },

    #[error("non-contiguous records requested: previous end {previous_end}, next {record:?}")]
    NonContiguous { previous_end: u64, record: Record },

    #[error("record out of bounds: start {start}, length {length}, limit {limit}")]
    RecordOutOfBounds { start: u64, length: u32, limit: u64 },

    #[error("short read: wanted {wanted} bytes at offset {offset}, got {got}")]
    ShortRead { offset: u64, wanted: usize, got: usize },

    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(Encoding),

    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("unknown block version: {0}")]
    UnknownVersion(String),

    #[error("object too large: {0} bytes")]
    ObjectTooLarge(usize),

    #[error("read cancelled")]
    Cancelled,

    #[error("read deadline exceeded")]
    DeadlineExceeded,

    #[error("invalid config: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
