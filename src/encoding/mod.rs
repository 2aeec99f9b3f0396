//! Versioned block encodings.
//!
//! - `v1`: every unit is `[u32 length][compressed objects]`
//! - `v2`: every unit is `[u32 length][compressed [u32 length][header][objects]]`
//!
//! Both versions address units the same way on disk, so one record list and
//! one scan loop work for either; `v2` adds the inner page envelope that can
//! carry per-page metadata.

mod sink;
pub mod v1;
pub mod v2;

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::{ContextReader, ReadContext};
use crate::compression::Encoding;
use crate::page::Page;
use crate::record::Record;
use crate::{Error, Result};

pub(crate) use sink::PageSink;

/// Reads decoded pages out of one block.
pub trait DataReader {
    /// Returns one decoded page per record, in record order.
    ///
    /// Non-empty `records` must be contiguous; empty records decode to empty
    /// pages. The whole span is fetched with a single ranged read into
    /// `buffer`, which afterwards holds exactly the span. A list rejected by
    /// validation or a cancelled context leaves `buffer` unchanged; after a
    /// short read its contents are unspecified.
    fn read<'a>(
        &'a mut self,
        ctx: &ReadContext,
        records: &[Record],
        buffer: &mut Vec<u8>,
    ) -> Result<Vec<&'a [u8]>>;

    /// Returns the next page from the block's sequential cursor, or `None`
    /// at the end of the block. `buffer` holds the raw unit.
    fn next_page<'a>(&'a mut self, buffer: &mut Vec<u8>) -> Result<Option<Page<'a>>>;
}

/// Appends objects to one block, one compressed page at a time.
pub trait DataWriter {
    /// Buffers one object; no I/O. Returns bytes appended to the page buffer.
    fn write(&mut self, id: &[u8], object: &[u8]) -> Result<usize>;

    /// Compresses the buffered objects into a page and writes it to the sink.
    /// Returns the page's size on disk.
    fn cut_page(&mut self) -> Result<usize>;

    /// Flushes the sink and returns codec state to the pool. Idempotent.
    fn complete(&mut self) -> Result<()>;
}

/// Block format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    V1,
    #[default]
    V2,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::V1 => "v1",
            Version::V2 => "v2",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" => Ok(Version::V1),
            "v2" => Ok(Version::V2),
            _ => Err(Error::UnknownVersion(s.to_string())),
        }
    }
}

pub fn new_data_reader<'r, R>(
    version: Version,
    source: R,
    encoding: Encoding,
) -> Result<Box<dyn DataReader + 'r>>
where
    R: ContextReader + 'r,
{
    Ok(match version {
        Version::V1 => Box::new(v1::DataReader::new(source, encoding)?),
        Version::V2 => Box::new(v2::DataReader::new(source, encoding)?),
    })
}

pub fn new_data_writer<'w, W>(
    version: Version,
    sink: W,
    encoding: Encoding,
    level: i32,
) -> Result<Box<dyn DataWriter + 'w>>
where
    W: Write + 'w,
{
    Ok(match version {
        Version::V1 => Box::new(v1::DataWriter::with_level(sink, encoding, level)?),
        Version::V2 => Box::new(v2::DataWriter::with_level(sink, encoding, level)?),
    })
}
