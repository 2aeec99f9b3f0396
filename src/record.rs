//! Byte ranges inside a block, as produced by the block index.

use crate::{Error, Result};

/// A byte range `[start, start + length)` inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Record {
    pub start: u64,
    pub length: u32,
}

impl Record {
    pub fn new(start: u64, length: u32) -> Self {
        Self { start, length }
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Offset one past the last byte. Fails if the range overflows `u64`.
    pub fn end(&self) -> Result<u64> {
        self.start
            .checked_add(u64::from(self.length))
            .ok_or(Error::RecordOutOfBounds {
                start: self.start,
                length: self.length,
                limit: u64::MAX,
            })
    }
}

/// Total number of bytes covered by `records`.
pub fn span(records: &[Record]) -> usize {
    records.iter().map(|r| r.length as usize).sum()
}

/// Block offset of the first non-empty record, where a ranged read over
/// `records` begins.
pub fn span_start(records: &[Record]) -> Option<u64> {
    records.iter().find(|r| !r.is_empty()).map(|r| r.start)
}

/// Checks that every non-empty record starts where the previous non-empty
/// one ended. Empty records may carry any offset.
pub fn validate_contiguous(records: &[Record]) -> Result<()> {
    let mut previous_end: Option<u64> = None;
    for record in records.iter().filter(|r| !r.is_empty()) {
        let end = record.end()?;
        if let Some(previous_end) = previous_end {
            if record.start != previous_end {
                return Err(Error::NonContiguous {
                    previous_end,
                    record: *record,
                });
            }
        }
        previous_end = Some(end);
    }
    Ok(())
}

/// Splits `buffer` into one sub-slice per record, in record order. Empty
/// records get an empty slice.
///
/// `buffer` holds the bytes of the whole span starting at [`span_start`].
pub fn slice_records<'a>(records: &[Record], buffer: &'a [u8]) -> Result<Vec<&'a [u8]>> {
    let mut pages = Vec::with_capacity(records.len());
    let mut cursor = 0usize;
    for record in records {
        let end = cursor + record.length as usize;
        if end > buffer.len() {
            return Err(Error::RecordOutOfBounds {
                start: cursor as u64,
                length: record.length,
                limit: buffer.len() as u64,
            });
        }
        pages.push(&buffer[cursor..end]);
        cursor = end;
    }
    Ok(pages)
}
