use crate::backend::{ContextReader, ReadContext};
use crate::compression::Encoding;
use crate::encoding::{self, v1};
use crate::page::{unmarshal_page_from_bytes, DataHeader, Page};
use crate::record::Record;
use crate::{Error, Result};

/// Reads paged blocks by stripping the inner page envelope from whatever the
/// wrapped reader decompresses.
pub struct DataReader<D> {
    inner: D,
}

impl<R: ContextReader> DataReader<v1::DataReader<R>> {
    pub fn new(source: R, encoding: Encoding) -> Result<Self> {
        Ok(Self::nested(v1::DataReader::new(source, encoding)?))
    }
}

impl<D: encoding::DataReader> DataReader<D> {
    /// Wraps any reader that yields decompressed units.
    pub fn nested(inner: D) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

fn strip_envelope(unit: &[u8]) -> Result<&[u8]> {
    // empty records decode to empty pages
    if unit.is_empty() {
        return Ok(unit);
    }
    let page = unmarshal_page_from_bytes(unit, &mut DataHeader::default())?.ok_or_else(|| {
        Error::CorruptPage(format!(
            "decompressed page of {} bytes has no envelope",
            unit.len()
        ))
    })?;
    Ok(page.data)
}

impl<D: encoding::DataReader> encoding::DataReader for DataReader<D> {
    fn read<'a>(
        &'a mut self,
        ctx: &ReadContext,
        records: &[Record],
        buffer: &mut Vec<u8>,
    ) -> Result<Vec<&'a [u8]>> {
        let units = self.inner.read(ctx, records, buffer)?;
        units.into_iter().map(strip_envelope).collect()
    }

    fn next_page<'a>(&'a mut self, buffer: &mut Vec<u8>) -> Result<Option<Page<'a>>> {
        let Some(unit) = self.inner.next_page(buffer)? else {
            return Ok(None);
        };
        Ok(Some(Page {
            data: strip_envelope(unit.data)?,
            total_length: unit.total_length,
        }))
    }
}
