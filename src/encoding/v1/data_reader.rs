use std::sync::Arc;

use crate::backend::{ContextReader, ReadContext};
use crate::compression::{pool_for, CodecPool, Decompressor, Encoding};
use crate::encoding;
use crate::page::{unmarshal_page_from_bytes, unmarshal_page_from_reader, DataHeader, Page};
use crate::record::{self, Record};
use crate::{Error, Result};

/// Reads compressed units and returns their decompressed contents.
pub struct DataReader<R> {
    source: R,
    pool: Arc<CodecPool>,
    decompressor: Option<Decompressor>,
    // one output buffer per record slot; slots beyond `live` are kept for reuse
    pages: Vec<Vec<u8>>,
    live: usize,
    next_page: Vec<u8>,
}

impl<R: ContextReader> DataReader<R> {
    pub fn new(source: R, encoding: Encoding) -> Result<Self> {
        let pool = pool_for(encoding)?;
        Ok(Self {
            source,
            pool,
            decompressor: None,
            pages: Vec::new(),
            live: 0,
            next_page: Vec::new(),
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.pool.encoding()
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    fn ensure_slots(&mut self, count: usize) {
        if self.pages.len() < count {
            let grown = count.max(self.pages.len() * 2);
            self.pages.resize_with(grown, Vec::new);
        }
        self.live = count;
    }
}

fn fetch_span<R: ContextReader>(
    source: &R,
    ctx: &ReadContext,
    records: &[Record],
    buffer: &mut Vec<u8>,
) -> Result<()> {
    if let Err(err) = record::validate_contiguous(records) {
        log::warn!("rejecting record list of {} entries: {err}", records.len());
        return Err(err);
    }
    // rejected and cancelled reads leave the buffer as it was
    ctx.check()?;
    let span = record::span(records);
    buffer.clear();
    let Some(start) = record::span_start(records) else {
        return Ok(());
    };
    buffer.resize(span, 0);
    let got = source.read_at(ctx, buffer, start)?;
    if got != span {
        return Err(Error::ShortRead {
            offset: start,
            wanted: span,
            got,
        });
    }
    Ok(())
}

impl<R: ContextReader> encoding::DataReader for DataReader<R> {
    fn read<'a>(
        &'a mut self,
        ctx: &ReadContext,
        records: &[Record],
        buffer: &mut Vec<u8>,
    ) -> Result<Vec<&'a [u8]>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        fetch_span(&self.source, ctx, records, buffer)?;
        let units = record::slice_records(records, buffer)?;

        self.ensure_slots(units.len());
        for (unit, output) in units.iter().zip(self.pages.iter_mut()) {
            if unit.is_empty() {
                output.clear();
                continue;
            }
            let page = unmarshal_page_from_bytes(unit, &mut DataHeader)?.ok_or_else(|| {
                Error::CorruptPage(format!("record of {} bytes has no length prefix", unit.len()))
            })?;
            let decompressor = self.pool.checkout_reader(&mut self.decompressor)?;
            decompressor.decompress(page.data, output)?;
        }
        log::trace!("decoded {} pages from {} bytes", units.len(), buffer.len());

        Ok(self.pages[..self.live].iter().map(Vec::as_slice).collect())
    }

    fn next_page<'a>(&'a mut self, buffer: &mut Vec<u8>) -> Result<Option<Page<'a>>> {
        let source = self.source.reader()?;
        let Some(unit) = unmarshal_page_from_reader(source, &mut DataHeader, buffer)? else {
            return Ok(None);
        };
        let total_length = unit.total_length;
        let decompressor = self.pool.checkout_reader(&mut self.decompressor)?;
        decompressor.decompress(unit.data, &mut self.next_page)?;
        Ok(Some(Page {
            data: &self.next_page,
            total_length,
        }))
    }
}

impl<R> Drop for DataReader<R> {
    fn drop(&mut self) {
        if let Some(decompressor) = self.decompressor.take() {
            self.pool.put_reader(decompressor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryReader;
    use crate::encoding::v1::DataWriter;
    use crate::encoding::{DataReader as _, DataWriter as _};
    use crate::object::objects;

    /// Writes one page per payload and returns the block with its records.
    fn block(encoding: Encoding, payloads: &[&[u8]]) -> (Vec<u8>, Vec<Record>) {
        let mut writer = DataWriter::new(Vec::new(), encoding).expect("writer");
        let mut records = Vec::new();
        let mut offset = 0u64;
        for (i, payload) in payloads.iter().enumerate() {
            writer.write(&[i as u8], payload).expect("write");
            let len = writer.cut_page().expect("cut");
            records.push(Record::new(offset, len as u32));
            offset += len as u64;
        }
        (writer.into_inner().expect("sink"), records)
    }

    #[test]
    fn random_read_decodes_each_record() {
        let (data, records) = block(Encoding::Gzip, &[b"alpha".as_slice(), b"bravo", b"charlie"]);
        let mut reader = DataReader::new(MemoryReader::new(data), Encoding::Gzip).expect("reader");
        let mut buffer = Vec::new();
        let pages = reader
            .read(&ReadContext::background(), &records[1..], &mut buffer)
            .expect("read");
        assert_eq!(pages.len(), 2);
        let first = objects(pages[0]).next().expect("object").expect("decode");
        assert_eq!(first.payload, b"bravo");
        let second = objects(pages[1]).next().expect("object").expect("decode");
        assert_eq!(second.payload, b"charlie");
        assert_eq!(buffer.len(), record::span(&records[1..]));
    }

    #[test]
    fn empty_record_list_touches_nothing() {
        let mut reader = DataReader::new(MemoryReader::default(), Encoding::None).expect("reader");
        let mut buffer = vec![1, 2, 3];
        let pages = reader
            .read(&ReadContext::background(), &[], &mut buffer)
            .expect("read");
        assert!(pages.is_empty());
        assert_eq!(buffer, vec![1, 2, 3]);
    }

    #[test]
    fn records_past_end_of_block_are_short_reads() {
        let (data, records) = block(Encoding::None, &[b"only".as_slice()]);
        let mut reader = DataReader::new(MemoryReader::new(data), Encoding::None).expect("reader");
        let past = [records[0], Record::new(records[0].end().expect("end"), 64)];
        let mut buffer = Vec::new();
        assert!(matches!(
            reader.read(&ReadContext::background(), &past, &mut buffer),
            Err(Error::ShortRead { .. })
        ));
    }

    #[test]
    fn length_prefix_mismatch_is_corrupt() {
        let (data, records) = block(Encoding::Lz4, &[b"one".as_slice(), b"two"]);
        let mut reader = DataReader::new(MemoryReader::new(data), Encoding::Lz4).expect("reader");
        // a record one byte short of the unit disagrees with its prefix
        let short = [Record::new(0, records[0].length - 1)];
        let mut buffer = Vec::new();
        assert!(matches!(
            reader.read(&ReadContext::background(), &short, &mut buffer),
            Err(Error::CorruptPage(_))
        ));
    }

    #[test]
    fn sequential_scan_reports_on_disk_length() {
        let (data, records) = block(Encoding::Zstd, &[b"first".as_slice(), b"second"]);
        let mut reader = DataReader::new(MemoryReader::new(data), Encoding::Zstd).expect("reader");
        let mut buffer = Vec::new();
        for record in &records {
            let page = reader.next_page(&mut buffer).expect("next").expect("page");
            assert_eq!(page.total_length, record.length);
        }
        assert!(reader.next_page(&mut buffer).expect("end").is_none());
    }

    #[test]
    fn empty_records_decode_to_empty_pages() {
        let (data, records) = block(Encoding::Snappy, &[b"one".as_slice(), b"two"]);
        let mut reader = DataReader::new(MemoryReader::new(data), Encoding::Snappy).expect("reader");
        let mut buffer = Vec::new();
        let ctx = ReadContext::background();

        let with_empty = [
            records[0],
            Record::new(999, 0),
            Record::new(records[0].end().expect("end"), 0),
            records[1],
        ];
        let pages = reader.read(&ctx, &with_empty, &mut buffer).expect("read");
        assert_eq!(pages.len(), 4);
        assert!(pages[1].is_empty() && pages[2].is_empty());
        let last = objects(pages[3]).next().expect("object").expect("decode");
        assert_eq!(last.payload, b"two");
        assert_eq!(buffer.len(), record::span(&records));

        let pages = reader
            .read(&ctx, &[Record::new(5, 0)], &mut buffer)
            .expect("only empty records");
        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn failed_read_leaves_buffer_untouched() {
        let (data, records) = block(Encoding::None, &[b"only".as_slice()]);
        let mut reader = DataReader::new(MemoryReader::new(data), Encoding::None).expect("reader");
        let ctx = ReadContext::background();
        ctx.cancel();
        let mut buffer = vec![9u8; 3];
        assert!(matches!(
            reader.read(&ctx, &records, &mut buffer),
            Err(Error::Cancelled)
        ));
        assert_eq!(buffer, vec![9, 9, 9]);
    }
}
