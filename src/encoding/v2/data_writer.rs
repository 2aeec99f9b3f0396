use std::io::Write;

use crate::compression::Encoding;
use crate::encoding::{self, PageSink};
use crate::object::{ObjectCodec, ObjectWriter};
use crate::page::{marshal_page, DataHeader};
use crate::Result;

/// Writes paged units: the buffered objects are wrapped in a page envelope
/// before compression.
pub struct DataWriter<W: Write, O = ObjectCodec> {
    sink: PageSink<W>,
    buffer: Vec<u8>,
    // staging for the envelope-wrapped page, reused across cuts
    page: Vec<u8>,
    header: DataHeader,
    objects: O,
}

impl<W: Write> DataWriter<W> {
    pub fn new(sink: W, encoding: Encoding) -> Result<Self> {
        Self::with_level(sink, encoding, encoding.default_level())
    }

    pub fn with_level(sink: W, encoding: Encoding, level: i32) -> Result<Self> {
        Self::with_object_writer(sink, encoding, level, ObjectCodec)
    }
}

impl<W: Write, O: ObjectWriter> DataWriter<W, O> {
    pub fn with_object_writer(sink: W, encoding: Encoding, level: i32, objects: O) -> Result<Self> {
        Ok(Self {
            sink: PageSink::new(sink, encoding, level)?,
            buffer: Vec::new(),
            page: Vec::new(),
            header: DataHeader,
            objects,
        })
    }

    /// Bytes currently buffered for the next page.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn bytes_written(&self) -> u64 {
        self.sink.bytes_written()
    }

    pub fn get_ref(&self) -> &W {
        self.sink.get_ref()
    }

    pub fn into_inner(self) -> Result<W> {
        self.sink.into_inner()
    }
}

impl<W: Write, O: ObjectWriter> encoding::DataWriter for DataWriter<W, O> {
    fn write(&mut self, id: &[u8], object: &[u8]) -> Result<usize> {
        self.objects.marshal_object(id, object, &mut self.buffer)
    }

    fn cut_page(&mut self) -> Result<usize> {
        if self.buffer.is_empty() {
            return Ok(0);
        }
        self.page.clear();
        marshal_page(&self.buffer, &self.header, &mut self.page)?;
        let written = self.sink.emit(&self.page)?;
        log::debug!(
            "cut page: {} object bytes, {} bytes on disk",
            self.buffer.len(),
            written
        );
        self.buffer.clear();
        Ok(written)
    }

    fn complete(&mut self) -> Result<()> {
        self.sink.complete()
    }
}
