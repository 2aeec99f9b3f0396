use std::io::Write;

use crate::compression::Encoding;
use crate::encoding::{self, PageSink};
use crate::object::{ObjectCodec, ObjectWriter};
use crate::Result;

/// Writes legacy units: the buffered objects compressed as-is.
pub struct DataWriter<W: Write, O = ObjectCodec> {
    sink: PageSink<W>,
    buffer: Vec<u8>,
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
            objects,
        })
    }

    pub fn bytes_written(&self) -> u64 {
        self.sink.bytes_written()
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
        let written = self.sink.emit(&self.buffer)?;
        self.buffer.clear();
        Ok(written)
    }

    fn complete(&mut self) -> Result<()> {
        self.sink.complete()
    }
}
