use std::io::{self, Write};

/// Counts the bytes that actually reach the wrapped sink.
///
/// Compression APIs report how much uncompressed input they consumed; the
/// on-disk size of a page is only visible at the sink.
#[derive(Debug)]
pub struct MeteredWriter<W> {
    inner: W,
    bytes_written: u64,
}

impl<W: Write> MeteredWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for MeteredWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.bytes_written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
