use std::io::Write;
use std::sync::Arc;

use crate::compression::{pool_with_level, CodecPool, Compressor, Encoding};
use crate::metered::MeteredWriter;
use crate::page::{marshal_page, DataHeader};
use crate::Result;

/// The compressor a sink holds, returned to its pool on release or drop.
struct CompressorLease {
    pool: Arc<CodecPool>,
    compressor: Option<Compressor>,
}

impl CompressorLease {
    fn checkout(&mut self) -> Result<&mut Compressor> {
        self.pool.checkout_writer(&mut self.compressor)
    }

    fn release(&mut self) {
        if let Some(compressor) = self.compressor.take() {
            self.pool.put_writer(compressor);
        }
    }
}

impl Drop for CompressorLease {
    fn drop(&mut self) {
        self.release();
    }
}

/// Compresses finished units and writes them to the block as
/// `[u32 length][header][compressed]`.
///
/// Each unit is compressed in full into `compressed` before anything reaches
/// the sink, so the length prefix is known when it is written. Dropping the
/// sink without `complete` still returns the compressor to the pool.
pub(crate) struct PageSink<W: Write> {
    output: MeteredWriter<W>,
    lease: CompressorLease,
    compressed: Vec<u8>,
    header: DataHeader,
}

impl<W: Write> PageSink<W> {
    pub(crate) fn new(sink: W, encoding: Encoding, level: i32) -> Result<Self> {
        let pool = pool_with_level(encoding, level)?;
        let compressor = Some(pool.get_writer()?);
        Ok(Self {
            output: MeteredWriter::new(sink),
            lease: CompressorLease { pool, compressor },
            compressed: Vec::new(),
            header: DataHeader,
        })
    }

    /// Writes one unit; returns its size on disk.
    pub(crate) fn emit(&mut self, uncompressed: &[u8]) -> Result<usize> {
        let compressor = self.lease.checkout()?;
        compressor.compress(uncompressed, &mut self.compressed)?;

        let before = self.output.bytes_written();
        marshal_page(&self.compressed, &self.header, &mut self.output)?;
        let written = (self.output.bytes_written() - before) as usize;

        log::trace!(
            "emitted page: {} bytes uncompressed, {} bytes on disk",
            uncompressed.len(),
            written
        );
        Ok(written)
    }

    pub(crate) fn complete(&mut self) -> Result<()> {
        self.output.flush()?;
        self.lease.release();
        Ok(())
    }

    pub(crate) fn bytes_written(&self) -> u64 {
        self.output.bytes_written()
    }

    pub(crate) fn get_ref(&self) -> &W {
        self.output.get_ref()
    }

    pub(crate) fn into_inner(mut self) -> Result<W> {
        self.complete()?;
        Ok(self.output.into_inner())
    }
}
