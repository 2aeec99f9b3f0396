use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use zstd::stream::raw::{InBuffer, Operation, OutBuffer};

use super::Encoding;
use crate::{Error, Result};

/// Upper bound on idle objects kept per free-list.
const MAX_IDLE: usize = 64;
/// Output growth step for streaming zstd decompression.
const ZSTD_CHUNK: usize = 64 * 1024;
/// lz4 cannot expand input by more than this factor.
const LZ4_MAX_RATIO: usize = 255;
/// A 3-byte snappy copy element yields at most 64 bytes.
const SNAPPY_MAX_RATIO: usize = 22;

type PoolKey = (Encoding, i32);

static POOLS: OnceLock<Mutex<HashMap<PoolKey, Arc<CodecPool>>>> = OnceLock::new();

/// Returns the shared pool for `encoding` at its default compression level.
pub fn pool_for(encoding: Encoding) -> Result<Arc<CodecPool>> {
    pool_with_level(encoding, encoding.default_level())
}

/// Returns the shared pool for `encoding` compressing at `level`.
///
/// Unsupported encodings fail here, before any reader or writer exists.
pub fn pool_with_level(encoding: Encoding, level: i32) -> Result<Arc<CodecPool>> {
    if !encoding.is_supported() {
        return Err(Error::UnsupportedEncoding(encoding));
    }
    let pools = POOLS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut pools = pools.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(pool) = pools.get(&(encoding, level)) {
        return Ok(Arc::clone(pool));
    }
    let pool = Arc::new(CodecPool::new(encoding, level)?);
    log::debug!("created codec pool encoding={encoding} level={level}");
    pools.insert((encoding, level), Arc::clone(&pool));
    Ok(pool)
}

/// Free-lists of compressors and decompressors for one encoding.
///
/// Safe to share between threads; a checked-out object is owned by exactly
/// one reader or writer until it is put back.
pub struct CodecPool {
    encoding: Encoding,
    level: i32,
    readers: Mutex<Vec<Decompressor>>,
    writers: Mutex<Vec<Compressor>>,
}

impl CodecPool {
    pub fn new(encoding: Encoding, level: i32) -> Result<Self> {
        if !encoding.is_supported() {
            return Err(Error::UnsupportedEncoding(encoding));
        }
        Ok(Self {
            encoding,
            level,
            readers: Mutex::new(Vec::new()),
            writers: Mutex::new(Vec::new()),
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn get_reader(&self) -> Result<Decompressor> {
        let recycled = self
            .readers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match recycled {
            Some(reader) => Ok(reader),
            None => Decompressor::new(self.encoding),
        }
    }

    /// Prepares `reader` for a new source, dropping any state left by the
    /// previous one.
    pub fn reset_reader(&self, reader: &mut Decompressor) -> Result<()> {
        reader.reset()
    }

    pub fn put_reader(&self, mut reader: Decompressor) {
        if reader.encoding != self.encoding {
            log::warn!(
                "dropping {} decompressor returned to {} pool",
                reader.encoding,
                self.encoding
            );
            return;
        }
        if reader.reset().is_err() {
            return;
        }
        let mut idle = self.readers.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < MAX_IDLE {
            idle.push(reader);
        }
    }

    pub fn get_writer(&self) -> Result<Compressor> {
        let recycled = self
            .writers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        match recycled {
            Some(writer) => Ok(writer),
            None => Compressor::new(self.encoding, self.level),
        }
    }

    pub fn reset_writer(&self, writer: &mut Compressor) -> Result<()> {
        writer.reset()
    }

    pub fn put_writer(&self, mut writer: Compressor) {
        if writer.encoding != self.encoding || writer.level != self.level {
            log::warn!(
                "dropping {} compressor returned to {} pool",
                writer.encoding,
                self.encoding
            );
            return;
        }
        if writer.reset().is_err() {
            return;
        }
        let mut idle = self.writers.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < MAX_IDLE {
            idle.push(writer);
        }
    }

    /// Resets the decompressor held in `slot`, or checks one out if the slot
    /// is empty.
    pub fn checkout_reader<'s>(
        &self,
        slot: &'s mut Option<Decompressor>,
    ) -> Result<&'s mut Decompressor> {
        let reader = match slot.take() {
            Some(mut reader) => {
                self.reset_reader(&mut reader)?;
                reader
            }
            None => self.get_reader()?,
        };
        Ok(slot.insert(reader))
    }

    pub fn checkout_writer<'s>(&self, slot: &'s mut Option<Compressor>) -> Result<&'s mut Compressor> {
        let writer = match slot.take() {
            Some(mut writer) => {
                self.reset_writer(&mut writer)?;
                writer
            }
            None => self.get_writer()?,
        };
        Ok(slot.insert(writer))
    }

    pub fn idle_readers(&self) -> usize {
        self.readers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn idle_writers(&self) -> usize {
        self.writers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

enum DecoderState {
    Passthrough,
    Gzip,
    Lz4,
    Snappy(snap::raw::Decoder),
    Zstd(zstd::stream::raw::Decoder<'static>),
}

/// A pooled decompressor. Each call to [`Decompressor::decompress`] binds it
/// to one complete compressed page.
pub struct Decompressor {
    encoding: Encoding,
    state: DecoderState,
}

impl Decompressor {
    fn new(encoding: Encoding) -> Result<Self> {
        let state = match encoding {
            Encoding::None => DecoderState::Passthrough,
            Encoding::Gzip => DecoderState::Gzip,
            Encoding::Lz4 => DecoderState::Lz4,
            Encoding::Snappy => DecoderState::Snappy(snap::raw::Decoder::new()),
            Encoding::Zstd => DecoderState::Zstd(
                zstd::stream::raw::Decoder::new().map_err(|source| Error::Decompress {
                    encoding,
                    source,
                })?,
            ),
            Encoding::S2 => return Err(Error::UnsupportedEncoding(encoding)),
        };
        Ok(Self { encoding, state })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn reset(&mut self) -> Result<()> {
        if let DecoderState::Zstd(ctx) = &mut self.state {
            ctx.reinit().map_err(|source| Error::Decompress {
                encoding: self.encoding,
                source,
            })?;
        }
        Ok(())
    }

    /// Decompresses all of `src` into `dst`, replacing its contents.
    pub fn decompress(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<usize> {
        dst.clear();
        let encoding = self.encoding;
        let outcome = match &mut self.state {
            DecoderState::Passthrough => {
                dst.extend_from_slice(src);
                Ok(())
            }
            DecoderState::Gzip => GzDecoder::new(src).read_to_end(dst).map(|_| ()),
            DecoderState::Lz4 => lz4_decompress(src, dst),
            DecoderState::Snappy(decoder) => snappy_decompress(decoder, src, dst),
            DecoderState::Zstd(ctx) => zstd_decompress(ctx, src, dst),
        };
        outcome.map_err(|source| Error::Decompress { encoding, source })?;
        Ok(dst.len())
    }
}

enum EncoderState {
    Passthrough,
    Gzip,
    Lz4,
    Snappy(snap::raw::Encoder),
    Zstd(zstd::bulk::Compressor<'static>),
}

/// A pooled compressor producing one self-contained compressed page per call.
pub struct Compressor {
    encoding: Encoding,
    level: i32,
    state: EncoderState,
}

impl Compressor {
    fn new(encoding: Encoding, level: i32) -> Result<Self> {
        let state = match encoding {
            Encoding::None => EncoderState::Passthrough,
            Encoding::Gzip => EncoderState::Gzip,
            Encoding::Lz4 => EncoderState::Lz4,
            Encoding::Snappy => EncoderState::Snappy(snap::raw::Encoder::new()),
            Encoding::Zstd => EncoderState::Zstd(
                zstd::bulk::Compressor::new(level)
                    .map_err(|source| Error::Compress { encoding, source })?,
            ),
            Encoding::S2 => return Err(Error::UnsupportedEncoding(encoding)),
        };
        Ok(Self {
            encoding,
            level,
            state,
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    // Every compress call emits a complete frame, so no codec keeps pending
    // output between pages.
    fn reset(&mut self) -> Result<()> {
        Ok(())
    }

    /// Compresses all of `src` into `dst`, replacing its contents.
    pub fn compress(&mut self, src: &[u8], dst: &mut Vec<u8>) -> Result<usize> {
        dst.clear();
        let encoding = self.encoding;
        let level = self.level;
        let outcome = match &mut self.state {
            EncoderState::Passthrough => {
                dst.extend_from_slice(src);
                Ok(())
            }
            EncoderState::Gzip => gzip_compress(level, src, dst),
            EncoderState::Lz4 => lz4_compress(src, dst),
            EncoderState::Snappy(encoder) => snappy_compress(encoder, src, dst),
            EncoderState::Zstd(ctx) => ctx.compress(src).map(|out| dst.extend_from_slice(&out)),
        };
        outcome.map_err(|source| Error::Compress { encoding, source })?;
        Ok(dst.len())
    }
}

fn invalid_data<E>(err: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, err)
}

fn gzip_compress(level: i32, src: &[u8], dst: &mut Vec<u8>) -> io::Result<()> {
    let level = flate2::Compression::new(level.clamp(0, 9) as u32);
    let mut encoder = GzEncoder::new(std::mem::take(dst), level);
    encoder.write_all(src)?;
    *dst = encoder.finish()?;
    Ok(())
}

// lz4 pages carry their uncompressed size as a u32 LE prefix, the same layout
// as lz4_flex's `compress_prepend_size`, written here into a reused buffer.
fn lz4_compress(src: &[u8], dst: &mut Vec<u8>) -> io::Result<()> {
    let size = u32::try_from(src.len()).map_err(|_| invalid_data("lz4 page exceeds u32"))?;
    dst.extend_from_slice(&size.to_le_bytes());
    dst.resize(4 + lz4_flex::block::get_maximum_output_size(src.len()), 0);
    let written = lz4_flex::block::compress_into(src, &mut dst[4..]).map_err(invalid_data)?;
    dst.truncate(4 + written);
    Ok(())
}

fn lz4_decompress(src: &[u8], dst: &mut Vec<u8>) -> io::Result<()> {
    if src.len() < 4 {
        return Err(invalid_data("lz4 page missing size prefix"));
    }
    let size = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
    let body = &src[4..];
    if size > body.len().saturating_mul(LZ4_MAX_RATIO).saturating_add(16) {
        return Err(invalid_data("lz4 size prefix exceeds maximum ratio"));
    }
    dst.resize(size, 0);
    let written = lz4_flex::block::decompress_into(body, dst).map_err(invalid_data)?;
    if written != size {
        return Err(invalid_data("lz4 page shorter than size prefix"));
    }
    Ok(())
}

fn snappy_compress(encoder: &mut snap::raw::Encoder, src: &[u8], dst: &mut Vec<u8>) -> io::Result<()> {
    dst.resize(snap::raw::max_compress_len(src.len()), 0);
    let written = encoder.compress(src, dst).map_err(invalid_data)?;
    dst.truncate(written);
    Ok(())
}

fn snappy_decompress(decoder: &mut snap::raw::Decoder, src: &[u8], dst: &mut Vec<u8>) -> io::Result<()> {
    let size = snap::raw::decompress_len(src).map_err(invalid_data)?;
    if size > src.len().saturating_mul(SNAPPY_MAX_RATIO).saturating_add(16) {
        return Err(invalid_data("snappy length header exceeds maximum ratio"));
    }
    dst.resize(size, 0);
    let written = decoder.decompress(src, dst).map_err(invalid_data)?;
    dst.truncate(written);
    Ok(())
}

fn zstd_decompress(
    ctx: &mut zstd::stream::raw::Decoder<'static>,
    src: &[u8],
    dst: &mut Vec<u8>,
) -> io::Result<()> {
    let mut input = InBuffer::around(src);
    loop {
        let start = dst.len();
        dst.resize(start + ZSTD_CHUNK, 0);
        let mut output = OutBuffer::around(&mut dst[start..]);
        let hint = ctx.run(&mut input, &mut output)?;
        let written = output.pos();
        dst.truncate(start + written);

        let consumed = input.pos == src.len();
        if consumed && hint == 0 {
            return Ok(());
        }
        if consumed && written == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "truncated zstd frame",
            ));
        }
    }
}
