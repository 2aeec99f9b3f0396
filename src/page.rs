//! Page envelope framing.
//!
//! On disk a page is `[u32 LE total_length][header][payload]`, where
//! `total_length` counts the prefix itself, the header and the payload. The
//! header is pluggable through [`PageHeader`]; the current [`DataHeader`]
//! encodes to zero bytes.

use std::io::{self, Read, Write};

use crate::{Error, Result};

/// Size of the `total_length` prefix.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Per-page metadata stored between the length prefix and the payload.
pub trait PageHeader {
    /// Number of bytes `marshal` writes.
    fn encoded_len(&self) -> usize;

    fn marshal(&self, dst: &mut [u8]) -> Result<()>;

    /// Decodes the header from the start of `src` and returns how many bytes
    /// it occupied.
    fn unmarshal(&mut self, src: &[u8]) -> Result<usize>;
}

/// Header of data pages. Carries no fields yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataHeader;

impl PageHeader for DataHeader {
    fn encoded_len(&self) -> usize {
        0
    }

    fn marshal(&self, _dst: &mut [u8]) -> Result<()> {
        Ok(())
    }

    fn unmarshal(&mut self, _src: &[u8]) -> Result<usize> {
        Ok(0)
    }
}

/// A decoded envelope: the payload and the length recorded in its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'a> {
    pub data: &'a [u8],
    pub total_length: u32,
}

/// Writes `payload` wrapped in an envelope to `sink`; returns bytes written.
pub fn marshal_page<W, H>(payload: &[u8], header: &H, sink: &mut W) -> Result<usize>
where
    W: Write + ?Sized,
    H: PageHeader + ?Sized,
{
    let header_len = header.encoded_len();
    let total = LENGTH_PREFIX_LEN + header_len + payload.len();
    let total_length = u32::try_from(total).map_err(|_| Error::ObjectTooLarge(total))?;

    sink.write_all(&total_length.to_le_bytes())?;
    if header_len > 0 {
        let mut header_bytes = vec![0u8; header_len];
        header.marshal(&mut header_bytes)?;
        sink.write_all(&header_bytes)?;
    }
    sink.write_all(payload)?;
    Ok(total)
}

/// Decodes an envelope occupying all of `src`.
///
/// Returns `Ok(None)` when `src` is too short to hold a length prefix.
pub fn unmarshal_page_from_bytes<'a, H>(src: &'a [u8], header: &mut H) -> Result<Option<Page<'a>>>
where
    H: PageHeader + ?Sized,
{
    if src.len() < LENGTH_PREFIX_LEN {
        return Ok(None);
    }
    let total_length = read_length(&src[..LENGTH_PREFIX_LEN])?;
    if total_length as usize != src.len() {
        return Err(Error::CorruptPage(format!(
            "length prefix {total_length} does not match page size {}",
            src.len()
        )));
    }
    let data = strip_header(&src[LENGTH_PREFIX_LEN..], header)?;
    Ok(Some(Page { data, total_length }))
}

/// Reads the next envelope from a stream, reusing `buffer` for its body.
///
/// Returns `Ok(None)` when the stream ends before a full length prefix.
pub fn unmarshal_page_from_reader<'b, R, H>(
    src: &mut R,
    header: &mut H,
    buffer: &'b mut Vec<u8>,
) -> Result<Option<Page<'b>>>
where
    R: Read + ?Sized,
    H: PageHeader + ?Sized,
{
    let mut prefix = [0u8; LENGTH_PREFIX_LEN];
    if !read_prefix(src, &mut prefix)? {
        return Ok(None);
    }
    let total_length = read_length(&prefix)?;
    let body_len = total_length as usize - LENGTH_PREFIX_LEN;

    buffer.clear();
    (&mut *src).take(body_len as u64).read_to_end(buffer)?;
    if buffer.len() != body_len {
        return Err(Error::CorruptPage(format!(
            "truncated page: expected {body_len} body bytes, got {}",
            buffer.len()
        )));
    }
    let data = strip_header(buffer.as_slice(), header)?;
    Ok(Some(Page { data, total_length }))
}

fn read_length(prefix: &[u8]) -> Result<u32> {
    let total_length = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
    if (total_length as usize) < LENGTH_PREFIX_LEN {
        return Err(Error::CorruptPage(format!(
            "length prefix {total_length} smaller than the prefix itself"
        )));
    }
    Ok(total_length)
}

fn strip_header<'a, H>(body: &'a [u8], header: &mut H) -> Result<&'a [u8]>
where
    H: PageHeader + ?Sized,
{
    let consumed = header.unmarshal(body)?;
    if consumed > body.len() {
        return Err(Error::CorruptPage(format!(
            "header of {consumed} bytes exceeds page body of {}",
            body.len()
        )));
    }
    Ok(&body[consumed..])
}

// Returns false on a clean or partial end of stream before the prefix is complete.
fn read_prefix<R: Read + ?Sized>(src: &mut R, prefix: &mut [u8; LENGTH_PREFIX_LEN]) -> Result<bool> {
    let mut filled = 0;
    while filled < prefix.len() {
        match src.read(&mut prefix[filled..]) {
            Ok(0) => return Ok(false),
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(true)
}
