//! Block storage access used by the data readers.
//!
//! A [`ContextReader`] offers two views of one block: cancellable ranged reads
//! for record lookups and a forward-only stream for full scans.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use memmap2::Mmap;

use crate::{Error, Result};

/// Cancellation and deadline for a ranged read.
///
/// Clones share the cancellation flag, so a caller can keep one handle and
/// cancel reads running on another.
#[derive(Debug, Clone, Default)]
pub struct ReadContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl ReadContext {
    /// A context that never expires.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fails with `Cancelled` or `DeadlineExceeded` once the read should stop.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.remaining() {
            Some(remaining) if remaining.is_zero() => Err(Error::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

/// Storage access for one block.
pub trait ContextReader {
    /// Reads up to `buf.len()` bytes at `offset`; returns the count read.
    fn read_at(&self, ctx: &ReadContext, buf: &mut [u8], offset: u64) -> Result<usize>;

    /// The block's sequential cursor. Every call returns the same cursor,
    /// positioned after whatever earlier calls consumed.
    fn reader(&mut self) -> Result<&mut dyn Read>;
}

fn copy_at(data: &[u8], buf: &mut [u8], offset: u64) -> usize {
    let Ok(offset) = usize::try_from(offset) else {
        return 0;
    };
    if offset >= data.len() {
        return 0;
    }
    let n = buf.len().min(data.len() - offset);
    buf[..n].copy_from_slice(&data[offset..offset + n]);
    n
}

fn read_forward(data: &[u8], pos: &mut usize, buf: &mut [u8]) -> usize {
    let n = copy_at(data, buf, *pos as u64);
    *pos += n;
    n
}

/// A block held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    data: Vec<u8>,
    pos: usize,
}

impl MemoryReader {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Read for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(read_forward(&self.data, &mut self.pos, buf))
    }
}

impl ContextReader for MemoryReader {
    fn read_at(&self, ctx: &ReadContext, buf: &mut [u8], offset: u64) -> Result<usize> {
        ctx.check()?;
        Ok(copy_at(&self.data, buf, offset))
    }

    fn reader(&mut self) -> Result<&mut dyn Read> {
        Ok(self)
    }
}

/// A block file mapped read-only into memory.
pub struct MmapReader {
    // empty files cannot be mapped
    map: Option<Mmap>,
    pos: usize,
}

impl MmapReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let len = file.metadata()?.len();
        let map = if len == 0 {
            None
        } else {
            Some(unsafe { Mmap::map(&file)? })
        };
        Ok(Self { map, pos: 0 })
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    fn as_slice(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }
}

impl Read for MmapReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.map.as_deref().unwrap_or(&[]);
        Ok(read_forward(data, &mut self.pos, buf))
    }
}

impl ContextReader for MmapReader {
    fn read_at(&self, ctx: &ReadContext, buf: &mut [u8], offset: u64) -> Result<usize> {
        ctx.check()?;
        Ok(copy_at(self.as_slice(), buf, offset))
    }

    fn reader(&mut self) -> Result<&mut dyn Read> {
        Ok(self)
    }
}
