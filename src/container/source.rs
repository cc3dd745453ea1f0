use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;

use crate::foundation::error::{HoloreelError, HoloreelResult};

/// Longest short-string payload the container may carry, in bytes.
const MAX_STRING_LEN: usize = 4096;

/// Backing bytes for a projection container.
///
/// Disk sources open their file handle only while the asset is in use;
/// memory sources are always resident and treat open/close as no-ops.
#[derive(Clone, Debug)]
pub enum StreamSource {
    /// Fully resident container bytes.
    Memory(Arc<[u8]>),
    /// Disk-backed container opened on demand.
    Disk(PathBuf),
}

impl StreamSource {
    /// Wrap an owned byte buffer as an in-memory source.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::Memory(bytes.into())
    }

    /// Reference a container file on disk.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Disk(path.into())
    }

    /// Return `true` for disk-backed sources.
    pub fn is_disk(&self) -> bool {
        matches!(self, Self::Disk(_))
    }
}

enum StreamInner {
    Memory(Cursor<Arc<[u8]>>),
    Disk(BufReader<File>),
}

/// An open, seekable reader over a [`StreamSource`].
///
/// All primitive reads are little-endian, matching the container layout.
pub(crate) struct Stream {
    inner: StreamInner,
    len: u64,
}

impl Stream {
    /// Open a stream over the given source.
    pub(crate) fn open(source: &StreamSource) -> HoloreelResult<Self> {
        match source {
            StreamSource::Memory(bytes) => {
                let len = bytes.len() as u64;
                Ok(Self {
                    inner: StreamInner::Memory(Cursor::new(bytes.clone())),
                    len,
                })
            }
            StreamSource::Disk(path) => {
                let file = File::open(path)?;
                let len = file.metadata()?.len();
                Ok(Self {
                    inner: StreamInner::Disk(BufReader::new(file)),
                    len,
                })
            }
        }
    }

    /// Total stream length in bytes.
    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    /// Current absolute read position.
    pub(crate) fn position(&mut self) -> HoloreelResult<u64> {
        Ok(match &mut self.inner {
            StreamInner::Memory(c) => c.position(),
            StreamInner::Disk(r) => r.stream_position()?,
        })
    }

    /// Seek to an absolute position.
    pub(crate) fn seek(&mut self, pos: u64) -> HoloreelResult<()> {
        match &mut self.inner {
            StreamInner::Memory(c) => c.set_position(pos),
            StreamInner::Disk(r) => {
                r.seek(SeekFrom::Start(pos))?;
            }
        }
        Ok(())
    }

    /// Advance the read cursor by `n` bytes without reading.
    pub(crate) fn skip(&mut self, n: u64) -> HoloreelResult<()> {
        let pos = self.position()?;
        let next = pos
            .checked_add(n)
            .ok_or_else(|| HoloreelError::validation("stream skip overflows position"))?;
        if next > self.len {
            return Err(HoloreelError::validation(format!(
                "stream skip to {next} past end of stream ({})",
                self.len
            )));
        }
        self.seek(next)
    }

    /// Fill `buf` exactly or fail.
    pub(crate) fn read_exact(&mut self, buf: &mut [u8]) -> HoloreelResult<()> {
        match &mut self.inner {
            StreamInner::Memory(c) => c.read_exact(buf)?,
            StreamInner::Disk(r) => r.read_exact(buf)?,
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> HoloreelResult<u8> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    pub(crate) fn read_u16(&mut self) -> HoloreelResult<u16> {
        let mut b = [0u8; 2];
        self.read_exact(&mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    pub(crate) fn read_u32(&mut self) -> HoloreelResult<u32> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    pub(crate) fn read_i32(&mut self) -> HoloreelResult<i32> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(i32::from_le_bytes(b))
    }

    pub(crate) fn read_i64(&mut self) -> HoloreelResult<i64> {
        let mut b = [0u8; 8];
        self.read_exact(&mut b)?;
        Ok(i64::from_le_bytes(b))
    }

    pub(crate) fn read_f32(&mut self) -> HoloreelResult<f32> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(f32::from_le_bytes(b))
    }

    /// Read a length-prefixed UTF-8 short string (`u16` byte length).
    pub(crate) fn read_string(&mut self) -> HoloreelResult<String> {
        let len = usize::from(self.read_u16()?);
        if len > MAX_STRING_LEN {
            return Err(HoloreelError::validation(format!(
                "string length {len} exceeds the {MAX_STRING_LEN}-byte cap"
            )));
        }
        let mut bytes = vec![0u8; len];
        self.read_exact(&mut bytes)?;
        String::from_utf8(bytes)
            .map_err(|_| HoloreelError::validation("string payload is not valid UTF-8"))
    }
}
