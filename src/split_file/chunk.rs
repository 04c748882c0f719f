use std::io::{self, Read, Seek, SeekFrom};

use crate::error::{Result, SplitFileError};
use crate::io::{md5_hex, read_up_to, ByteSource, SourceFile};
use crate::types::{AttrValue, Attribute, ChunkWindow, Whence};

use super::SplitFile;

/// File-like view over one window of a [`SplitFile`].
///
/// The view has no cursor of its own: reads and seeks move the container's
/// file cursor, and `tell` reports that cursor relative to the window start.
/// The window is fixed when the chunk is created. Creating another chunk from
/// the same container closes this one.
pub struct Chunk<'a, F: SourceFile> {
    container: &'a mut SplitFile<F>,
    generation: u64,
    window: ChunkWindow,
}

impl<'a, F: SourceFile> Chunk<'a, F> {
    pub(super) fn new(
        container: &'a mut SplitFile<F>,
        generation: u64,
        window: ChunkWindow,
    ) -> Result<Self> {
        let mut chunk = Chunk {
            container,
            generation,
            window,
        };
        chunk.seek_to(0, Whence::Start)?;
        Ok(chunk)
    }

    pub fn is_closed(&self) -> bool {
        !self.container.is_active(self.generation)
    }

    /// Mark the chunk unusable. The underlying file stays open.
    pub fn close(&mut self) {
        self.container.close_generation(self.generation);
    }

    pub fn window(&self) -> Result<ChunkWindow> {
        self.check_open()?;
        Ok(self.window)
    }

    pub fn index(&self) -> Result<u64> {
        Ok(self.window()?.index)
    }

    pub fn offset(&self) -> Result<u64> {
        Ok(self.window()?.offset)
    }

    pub fn size(&self) -> Result<u64> {
        Ok(self.window()?.size)
    }

    pub fn seekable(&self) -> Result<bool> {
        self.check_open()?;
        self.container.seekable()
    }

    pub fn container(&self) -> Result<&SplitFile<F>> {
        self.check_open()?;
        Ok(&*self.container)
    }

    /// Mutable access to the owning container. Creating a chunk through it
    /// closes this one.
    pub fn container_mut(&mut self) -> Result<&mut SplitFile<F>> {
        self.check_open()?;
        Ok(&mut *self.container)
    }

    /// Hex MD5 digest of the window contents. The cursor is left where it
    /// was.
    pub fn md5(&mut self) -> Result<String> {
        let pos = self.tell()?;
        self.seek_to(0, Whence::Start)?;
        let digest = md5_hex(&mut *self);
        self.seek_to(pos as i64, Whence::Start)?;
        Ok(digest?)
    }

    /// Iterate the lines of the window from its start.
    pub fn lines(&mut self) -> Result<ChunkLines<'_, 'a, F>> {
        self.seek_to(0, Whence::Start)?;
        Ok(ChunkLines { chunk: self })
    }

    /// Window metadata is answered here; anything else is looked up on the
    /// container.
    pub fn attribute(&mut self, attr: Attribute) -> Result<AttrValue> {
        self.check_open()?;
        Ok(match attr {
            Attribute::Size => AttrValue::Int(self.window.size),
            Attribute::Offset => AttrValue::Int(self.window.offset),
            Attribute::BytesRemaining => AttrValue::Int(self.bytes_remaining()?),
            Attribute::Position => AttrValue::Int(self.tell()?),
            Attribute::Eof => AttrValue::Bool(self.bytes_remaining()? == 0),
            Attribute::Closed => AttrValue::Bool(false),
            _ => return self.container.attribute(attr),
        })
    }

    pub fn attribute_named(&mut self, name: &str) -> Result<AttrValue> {
        self.attribute(name.parse()?)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(SplitFileError::Closed);
        }
        Ok(())
    }

    /// Shared cursor relative to the window start. A cursor moved outside the
    /// window through the container is put back at the nearest window edge.
    fn cursor(&mut self) -> Result<u64> {
        let start = self.window.offset;
        let end = self.window.end();
        let absolute = self.container.file.stream_position()?;
        if absolute < start || absolute > end {
            let clamped = absolute.clamp(start, end);
            self.container.file.seek(SeekFrom::Start(clamped))?;
            return Ok(clamped - start);
        }
        Ok(absolute - start)
    }

    fn clamp_limit(&mut self, limit: Option<usize>) -> Result<u64> {
        let remaining = self.bytes_remaining()?;
        Ok(limit.map_or(remaining, |l| (l as u64).min(remaining)))
    }
}

impl<'a, F: SourceFile> ByteSource for Chunk<'a, F> {
    fn read_bytes(&mut self, limit: Option<usize>) -> Result<Vec<u8>> {
        let limit = self.clamp_limit(limit)?;
        Ok(read_up_to(&mut self.container.file, limit)?)
    }

    fn read_line(&mut self, limit: Option<usize>) -> Result<Vec<u8>> {
        let limit = self.clamp_limit(limit)?;
        self.container.read_line_raw(limit)
    }

    fn seek_to(&mut self, delta: i64, whence: Whence) -> Result<u64> {
        self.check_open()?;
        if !self.container.seekable()? {
            return Err(SplitFileError::Io("file is not seekable".to_string()));
        }

        let size = self.window.size;
        let target = match whence {
            Whence::Start => {
                if delta < 0 {
                    return Err(SplitFileError::InvalidSeek(format!(
                        "negative offset {} from window start",
                        delta
                    )));
                }
                (delta as u64).min(size)
            }
            Whence::Current => {
                let pos = self.cursor()?;
                if delta < 0 {
                    pos.checked_sub(delta.unsigned_abs()).ok_or_else(|| {
                        SplitFileError::InvalidSeek(format!(
                            "seeking {} from position {} moves before the window start",
                            delta, pos
                        ))
                    })?
                } else {
                    pos + (delta as u64).min(size - pos)
                }
            }
            Whence::End => {
                if delta >= 0 {
                    size
                } else {
                    size.checked_sub(delta.unsigned_abs()).ok_or_else(|| {
                        SplitFileError::InvalidSeek(format!(
                            "seeking {} from the end of a {} byte window",
                            delta, size
                        ))
                    })?
                }
            }
        };

        self.container
            .file
            .seek(SeekFrom::Start(self.window.offset + target))?;
        Ok(target)
    }

    /// Position relative to the window start. If the shared cursor was moved
    /// outside the window through the container, this seeks it back to the
    /// nearest window edge first.
    fn tell(&mut self) -> Result<u64> {
        self.check_open()?;
        self.cursor()
    }

    fn size(&mut self) -> Result<u64> {
        Chunk::size(self)
    }

    fn bytes_remaining(&mut self) -> Result<u64> {
        let pos = self.tell()?;
        Ok(self.window.size - pos)
    }
}

impl<'a, F: SourceFile> Read for Chunk<'a, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.bytes_remaining()?;
        let n = (buf.len() as u64).min(remaining) as usize;
        if n == 0 {
            return Ok(0);
        }
        self.container.file.read(&mut buf[..n])
    }
}

impl<'a, F: SourceFile> Seek for Chunk<'a, F> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (delta, whence) = match pos {
            SeekFrom::Start(n) => (i64::try_from(n).unwrap_or(i64::MAX), Whence::Start),
            SeekFrom::Current(n) => (n, Whence::Current),
            SeekFrom::End(n) => (n, Whence::End),
        };
        Ok(self.seek_to(delta, whence)?)
    }
}

/// Lines of a chunk, each one cut at the window end.
pub struct ChunkLines<'c, 'a, F: SourceFile> {
    chunk: &'c mut Chunk<'a, F>,
}

impl<'c, 'a, F: SourceFile> Iterator for ChunkLines<'c, 'a, F> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.chunk.read_line(None) {
            Ok(line) if line.is_empty() => None,
            Ok(line) => Some(Ok(line)),
            Err(e) => Some(Err(e)),
        }
    }
}
