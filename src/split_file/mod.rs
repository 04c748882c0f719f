//! Container presenting one file as an ordered sequence of fixed-size chunks.
//!
//! A [`SplitFile`] owns the underlying handle and hands out [`Chunk`] views,
//! one at a time. The file size is read from the live handle on every query,
//! so chunk counts and window boundaries follow a file that grows or shrinks.
//! A chunk that already exists keeps the window it was created with.

mod chunk;


use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Result, SplitFileError};
use crate::io::{
    md5_hex, read_line_unbuffered, read_line_up_to, read_up_to, ByteSource, FileKind, SourceFile,
};
use crate::types::{AttrValue, Attribute, ChunkWindow, OpenMode, SplitFileOptions, Whence};

pub use chunk::{Chunk, ChunkLines};

/// Bookkeeping for the most recently materialized chunk.
#[derive(Debug, Clone, Copy)]
struct ActiveChunk {
    generation: u64,
    window: ChunkWindow,
    closed: bool,
}

#[derive(Debug)]
pub struct SplitFile<F: SourceFile = File> {
    file: F,
    path: Option<PathBuf>,
    chunk_size: u64,
    mode: OpenMode,
    current_offset: Option<u64>,
    iterating: bool,
    active: Option<ActiveChunk>,
    generation: u64,
}

impl SplitFile<File> {
    /// Open the regular file at `path` and split it.
    pub fn open<P: AsRef<Path>>(path: P, options: SplitFileOptions) -> Result<Self> {
        let path = path.as_ref();
        options.validate()?;

        let is_file = fs::metadata(path).map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            return Err(SplitFileError::Config(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(options.mode.is_writable())
            .open(path)?;

        let mut split = SplitFile::new(file, options)?;
        split.path = Some(path.to_path_buf());
        Ok(split)
    }
}

impl<F: SourceFile> SplitFile<F> {
    /// Split an already open handle. The handle must be readable, and
    /// writable too when `options.mode` is [`OpenMode::ReadWrite`].
    pub fn new(mut file: F, options: SplitFileOptions) -> Result<Self> {
        options.validate()?;

        if let Some(access) = file.access_mode()? {
            if !access.can_read() {
                return Err(SplitFileError::Config(
                    "handle is not open for reading".to_string(),
                ));
            }
            if options.mode.is_writable() && !access.can_write() {
                return Err(SplitFileError::Config(format!(
                    "mode {} needs a handle open for writing",
                    options.mode
                )));
            }
        }

        let kind = file.kind()?;
        match kind {
            FileKind::Regular => {
                file.seek(SeekFrom::Start(0))?;
            }
            FileKind::Fifo => debug!("splitting a fifo; the handle is not rewound"),
            FileKind::Other => {
                return Err(SplitFileError::Config(
                    "file type must be a regular file or a fifo".to_string(),
                ))
            }
        }

        Ok(Self {
            file,
            path: None,
            chunk_size: options.chunk_size,
            mode: options.mode,
            current_offset: Some(0),
            iterating: false,
            active: None,
            generation: 0,
        })
    }

    /// Current size of the underlying file in bytes.
    pub fn size(&self) -> Result<u64> {
        Ok(self.file.current_len()?)
    }

    /// Number of chunks the file splits into right now.
    pub fn len(&self) -> Result<u64> {
        Ok(self.size()?.div_ceil(self.chunk_size))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.size()? == 0)
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Offset of the current chunk, `None` before the first step of an
    /// iteration.
    pub fn offset(&self) -> Option<u64> {
        self.current_offset
    }

    pub fn iterating(&self) -> bool {
        self.iterating
    }

    /// Window of the most recently created chunk, if any.
    pub fn active_chunk(&self) -> Option<ChunkWindow> {
        self.active.map(|active| active.window)
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn file(&self) -> &F {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut F {
        &mut self.file
    }

    pub fn into_inner(self) -> F {
        self.file
    }

    /// Position of the underlying file cursor.
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.file.stream_position()?)
    }

    /// Bytes between the underlying file cursor and the end of the file.
    pub fn bytes_remaining(&mut self) -> Result<u64> {
        let size = self.size()?;
        Ok(size.saturating_sub(self.position()?))
    }

    /// Only regular files can seek; a fifo is read strictly forward.
    pub fn seekable(&self) -> Result<bool> {
        Ok(self.file.kind()? == FileKind::Regular)
    }

    /// Random access to chunk `index`. Negative indices count from the end.
    /// Leaves iteration mode and closes the previously active chunk.
    pub fn at(&mut self, index: i64) -> Result<Chunk<'_, F>> {
        self.iterating = false;

        let len = self.len()?;
        let normalized = if index < 0 {
            i64::try_from(len).ok().and_then(|len| index.checked_add(len))
        } else {
            Some(index)
        };
        let index = match normalized {
            Some(i) if i >= 0 && (i as u64) < len => i as u64,
            _ => {
                return Err(SplitFileError::OutOfRange(format!(
                    "index {} out of range for {} chunks",
                    index, len
                )))
            }
        };

        let offset = index * self.chunk_size;
        self.current_offset = Some(offset);
        self.file.seek(SeekFrom::Start(offset))?;
        self.open_chunk()
    }

    /// Start (or restart) forward iteration from the first chunk.
    pub fn begin_iteration(&mut self) -> Result<()> {
        self.close_active();
        self.iterating = true;
        self.current_offset = None;
        self.active = None;
        self.file.seek(SeekFrom::Start(0))?;
        debug!("chunk iteration started");
        Ok(())
    }

    /// Step the iteration: close the current chunk and return the next one,
    /// or `None` once the end of the file is reached.
    pub fn advance(&mut self) -> Result<Option<Chunk<'_, F>>> {
        if !self.iterating {
            return Err(SplitFileError::InvalidIteratorState(
                "iteration has not been started".to_string(),
            ));
        }

        let offset = match self.current_offset {
            None => 0,
            Some(_) => {
                let previous = self.active.ok_or_else(|| {
                    SplitFileError::InvalidIteratorState("no chunk to advance from".to_string())
                })?;
                self.file.seek(SeekFrom::Start(previous.window.end()))?;
                let offset = self.file.stream_position()?;
                self.close_active();
                offset
            }
        };
        self.current_offset = Some(offset);

        if offset >= self.size()? {
            self.iterating = false;
            self.current_offset = None;
            self.active = None;
            debug!("chunk iteration finished at offset {}", offset);
            return Ok(None);
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.open_chunk().map(Some)
    }

    /// Whether any chunk has the same content as `candidate`.
    ///
    /// The candidate is read from its start and its cursor is restored
    /// afterwards. Every chunk of this container is hashed until a match is
    /// found, so this is a full scan of the file.
    pub fn contains<S: Read + Seek + ?Sized>(&mut self, candidate: &mut S) -> Result<bool> {
        let pos = candidate.stream_position()?;
        candidate.seek(SeekFrom::Start(0))?;
        let digest = md5_hex(&mut *candidate);
        candidate.seek(SeekFrom::Start(pos))?;
        let digest = digest?;
        self.contains_digest(&digest)
    }

    /// Same as [`SplitFile::contains`] for a precomputed hex MD5 digest.
    pub fn contains_digest(&mut self, digest: &str) -> Result<bool> {
        warn!("contains is very inefficient: it hashes every chunk");
        self.begin_iteration()?;
        while let Some(mut chunk) = self.advance()? {
            if chunk.md5()?.eq_ignore_ascii_case(digest) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Windows of all chunks for the current file size, without creating
    /// any chunk.
    pub fn windows(&self) -> Result<ChunkWindows> {
        Ok(ChunkWindows {
            next_offset: 0,
            end: self.size()?,
            chunk_size: self.chunk_size,
        })
    }

    pub fn attribute(&mut self, attr: Attribute) -> Result<AttrValue> {
        Ok(match attr {
            Attribute::Size => AttrValue::Int(self.size()?),
            Attribute::Length => AttrValue::Int(self.len()?),
            Attribute::ChunkSize => AttrValue::Int(self.chunk_size),
            Attribute::Offset => self.current_offset.map_or(AttrValue::Absent, AttrValue::Int),
            Attribute::Iterating => AttrValue::Bool(self.iterating),
            Attribute::BytesRemaining => AttrValue::Int(self.bytes_remaining()?),
            Attribute::Position => AttrValue::Int(self.position()?),
            Attribute::Eof => AttrValue::Bool(self.is_eof()?),
            Attribute::Mode => AttrValue::Text(self.mode.to_string()),
            // closing consumes the container
            Attribute::Closed => AttrValue::Bool(false),
        })
    }

    /// Look up metadata by name; unknown names are rejected.
    pub fn attribute_named(&mut self, name: &str) -> Result<AttrValue> {
        self.attribute(name.parse()?)
    }

    pub fn is_eof(&mut self) -> Result<bool> {
        Ok(self.position()? >= self.size()?)
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.file.flush_raw()?)
    }

    pub fn raw_seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.file.seek(pos)?)
    }

    pub fn raw_read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.file.read(buf)?)
    }

    /// Flush pending writes and release the underlying handle.
    pub fn close(mut self) -> Result<()> {
        if self.mode.is_writable() {
            self.file.flush_raw()?;
        }
        debug!("split file closed");
        Ok(())
    }

    /// Line read on the raw handle. Handles that cannot seek back are read a
    /// byte at a time.
    fn read_line_raw(&mut self, limit: u64) -> Result<Vec<u8>> {
        if self.seekable()? {
            Ok(read_line_up_to(&mut self.file, limit)?)
        } else {
            Ok(read_line_unbuffered(&mut self.file, limit)?)
        }
    }

    fn close_active(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.closed = true;
        }
    }

    /// Create the chunk starting at the current offset. The previous chunk,
    /// if any, is closed.
    fn open_chunk(&mut self) -> Result<Chunk<'_, F>> {
        let offset = self.current_offset.ok_or_else(|| {
            SplitFileError::InvalidIteratorState("no current offset".to_string())
        })?;
        let size = self.chunk_size.min(self.bytes_remaining()?);

        self.close_active();
        self.generation += 1;
        let window = ChunkWindow {
            index: offset / self.chunk_size,
            offset,
            size,
        };
        self.active = Some(ActiveChunk {
            generation: self.generation,
            window,
            closed: false,
        });
        debug!(
            "chunk {} materialized at offset {} with size {}",
            window.index, window.offset, window.size
        );

        let generation = self.generation;
        Chunk::new(self, generation, window)
    }

    fn is_active(&self, generation: u64) -> bool {
        matches!(self.active, Some(active) if active.generation == generation && !active.closed)
    }

    fn close_generation(&mut self, generation: u64) {
        if let Some(active) = self.active.as_mut() {
            if active.generation == generation {
                active.closed = true;
            }
        }
    }
}

impl<F: SourceFile> ByteSource for SplitFile<F> {
    fn read_bytes(&mut self, limit: Option<usize>) -> Result<Vec<u8>> {
        let limit = limit.map_or(u64::MAX, |l| l as u64);
        Ok(read_up_to(&mut self.file, limit)?)
    }

    fn read_line(&mut self, limit: Option<usize>) -> Result<Vec<u8>> {
        self.read_line_raw(limit.map_or(u64::MAX, |l| l as u64))
    }

    fn seek_to(&mut self, delta: i64, whence: Whence) -> Result<u64> {
        let pos = match whence {
            Whence::Start => SeekFrom::Start(u64::try_from(delta).map_err(|_| {
                SplitFileError::InvalidSeek(format!("negative absolute offset {}", delta))
            })?),
            Whence::Current => SeekFrom::Current(delta),
            Whence::End => SeekFrom::End(delta),
        };
        self.raw_seek(pos)
    }

    fn tell(&mut self) -> Result<u64> {
        self.position()
    }

    fn size(&mut self) -> Result<u64> {
        SplitFile::size(self)
    }

    fn bytes_remaining(&mut self) -> Result<u64> {
        SplitFile::bytes_remaining(self)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if !self.mode.is_writable() {
            return Err(SplitFileError::NotSupported(format!(
                "write on a file opened with mode {}",
                self.mode
            )));
        }
        Ok(self.file.write_raw(buf)?)
    }
}

impl<F: SourceFile> Read for SplitFile<F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl<F: SourceFile> Seek for SplitFile<F> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

/// Writes pass the same mode check as [`ByteSource::write`].
impl<F: SourceFile> Write for SplitFile<F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(ByteSource::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush_raw()
    }
}

#[cfg(unix)]
impl<F: SourceFile + std::os::unix::io::AsRawFd> std::os::unix::io::AsRawFd for SplitFile<F> {
    fn as_raw_fd(&self) -> std::os::unix::io::RawFd {
        self.file.as_raw_fd()
    }
}

/// Iterator over the windows of a file's chunks, computed from the size at
/// the time it was created.
#[derive(Debug, Clone)]
pub struct ChunkWindows {
    next_offset: u64,
    end: u64,
    chunk_size: u64,
}

impl Iterator for ChunkWindows {
    type Item = ChunkWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_offset >= self.end {
            return None;
        }
        let offset = self.next_offset;
        let size = self.chunk_size.min(self.end - offset);
        self.next_offset = offset + size;
        Some(ChunkWindow {
            index: offset / self.chunk_size,
            offset,
            size,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .end
            .saturating_sub(self.next_offset)
            .div_ceil(self.chunk_size) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChunkWindows {}
