use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use crate::error::{Result, SplitFileError};
use crate::types::Whence;

/// Size of the blocks used when scanning for line endings or hashing.
pub const READ_BLOCK_SIZE: usize = 8192;

/// File-like capability set shared by the container and its chunks.
///
/// Every implementor can be handed to code that expects a readable,
/// seekable byte stream. The write side is permanently unsupported unless an
/// implementor overrides it.
pub trait ByteSource {
    /// Read up to `limit` bytes, or everything that is left when `limit` is
    /// `None`.
    fn read_bytes(&mut self, limit: Option<usize>) -> Result<Vec<u8>>;

    /// Read a single line (terminator included), stopping after `limit`
    /// bytes.
    fn read_line(&mut self, limit: Option<usize>) -> Result<Vec<u8>>;

    fn seek_to(&mut self, delta: i64, whence: Whence) -> Result<u64>;

    fn tell(&mut self) -> Result<u64>;

    fn size(&mut self) -> Result<u64>;

    fn bytes_remaining(&mut self) -> Result<u64>;

    /// Read lines until exhausted, or until at least `hint` bytes have been
    /// collected.
    fn read_lines(&mut self, hint: Option<usize>) -> Result<Vec<Vec<u8>>> {
        let mut lines = Vec::new();
        let mut total = 0usize;
        loop {
            let line = self.read_line(None)?;
            if line.is_empty() {
                break;
            }
            total += line.len();
            lines.push(line);
            if matches!(hint, Some(h) if h > 0 && total >= h) {
                break;
            }
        }
        Ok(lines)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(SplitFileError::NotSupported("write".to_string()))
    }

    fn write_lines(&mut self, _lines: &[&[u8]]) -> Result<()> {
        Err(SplitFileError::NotSupported("write_lines".to_string()))
    }

    fn truncate(&mut self, _size: Option<u64>) -> Result<u64> {
        Err(SplitFileError::NotSupported("truncate".to_string()))
    }

    fn delete_range(&mut self, _offset: u64, _length: u64) -> Result<()> {
        Err(SplitFileError::NotSupported("delete_range".to_string()))
    }

    fn move_range(&mut self, _src_offset: u64, _length: u64, _dst_offset: u64) -> Result<()> {
        Err(SplitFileError::NotSupported("move_range".to_string()))
    }
}

/// File type as reported by a stat on the open handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Fifo,
    Other,
}

/// Access mode an open handle was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    pub fn can_read(self) -> bool {
        matches!(self, AccessMode::Read | AccessMode::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::ReadWrite)
    }
}

/// Handle a container can own. Size and type are queried on the live handle
/// each time, never cached.
pub trait SourceFile: Read + Seek {
    fn kind(&self) -> io::Result<FileKind>;

    /// `None` when the platform cannot report it.
    fn access_mode(&self) -> io::Result<Option<AccessMode>>;

    fn current_len(&self) -> io::Result<u64>;

    fn write_raw(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn flush_raw(&mut self) -> io::Result<()>;
}

impl SourceFile for File {
    fn kind(&self) -> io::Result<FileKind> {
        let file_type = self.metadata()?.file_type();
        if file_type.is_file() {
            return Ok(FileKind::Regular);
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if file_type.is_fifo() {
                return Ok(FileKind::Fifo);
            }
        }
        Ok(FileKind::Other)
    }

    #[cfg(unix)]
    fn access_mode(&self) -> io::Result<Option<AccessMode>> {
        use nix::fcntl::{fcntl, FcntlArg, OFlag};
        use std::os::unix::io::AsRawFd;

        let flags = fcntl(self.as_raw_fd(), FcntlArg::F_GETFL)?;
        let mode = match OFlag::from_bits_truncate(flags) & OFlag::O_ACCMODE {
            m if m == OFlag::O_WRONLY => AccessMode::Write,
            m if m == OFlag::O_RDWR => AccessMode::ReadWrite,
            _ => AccessMode::Read,
        };
        Ok(Some(mode))
    }

    #[cfg(not(unix))]
    fn access_mode(&self) -> io::Result<Option<AccessMode>> {
        Ok(None)
    }

    fn current_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn write_raw(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(self, buf)
    }

    fn flush_raw(&mut self) -> io::Result<()> {
        Write::flush(self)
    }
}

/// In-memory file, treated as a regular file.
impl SourceFile for Cursor<Vec<u8>> {
    fn kind(&self) -> io::Result<FileKind> {
        Ok(FileKind::Regular)
    }

    fn access_mode(&self) -> io::Result<Option<AccessMode>> {
        Ok(Some(AccessMode::ReadWrite))
    }

    fn current_len(&self) -> io::Result<u64> {
        Ok(self.get_ref().len() as u64)
    }

    fn write_raw(&mut self, buf: &[u8]) -> io::Result<usize> {
        Write::write(self, buf)
    }

    fn flush_raw(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Read until `buf` is full or the reader reports end of file.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read at most `limit` bytes. A short result means end of file.
pub(crate) fn read_up_to<R: Read + ?Sized>(reader: &mut R, limit: u64) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    (&mut *reader).take(limit).read_to_end(&mut out)?;
    Ok(out)
}

/// Read one line of at most `limit` bytes. Bytes read past the line
/// terminator are given back by seeking the reader backwards.
pub(crate) fn read_line_up_to<R: Read + Seek + ?Sized>(
    reader: &mut R,
    limit: u64,
) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();
    let mut block = [0u8; READ_BLOCK_SIZE];
    while (line.len() as u64) < limit {
        let want = (limit - line.len() as u64).min(block.len() as u64) as usize;
        let n = read_full(reader, &mut block[..want])?;
        if n == 0 {
            break;
        }
        if let Some(pos) = block[..n].iter().position(|&b| b == b'\n') {
            line.extend_from_slice(&block[..=pos]);
            let excess = (n - pos - 1) as i64;
            if excess > 0 {
                reader.seek(SeekFrom::Current(-excess))?;
            }
            break;
        }
        line.extend_from_slice(&block[..n]);
        if n < want {
            break;
        }
    }
    Ok(line)
}

/// Line reader for handles that cannot seek back: reads one byte at a time
/// so nothing past the terminator is consumed.
pub(crate) fn read_line_unbuffered<R: Read + ?Sized>(
    reader: &mut R,
    limit: u64,
) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    while (line.len() as u64) < limit {
        if read_full(reader, &mut byte)? == 0 {
            break;
        }
        line.push(byte[0]);
        if byte[0] == b'\n' {
            break;
        }
    }
    Ok(line)
}

/// Hex MD5 digest of everything `reader` yields from its current position.
pub(crate) fn md5_hex<R: Read + ?Sized>(reader: &mut R) -> io::Result<String> {
    let mut context = md5::Context::new();
    let mut block = [0u8; READ_BLOCK_SIZE];
    loop {
        let n = read_full(reader, &mut block)?;
        if n == 0 {
            break;
        }
        context.consume(&block[..n]);
    }
    Ok(format!("{:x}", context.compute()))
}
