use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SplitFileError};

/// Default chunk size used when none is given (1 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 1 << 20;

/// Reference point for a seek, mirroring the conventional `SEEK_SET`,
/// `SEEK_CUR` and `SEEK_END` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl TryFrom<i32> for Whence {
    type Error = SplitFileError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Whence::Start),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            _ => Err(SplitFileError::InvalidArgument(format!(
                "unknown value for whence: {}",
                value
            ))),
        }
    }
}

/// How the underlying file is (or must be) opened. Only binary read modes
/// are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    #[default]
    Read,
    ReadWrite,
}

impl OpenMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OpenMode::Read => "rb",
            OpenMode::ReadWrite => "rb+",
        }
    }

    pub fn is_writable(self) -> bool {
        self == OpenMode::ReadWrite
    }
}

impl FromStr for OpenMode {
    type Err = SplitFileError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rb" => Ok(OpenMode::Read),
            "rb+" | "r+b" => Ok(OpenMode::ReadWrite),
            _ => Err(SplitFileError::Config(format!(
                "mode must be \"rb\" or \"rb+\", got {:?}",
                s
            ))),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Construction parameters for a [`crate::SplitFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitFileOptions {
    pub chunk_size: u64,
    pub mode: OpenMode,
}

impl Default for SplitFileOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            mode: OpenMode::Read,
        }
    }
}

impl SplitFileOptions {
    pub fn with_chunk_size(chunk_size: u64) -> Self {
        Self {
            chunk_size,
            ..Self::default()
        }
    }

    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(SplitFileError::Config(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// The half-open byte range `[offset, offset + size)` covered by a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Record)]
pub struct ChunkWindow {
    pub index: u64,
    pub offset: u64,
    pub size: u64,
}

impl ChunkWindow {
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Names of the metadata that can be looked up on a container or a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Size,
    Length,
    ChunkSize,
    Offset,
    Iterating,
    BytesRemaining,
    Position,
    Eof,
    Mode,
    Closed,
}

impl FromStr for Attribute {
    type Err = SplitFileError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "size" => Ok(Attribute::Size),
            "length" | "len" => Ok(Attribute::Length),
            "chunk_size" => Ok(Attribute::ChunkSize),
            "offset" => Ok(Attribute::Offset),
            "iterating" => Ok(Attribute::Iterating),
            "bytes_remaining" => Ok(Attribute::BytesRemaining),
            "position" | "tell" => Ok(Attribute::Position),
            "eof" => Ok(Attribute::Eof),
            "mode" => Ok(Attribute::Mode),
            "closed" => Ok(Attribute::Closed),
            _ => Err(SplitFileError::UnsupportedAttribute(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Int(u64),
    Bool(bool),
    Text(String),
    Absent,
}
