uniffi::setup_scaffolding!();

pub mod error;
pub mod io;
pub mod split_file;
pub mod split_file_handle;
pub mod types;

pub use error::{Result, SplitFileError};
pub use io::{AccessMode, ByteSource, FileKind, SourceFile};
pub use split_file::{Chunk, ChunkLines, ChunkWindows, SplitFile};
pub use split_file_handle::SplitFileHandle;
pub use types::{
    AttrValue, Attribute, ChunkWindow, OpenMode, SplitFileOptions, Whence, DEFAULT_CHUNK_SIZE,
};
