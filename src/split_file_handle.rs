use std::fs::File;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::SplitFileError;
use crate::io::ByteSource;
use crate::split_file::SplitFile;
use crate::types::{ChunkWindow, OpenMode, SplitFileOptions};

/// Split file exported to foreign callers, typically a multipart uploader
/// that pulls one part at a time.
#[derive(uniffi::Object)]
pub struct SplitFileHandle {
    inner: Mutex<SplitFile<File>>,
}

impl SplitFileHandle {
    fn lock(&self) -> Result<MutexGuard<'_, SplitFile<File>>, SplitFileError> {
        self.inner
            .lock()
            .map_err(|_| SplitFileError::Io("split file lock poisoned".to_string()))
    }
}

#[uniffi::export]
impl SplitFileHandle {
    #[uniffi::constructor]
    pub fn new(path: String, chunk_size: u64, mode: String) -> Result<Arc<Self>, SplitFileError> {
        let mode = mode.parse::<OpenMode>()?;
        let split = SplitFile::open(path, SplitFileOptions::with_chunk_size(chunk_size).mode(mode))?;
        Ok(Arc::new(Self {
            inner: Mutex::new(split),
        }))
    }

    pub fn size(&self) -> Result<u64, SplitFileError> {
        self.lock()?.size()
    }

    pub fn len(&self) -> Result<u64, SplitFileError> {
        self.lock()?.len()
    }

    pub fn is_empty(&self) -> Result<bool, SplitFileError> {
        self.lock()?.is_empty()
    }

    pub fn chunk_size(&self) -> Result<u64, SplitFileError> {
        Ok(self.lock()?.chunk_size())
    }

    pub fn chunk_window(&self, index: i64) -> Result<ChunkWindow, SplitFileError> {
        let mut split = self.lock()?;
        let chunk = split.at(index)?;
        chunk.window()
    }

    pub fn chunk_windows(&self) -> Result<Vec<ChunkWindow>, SplitFileError> {
        Ok(self.lock()?.windows()?.collect())
    }

    /// Full contents of chunk `index`; negative indices count from the end.
    pub fn read_chunk(&self, index: i64) -> Result<Vec<u8>, SplitFileError> {
        let mut split = self.lock()?;
        let mut chunk = split.at(index)?;
        chunk.read_bytes(None)
    }

    pub fn chunk_md5(&self, index: i64) -> Result<String, SplitFileError> {
        let mut split = self.lock()?;
        let mut chunk = split.at(index)?;
        chunk.md5()
    }

    pub fn contains_md5(&self, digest: String) -> Result<bool, SplitFileError> {
        self.lock()?.contains_digest(&digest)
    }
}
