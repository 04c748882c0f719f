use std::io;

/// Error type for the library.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum SplitFileError {
    #[error("IO Error: {0}")]
    Io(String),
    #[error("Invalid Configuration: {0}")]
    Config(String),
    #[error("Index Out Of Range: {0}")]
    OutOfRange(String),
    #[error("Invalid Iterator State: {0}")]
    InvalidIteratorState(String),
    #[error("Invalid Seek: {0}")]
    InvalidSeek(String),
    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),
    #[error("I/O operation on closed chunk")]
    Closed,
    #[error("Unsupported Attribute: {0}")]
    UnsupportedAttribute(String),
    #[error("Not Supported: {0}")]
    NotSupported(String),
}

impl From<io::Error> for SplitFileError {
    fn from(e: io::Error) -> Self {
        SplitFileError::Io(e.to_string())
    }
}

impl From<SplitFileError> for io::Error {
    fn from(e: SplitFileError) -> Self {
        let kind = match e {
            SplitFileError::InvalidSeek(_) | SplitFileError::InvalidArgument(_) => {
                io::ErrorKind::InvalidInput
            }
            SplitFileError::NotSupported(_) | SplitFileError::UnsupportedAttribute(_) => {
                io::ErrorKind::Unsupported
            }
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}

pub type Result<T> = std::result::Result<T, SplitFileError>;
