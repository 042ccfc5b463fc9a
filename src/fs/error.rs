use thiserror::Error;

/// broad class of a failure, what a caller usually branches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    NameCollision,
    CapacityExhausted,
    MalformedInput,
    Structural,
    Device,
}

#[derive(Error, Debug)]
pub enum FsError {
    #[error("'{0}' not found")]
    NotFound(String),
    #[error("directory '{0}' not found")]
    DirectoryNotFound(String),
    #[error("could not find the parent directory of block {0}")]
    ParentNotFound(u16),
    #[error("'{0}' does not have {1} access")]
    PermissionDenied(String, &'static str),
    #[error("'{0}' already exists")]
    AlreadyExists(String),
    #[error("no free blocks available")]
    NoFreeBlocks,
    #[error("no free slot in directory")]
    DirectoryFull,
    #[error("name '{0}' is too long")]
    NameTooLong(String),
    #[error("invalid name '{0}'")]
    InvalidName(String),
    #[error("invalid access rights '{0}', valid digits are 1 to 7")]
    InvalidRights(char),
    #[error("missing access rights")]
    EmptyRights,
    #[error("'{0}' is not a file")]
    NotAFile(String),
    #[error("directory '{0}' is not empty")]
    DirectoryNotEmpty(String),
    #[error("directory '{0}' is the working directory")]
    DirectoryBusy(String),
    #[error("volume is not formatted")]
    Unformatted,
    #[error("block {0} is outside the volume")]
    BlockOutOfRange(usize),
    #[error("buffer of {0} bytes is not one block")]
    BadBufferLength(usize),
    #[error("a volume needs at least 3 blocks, the device has {0}")]
    DeviceTooSmall(usize),
    #[error("volume damaged: {0}")]
    Corrupted(String),
    #[error("encoding failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("decoding failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::NotFound(_) | FsError::DirectoryNotFound(_) | FsError::ParentNotFound(_) => {
                ErrorKind::NotFound
            }
            FsError::PermissionDenied(..) => ErrorKind::PermissionDenied,
            FsError::AlreadyExists(_) => ErrorKind::NameCollision,
            FsError::NoFreeBlocks | FsError::DirectoryFull => ErrorKind::CapacityExhausted,
            FsError::NameTooLong(_)
            | FsError::InvalidName(_)
            | FsError::InvalidRights(_)
            | FsError::EmptyRights => ErrorKind::MalformedInput,
            FsError::NotAFile(_)
            | FsError::DirectoryNotEmpty(_)
            | FsError::DirectoryBusy(_)
            | FsError::Unformatted
            | FsError::Corrupted(_) => ErrorKind::Structural,
            FsError::BlockOutOfRange(_)
            | FsError::BadBufferLength(_)
            | FsError::DeviceTooSmall(_)
            | FsError::Encode(_)
            | FsError::Decode(_)
            | FsError::Io(_) => ErrorKind::Device,
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
