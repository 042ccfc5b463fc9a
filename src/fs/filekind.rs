use super::FsError;

/// an enum to describe the type of a directory record
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum FileKind {
    /// an regular file
    #[default]
    RegularFile = 0,
    /// a directory
    Directory = 1,
}

impl FileKind {
    /// the column `ls` prints
    pub fn label(self) -> &'static str {
        match self {
            FileKind::RegularFile => "file",
            FileKind::Directory => "dir",
        }
    }
}

/// implement a trait to convert the on-disk byte to [FileKind]
impl TryFrom<u8> for FileKind {
    type Error = FsError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(FileKind::RegularFile),
            1 => Ok(FileKind::Directory),
            other => Err(FsError::Corrupted(format!("unknown record type {other}"))),
        }
    }
}

impl From<FileKind> for u8 {
    fn from(kind: FileKind) -> Self {
        kind as u8
    }
}
