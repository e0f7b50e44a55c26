//! Recoverable error taxonomies.
//!
//! Each error maps to the calculator error number that the builtin layer
//! returns as an error value.

use qc_core::errcode::{self, ErrorCode};
use qc_core::{FileId, Kind, NamedBlockId};

pub mod messages {
    pub const WRONG_ARG_COUNT: &str = "Wrong number of arguments";
}

#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("negative source index for copy")]
    NegativeIndex,
    #[error("destination index too large for copy")]
    DestIndexTooLarge,
    #[error("freed block source for copy")]
    FreedSource,
    #[error("unsuitable source type {0} for copy")]
    BadSourceType(Kind),
    #[error("freed block destination for copy")]
    FreedDest,
    #[error("unsuitable destination type {0} for copy")]
    BadDestType(Kind),
    #[error("cannot copy {from} to {to}")]
    Unsupported { from: Kind, to: Kind },
    #[error("no-copy-from source variable")]
    SourceProtected,
    #[error("no-copy-to destination variable")]
    DestProtected,
    #[error("no-copy-from source named block {0:?}")]
    NamedSourceProtected(NamedBlockId),
    #[error("no-copy-to destination named block {0:?}")]
    NamedDestProtected(NamedBlockId),
    #[error("no-relocate destination for copy")]
    NoRealloc,
    #[error("file {0} not open for copy")]
    FileNotOpen(FileId),
    #[error("source file too large for copy")]
    SourceTooLarge,
    #[error("seek or size failure for copy: {0}")]
    SeekFailed(#[source] FileError),
    #[error("short write for copy: {0}")]
    ShortWrite(#[source] FileError),
    #[error("short read for copy")]
    ShortRead,
}

impl CopyError {
    pub fn code(&self) -> ErrorCode {
        match self {
            CopyError::NegativeIndex => errcode::E_COPY_01,
            CopyError::DestIndexTooLarge => errcode::E_COPY_07,
            CopyError::FreedSource => errcode::E_COPY_08,
            CopyError::BadSourceType(_) => errcode::E_COPY_09,
            CopyError::FreedDest => errcode::E_COPY_10,
            CopyError::BadDestType(_) => errcode::E_COPY_11,
            CopyError::Unsupported { .. } => errcode::E_COPY_12,
            CopyError::SourceProtected => errcode::E_COPY_13,
            CopyError::DestProtected => errcode::E_COPY_14,
            CopyError::NamedSourceProtected(_) => errcode::E_COPY_15,
            CopyError::NamedDestProtected(_) => errcode::E_COPY_16,
            CopyError::NoRealloc => errcode::E_COPY_17,
            CopyError::FileNotOpen(_) => errcode::E_COPYF_1,
            CopyError::SourceTooLarge | CopyError::SeekFailed(_) => errcode::E_COPYF_2,
            CopyError::ShortWrite(_) => errcode::E_COPYF_3,
            CopyError::ShortRead => errcode::E_COPYF_4,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("file {0} is not open")]
    NotOpen(FileId),
    #[error("file {0} is not open for reading")]
    NotReadable(FileId),
    #[error("file {0} is not open for writing")]
    NotWritable(FileId),
    #[error("operation not allowed on standard stream {0}")]
    StdStream(FileId),
    #[error("unrecognized file mode `{0}`")]
    BadMode(String),
    #[error("too many open files")]
    TooManyOpen,
    #[error("a file name is required to reopen file {0}")]
    NameRequired(FileId),
    #[error("bad whence {0} for seek")]
    BadWhence(i64),
    #[error("negative file position")]
    NegativePosition,
    #[error("file position out of range")]
    PositionOutOfRange,
    #[error("ungetc without a preceding read on file {0}")]
    NotReading(FileId),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl FileError {
    pub fn code(&self) -> ErrorCode {
        match self {
            FileError::NotOpen(_) | FileError::StdStream(_) | FileError::NameRequired(_) => {
                errcode::E_REWIND_2
            }
            FileError::NotReadable(_) => errcode::E_FGETS_2,
            FileError::NotWritable(_) => errcode::E_FPUTS_3,
            FileError::BadMode(_) => errcode::E_FOPEN_2,
            FileError::TooManyOpen => errcode::E_MANYOPEN,
            FileError::BadWhence(_) | FileError::NegativePosition => errcode::E_FSEEK_2,
            FileError::PositionOutOfRange => errcode::E_FSEEK_3,
            FileError::NotReading(_) => errcode::E_UNGETC_2,
            FileError::Io(err) => errcode::os_error(err),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("named block `{0}` already exists")]
    NameExists(String),
    #[error("named block `{0}` does not exist")]
    NoSuchName(String),
    #[error("block with id {0:?} does not exist")]
    NoSuchId(NamedBlockId),
    #[error("no-realloc protection prevents resizing or freeing block {0:?}")]
    Protected(NamedBlockId),
    #[error("negative or too-large block length {0}")]
    BadLength(i64),
    #[error("negative or too-large chunk size {0}")]
    BadChunk(i64),
}

impl BlockError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BlockError::NameExists(_) | BlockError::NoSuchName(_) => errcode::E_BLKFREE_1,
            BlockError::NoSuchId(_) => errcode::E_BLKFREE_3,
            BlockError::Protected(_) => errcode::E_BLKFREE_5,
            BlockError::BadLength(_) => errcode::E_BLK_2,
            BlockError::BadChunk(_) => errcode::E_BLK_4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_codes_are_stable() {
        assert_eq!(CopyError::NegativeIndex.code().get(), 10213);
        assert_eq!(CopyError::NoRealloc.code().get(), 10229);
        let e = CopyError::Unsupported { from: Kind::List, to: Kind::Block };
        assert_eq!(e.code().get(), 10224);
        assert_eq!(e.to_string(), "cannot copy list to block");
    }

    #[test]
    fn io_errors_keep_errno() {
        let e = FileError::from(std::io::Error::from_raw_os_error(13));
        assert_eq!(e.code().get(), 13);
    }
}
