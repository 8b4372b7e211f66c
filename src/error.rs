// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// The declared archive could not be opened or holds no master file.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("cannot open archive {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read archive {path:?}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("cannot extract {entry} from {path:?}: {source}")]
    Extract {
        path: PathBuf,
        entry: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no master file (.{}) found in {path:?}", extensions.join(", ."))]
    NoMasterFile {
        path: PathBuf,
        extensions: Vec<String>,
    },
}

/// A single record failed slicing or the validity gate. Never fatal for a file.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecordError {
    #[error("record is {actual} units long, layout needs at least {needed}")]
    Truncated { needed: usize, actual: usize },

    #[error("record has no primary code")]
    MissingCode,

    #[error("record {code} has no display name")]
    MissingName { code: String },

    #[error("code {code:?} is shorter than {min} characters")]
    CodeTooShort { code: String, min: usize },
}

/// The source file itself is unusable; fatal for that source.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("master file {0:?} does not exist")]
    Missing(PathBuf),

    #[error("cannot read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?} holds {bytes} bytes, too short for one {record_size}-byte record")]
    TooShort {
        path: PathBuf,
        bytes: usize,
        record_size: usize,
    },

    #[error("{0:?} contains no lines")]
    Empty(PathBuf),
}

/// Normalization failed outright; the source yields an empty table.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("building {table} batch: {source}")]
    Batch {
        table: &'static str,
        #[source]
        source: arrow::error::ArrowError,
    },
}
