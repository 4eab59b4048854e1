use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum IoError {
    /// File could not be opened or read.
    Read { path: PathBuf, message: String },
    /// File could not be created, written or renamed into place.
    Write { path: PathBuf, message: String },
    /// Malformed CSV, or a row wider than the header.
    Csv { path: PathBuf, message: String },
    /// Cache file is not a JSON object.
    Json { path: PathBuf, message: String },
}

impl IoError {
    pub(crate) fn read(path: &Path, err: impl fmt::Display) -> Self {
        Self::Read { path: path.to_path_buf(), message: err.to_string() }
    }

    pub(crate) fn write(path: &Path, err: impl fmt::Display) -> Self {
        Self::Write { path: path.to_path_buf(), message: err.to_string() }
    }

    pub(crate) fn csv(path: &Path, err: impl fmt::Display) -> Self {
        Self::Csv { path: path.to_path_buf(), message: err.to_string() }
    }

    pub(crate) fn json(path: &Path, err: impl fmt::Display) -> Self {
        Self::Json { path: path.to_path_buf(), message: err.to_string() }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Write { path, message } => write!(f, "cannot write {}: {message}", path.display()),
            Self::Csv { path, message } => write!(f, "{}: invalid CSV: {message}", path.display()),
            Self::Json { path, message } => write!(f, "{}: invalid JSON: {message}", path.display()),
        }
    }
}

impl std::error::Error for IoError {}
