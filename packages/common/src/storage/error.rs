use std::fmt;

/// Errors that can occur while placing or reading submission sources.
#[derive(Debug)]
pub enum StorageError {
    /// The uploaded source exceeds the problem's size limit.
    SourceTooLarge { actual: u64, limit: u64 },
    /// The stored source does not exist.
    NotFound(String),
    /// An I/O error occurred.
    Io(std::io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceTooLarge { actual, limit } => {
                write!(f, "Limited source size exceeded ({actual} > {limit} bytes)")
            }
            Self::NotFound(path) => write!(f, "source not found: {path}"),
            Self::Io(err) => write!(f, "storage IO error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
