use std::fmt;
use std::path::{Path, PathBuf};

/// Broad class of a fatal failure, as seen by the caller of a series run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Detection,
    Io,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid grid format, fraction, directory or tuning parameter.
    Config(String),
    /// No plausible grid could be located in the reference frame.
    Detection(String),
    /// An image of the series could not be opened or decoded.
    ImageLoad { path: PathBuf, message: String },
    /// Writing an output artifact failed.
    Io { path: PathBuf, message: String },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn detection(message: impl Into<String>) -> Self {
        Self::Detection(message.into())
    }

    pub fn image_load(path: &Path, message: impl fmt::Display) -> Self {
        Self::ImageLoad {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn io(path: &Path, message: impl fmt::Display) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Detection(_) => ErrorKind::Detection,
            Self::ImageLoad { .. } | Self::Io { .. } => ErrorKind::Io,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Detection(msg) => write!(f, "grid detection failed: {msg}"),
            Self::ImageLoad { path, message } => {
                write!(f, "failed to load image {}: {message}", path.display())
            }
            Self::Io { path, message } => {
                write!(f, "failed to write {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_separate_configuration_detection_and_io() {
        assert_eq!(Error::config("bad").kind(), ErrorKind::Configuration);
        assert_eq!(Error::detection("none").kind(), ErrorKind::Detection);
        let load = Error::image_load(Path::new("a.png"), "truncated");
        assert_eq!(load.kind(), ErrorKind::Io);
        assert_eq!(
            load.to_string(),
            "failed to load image a.png: truncated".to_string()
        );
    }
}
