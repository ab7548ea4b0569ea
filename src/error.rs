use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Processing stage in which a per-file failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Walking the working directory for input files
    Discover,
    /// Opening or reading an input file
    Read,
    /// Tokenizing the XML stream
    Parse,
    /// Creating, writing or removing an output file
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Discover => "discover",
            Self::Read => "read",
            Self::Parse => "parse",
            Self::Write => "write",
        };
        f.write_str(name)
    }
}

/// Error types for the tmx-stream library.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path and stage.
    #[error("IO error ({stage}) accessing '{path}': {message}")]
    Io {
        /// Stage that failed
        stage: Stage,
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Malformed XML reported by the tokenizer.
    #[error("Malformed XML in '{path}' at byte {position}: {message}")]
    Xml {
        /// File being tokenized
        path: PathBuf,
        /// Byte offset reported by the tokenizer
        position: u64,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// Invalid glob or regular expression pattern.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The invalid pattern
        pattern: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// JSON serialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// Multiple errors occurred during processing.
    #[error("Multiple errors occurred during processing ({count} errors)")]
    Multiple {
        /// Number of errors
        count: usize,
        /// Collection of errors
        errors: Vec<Error>,
    },
}

impl Error {
    /// Creates an IO error with stage and path context.
    #[must_use]
    pub fn io(stage: Stage, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            stage,
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a malformed XML error.
    #[must_use]
    pub fn xml(path: impl Into<PathBuf>, position: u64, message: impl fmt::Display) -> Self {
        Self::Xml {
            path: path.into(),
            position,
            message: message.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Combines multiple errors into a single error.
    #[must_use]
    pub fn multiple(errors: Vec<Self>) -> Self {
        let count = errors.len();
        Self::Multiple { count, errors }
    }

    /// Returns the file the error is attached to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. } | Self::Xml { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Returns the stage that failed, if the error is tied to a file.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Io { stage, .. } => Some(*stage),
            Self::Xml { .. } => Some(Stage::Parse),
            _ => None,
        }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::InvalidPattern { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("test message");
        assert!(err.is_config());
        assert!(err.to_string().contains("test message"));
        assert_eq!(err.path(), None);
    }

    #[test]
    fn test_io_error_carries_path_and_stage() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::io(Stage::Read, "/tmp/test.tmx", io_err);
        assert!(err.is_io());
        assert_eq!(err.stage(), Some(Stage::Read));
        assert_eq!(err.path(), Some(Path::new("/tmp/test.tmx")));
        assert!(err.to_string().contains("/tmp/test.tmx"));
        assert!(err.to_string().contains("read"));
    }

    #[test]
    fn test_xml_error_is_parse_stage() {
        let err = Error::xml("broken.tmx", 42, "expected `</tu>`");
        assert_eq!(err.stage(), Some(Stage::Parse));
        assert!(err.to_string().contains("byte 42"));
    }

    #[test]
    fn test_multiple_errors() {
        let errors = vec![Error::config("error 1"), Error::config("error 2")];
        let combined = Error::multiple(errors);
        assert!(combined.to_string().contains("2 errors"));
    }

    #[test]
    fn test_invalid_pattern_is_config() {
        let err = Error::invalid_pattern("(", "unclosed group");
        assert!(err.is_config());
    }

    #[test]
    fn test_serialization_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.to_string().contains("Serialization error"));
    }
}
