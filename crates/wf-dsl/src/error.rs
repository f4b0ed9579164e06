use std::ops::Range;
use std::path::PathBuf;

use wf_core::TokenId;

/// A syntax error found while parsing the token sequence.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// Human-readable description.
    pub message: String,
    /// Line the error is reported against (the opening line for unbalanced delimiters).
    pub line: usize,
    /// Token the error points at, when there is one.
    pub token: Option<TokenId>,
}

impl ParseError {
    /// Create a parse error.
    pub fn new(message: impl Into<String>, line: usize, token: Option<TokenId>) -> Self {
        Self {
            message: message.into(),
            line,
            token,
        }
    }
}

/// Errors that abort [`WorldFile::load`](crate::WorldFile::load).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The worldfile could not be found on the search path.
    #[error("cannot find worldfile \"{}\"", .0.display())]
    NotFound(PathBuf),

    /// The worldfile exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A malformed token, unterminated string, or bad include.
    #[error("{}:{line}: {message}", path.display())]
    Lex {
        /// File the error occurred in.
        path: PathBuf,
        /// Source-map index of that file, if it was registered.
        file: Option<usize>,
        /// 1-based line.
        line: usize,
        /// Byte range within the file.
        span: Range<usize>,
        /// Human-readable description.
        message: String,
    },

    /// Unbalanced delimiters or a malformed statement.
    #[error("{}: {error}", path.display())]
    Parse {
        /// The loaded worldfile.
        path: PathBuf,
        /// What went wrong.
        error: ParseError,
    },
}

/// Errors returned by [`WorldFile::save`](crate::WorldFile::save).
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// No path was given and nothing has been loaded.
    #[error("no filename to save to")]
    NoFilename,

    /// Writing or publishing the output failed; the destination is untouched.
    #[error("cannot write {}: {source}", path.display())]
    Io {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
