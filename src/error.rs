//! Error and result types for this crate.

use thiserror::Error;

/// Everything that can go wrong reading, writing, or manipulating MCPL files.
#[derive(Debug, Error)]
pub enum Error {
    /// Wraps an underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The header could not be parsed: bad magic, an unsupported version,
    /// a bad endianness marker, a length-prefix overflow, or simply not
    /// enough bytes.
    #[error("invalid MCPL header: {0}")]
    InvalidHeader(String),

    /// A read stopped short of the number of bytes the format promised.
    #[error("truncated read: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes the caller asked for.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// The file's particle count does not match what its size implies.
    ///
    /// `recoverable` is `false` for gzip-compressed input, since the true
    /// extent of a gzip stream cannot be determined without decompressing
    /// the whole thing, which [`crate::tool::repair`] will not do.
    #[error("file was not closed properly (recoverable: {recoverable})")]
    UnclosedFile {
        /// Whether recovery is possible for the transport this came from.
        recoverable: bool,
    },

    /// Two or more files cannot be combined as requested.
    #[error("incompatible merge: {0}")]
    IncompatibleMerge(String),

    /// The caller asked for a configuration that cannot be satisfied.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// [`crate::tool::repair`] was asked to fix a file that isn't broken.
    #[error("file is not broken, nothing to repair")]
    NotBroken,

    /// A reader was asked to skip to a particle index behind its cursor.
    #[error("cannot skip backward (at {from}, requested {to})")]
    BackwardSkip {
        /// Current particle index.
        from: u64,
        /// Requested particle index.
        to: u64,
    },

    /// An operation that requires a seekable transport was attempted on one
    /// that isn't (e.g. a gzip stream).
    #[error("operation requires a seekable transport")]
    NotSeekable,
}

/// A `Result` with [`Error`] as its error variant.
pub type Result<T> = std::result::Result<T, Error>;
