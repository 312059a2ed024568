//! Error types for encoding, decoding and schema replay.
//!
//! Only *data* errors are represented here: truncated buffers, malformed flag
//! bytes, out-of-range indices, schemas that do not fit the stream being
//! replayed. They are recoverable and abort only the call that raised them.
//!
//! Grammar violations (a shape function that mis-nests its begin/end calls)
//! are bugs in the type's shape description, not bad input, and panic
//! immediately instead of producing an `Error`.
//!
//! ## Examples
//!
//! ```rust
//! use shapewire::{from_bytes, Error};
//!
//! // A `u32` needs four bytes.
//! let result: Result<u32, Error> = from_bytes(&[1, 2]);
//! assert!(matches!(result, Err(Error::UnexpectedEof { .. })));
//! ```

use std::fmt;
use thiserror::Error;

/// Represents every recoverable failure the codec can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// A fixed-size read would run past the end of the input
    #[error("Unexpected end of input at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// A boolean byte other than `0x00` or `0x01`
    #[error("Invalid boolean byte {byte:#04x} at offset {offset}")]
    InvalidBool { offset: usize, byte: u8 },

    /// A presence or continuation flag other than `0x00` or `0x01`
    #[error("Invalid {context} flag {byte:#04x} at offset {offset}")]
    InvalidFlag {
        offset: usize,
        byte: u8,
        context: &'static str,
    },

    /// No string terminator before the end of the input
    #[error("Unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    /// String bytes are not valid UTF-8
    #[error("Invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// A string to encode contains the terminator byte
    #[error("String contains an interior NUL byte at position {position}")]
    InteriorNul { position: usize },

    /// Enumerate or variant index outside the declared labels
    #[error("Index {index} out of range for {count} labels ({context})")]
    IndexOutOfRange {
        index: u64,
        count: usize,
        context: &'static str,
    },

    /// A length prefix that cannot fit in the remaining input or in memory
    #[error("Length {length} at offset {offset} exceeds the {remaining} bytes remaining")]
    LengthOverflow {
        offset: usize,
        length: u64,
        remaining: usize,
    },

    /// Input left over after a complete value was decoded
    #[error("{count} trailing bytes after offset {offset}")]
    TrailingBytes { offset: usize, count: usize },

    /// The schema does not describe the stream being replayed
    #[error("Schema mismatch at token {token}: {msg}")]
    SchemaMismatch { token: usize, msg: String },

    /// The value tree does not have the shape the reader expects
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// A stored chunk was written for a different type
    #[error("Type hash mismatch for chunk '{label}': expected {expected:#018x}, found {found:#018x}")]
    TypeHashMismatch {
        label: String,
        expected: u64,
        found: u64,
    },

    /// No chunk with the requested label
    #[error("No chunk labelled '{0}'")]
    MissingChunk(String),

    /// The chunk file does not start with the expected marker
    #[error("Invalid file marker {0:?}")]
    InvalidMarker([u8; 8]),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates an end-of-input error for a read of `needed` bytes at `offset`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shapewire::Error;
    ///
    /// let err = Error::eof(10, 4, 2);
    /// assert!(err.to_string().contains("offset 10"));
    /// ```
    pub fn eof(offset: usize, needed: usize, remaining: usize) -> Self {
        Error::UnexpectedEof {
            offset,
            needed,
            remaining,
        }
    }

    /// Creates a schema mismatch error pointing at token `token`.
    pub fn schema(token: usize, msg: &str) -> Self {
        Error::SchemaMismatch {
            token,
            msg: msg.to_string(),
        }
    }

    /// Creates a type mismatch error when a value tree has the wrong shape.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shapewire::Error;
    ///
    /// let err = Error::type_mismatch("string", "array");
    /// assert!(err.to_string().contains("expected string"));
    /// ```
    pub fn type_mismatch(expected: &str, found: &str) -> Self {
        Error::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Creates an out-of-range index error.
    pub fn index_out_of_range(index: u64, count: usize, context: &'static str) -> Self {
        Error::IndexOutOfRange {
            index,
            count,
            context,
        }
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for file reading/writing failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Returns `true` for errors caused by input that ended too early.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedEof { .. } | Error::UnterminatedString { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
