//! # shapewire
//!
//! Format-agnostic serialization built on one structural description per type.
//!
//! ## What is a shape?
//!
//! A type implements [`Shape`] once, describing itself as a sequence of grammar
//! calls: scalars, strings, objects, tuples, lists, maps, optionals, variants
//! and binary blocks. That single description is then driven through any
//! [`Transcoder`]:
//!
//! - [`BinaryEncoder`] / [`BinaryDecoder`]: a compact little-endian wire format
//!   (see [`format`])
//! - [`DebugEncoder`]: an indented human-readable dump
//! - [`RandomGenerator`]: seeded random values for testing
//! - [`ValueEncoder`] / [`ValueDecoder`]: a dynamic [`Value`] tree
//! - [`Recorder`]: a [`Schema`] token list, which can later [`replay`] bytes
//!   without the original type
//!
//! ## Key Features
//!
//! - **One description**: no separate serialize and deserialize impls
//! - **Trivial packing**: plain records are laid out at native alignment, so
//!   whole arrays of them can be copied in bulk ([`PodVec`])
//! - **Schemas**: recorded token lists are values themselves, can be stored,
//!   compared and fingerprinted
//! - **Chunk files**: labelled, type-checked containers ([`chunk`])
//!
//! ## Quick Start
//!
//! ```rust
//! use shapewire::{from_bytes, shape_object, to_bytes, to_debug_string};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct User {
//!     id: u32,
//!     name: String,
//!     active: bool,
//! }
//! shape_object!(User { id, name, active });
//!
//! let mut user = User { id: 123, name: "Alice".to_string(), active: true };
//!
//! let bytes = to_bytes(&mut user).unwrap();
//! assert_eq!(bytes, vec![123, 0, 0, 0, b'A', b'l', b'i', b'c', b'e', 0, 1]);
//!
//! let back: User = from_bytes(&bytes).unwrap();
//! assert_eq!(back, user);
//!
//! assert_eq!(
//!     to_debug_string(&mut user),
//!     "{\n  id: 123\n  name: \"Alice\"\n  active: true\n}\n"
//! );
//! ```
//!
//! ### Replaying a Schema
//!
//! A schema recorded from a type can decode that type's bytes on its own:
//!
//! ```rust
//! use shapewire::{to_bytes, transcode_to_value, Schema, Value};
//!
//! let schema = Schema::of::<Vec<(u8, String)>>();
//! let bytes = to_bytes(&mut vec![(1u8, "one".to_string())]).unwrap();
//!
//! let value = transcode_to_value(&schema, &bytes).unwrap();
//! assert_eq!(
//!     value,
//!     Value::Array(vec![Value::Array(vec![Value::from(1u8), Value::from("one")])])
//! );
//! ```
//!
//! ## Errors and Panics
//!
//! Malformed input and mismatched schemas are reported as [`Error`]. A shape
//! description that breaks the grammar (mismatched begin/end calls, a
//! variant arm offered twice) is a bug in that description and panics with a
//! message starting with `grammar violation`.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade: failed decodes at `debug`,
//! replay steps and chunk records at `trace`.

pub mod chunk;
pub mod de;
pub mod debug;
pub mod error;
pub mod format;
pub mod grammar;
pub mod macros;
pub mod map;
pub mod options;
pub mod random;
pub mod replay;
pub mod schema;
pub mod ser;
pub mod shape;
pub mod value;

pub use chunk::{Chunk, ChunkReader, ChunkWriter, FILE_MARKER};
pub use de::BinaryDecoder;
pub use debug::DebugEncoder;
pub use error::{Error, Result};
pub use grammar::{
    align_up, block_align, Region, RegionStack, Scalar, ScalarKind, Transcoder, TrivialLayout,
};
pub use map::ValueMap;
pub use options::{DebugOptions, RandomOptions};
pub use random::RandomGenerator;
pub use replay::{replay, transcode_from_value, transcode_to_debug, transcode_to_value};
pub use schema::{Recorder, Schema, Token, MAX_RECORD_DEPTH};
pub use ser::BinaryEncoder;
pub use shape::{ByteArray, Bytes, MapKey, PodVec, Shape};
pub use value::{Number, Value, ValueDecoder, ValueEncoder};

use std::io;

/// Encode any `T: Shape` to bytes.
///
/// # Examples
///
/// ```rust
/// use shapewire::to_bytes;
///
/// let bytes = to_bytes(&mut (1u8, "x".to_string())).unwrap();
/// assert_eq!(bytes, vec![1, b'x', 0]);
/// ```
///
/// # Errors
///
/// Returns an error if a string contains a NUL byte.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_bytes<T>(value: &mut T) -> Result<Vec<u8>>
where
    T: ?Sized + Shape,
{
    let mut encoder = BinaryEncoder::new();
    value.shape(&mut encoder)?;
    Ok(encoder.into_inner())
}

/// Encode any `T: Shape` into a writer.
///
/// # Errors
///
/// Returns an error if encoding fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, T>(mut writer: W, value: &mut T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Shape,
{
    let bytes = to_bytes(value)?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Decode an instance of `T` from bytes.
///
/// The whole input must be consumed.
///
/// # Examples
///
/// ```rust
/// use shapewire::{from_bytes, Error};
///
/// let value: (u8, String) = from_bytes(&[1, b'x', 0]).unwrap();
/// assert_eq!(value, (1, "x".to_string()));
///
/// let err = from_bytes::<u8>(&[1, 2]).unwrap_err();
/// assert_eq!(err, Error::TrailingBytes { offset: 1, count: 1 });
/// ```
///
/// # Errors
///
/// Returns an error if the input is truncated, malformed, or longer than
/// one value.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_bytes<T>(bytes: &[u8]) -> Result<T>
where
    T: Shape + Default,
{
    let mut decoder = BinaryDecoder::new(bytes);
    let mut value = T::default();
    let result = value.shape(&mut decoder).and_then(|()| decoder.finish());
    if let Err(err) = &result {
        log::debug!("decoding {} bytes failed: {err}", bytes.len());
    }
    result.map(|()| value)
}

/// Decode an instance of `T` from an I/O stream.
///
/// # Examples
///
/// ```rust
/// use shapewire::from_reader;
/// use std::io::Cursor;
///
/// let value: Vec<u16> = from_reader(Cursor::new(vec![1, 0, 0, 0, 0, 0, 0, 0, 9, 0])).unwrap();
/// assert_eq!(value, vec![9]);
/// ```
///
/// # Errors
///
/// Returns an error if reading fails or the bytes do not decode as `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R, T>(mut reader: R) -> Result<T>
where
    R: io::Read,
    T: Shape + Default,
{
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    from_bytes(&bytes)
}

/// Render any `T: Shape` as indented debug text.
///
/// # Examples
///
/// ```rust
/// use shapewire::to_debug_string;
///
/// assert_eq!(to_debug_string(&mut Some(3u8)), "some 3\n");
/// ```
#[must_use]
pub fn to_debug_string<T>(value: &mut T) -> String
where
    T: ?Sized + Shape,
{
    to_debug_string_with_options(value, DebugOptions::default())
}

/// Render any `T: Shape` as debug text with custom options.
///
/// The debug encoder itself never fails. If the shape function returns an
/// error, the text rendered up to that point is returned.
#[must_use]
pub fn to_debug_string_with_options<T>(value: &mut T, options: DebugOptions) -> String
where
    T: ?Sized + Shape,
{
    let mut encoder = DebugEncoder::with_options(options);
    match value.shape(&mut encoder) {
        Ok(()) => encoder.into_string(),
        Err(err) => {
            log::debug!("debug dump stopped early: {err}");
            encoder.into_partial_string()
        }
    }
}

/// Convert any `T: Shape` to a [`Value`] tree.
///
/// # Examples
///
/// ```rust
/// use shapewire::{to_value, Value};
///
/// let value = to_value(&mut vec![1u8, 2]).unwrap();
/// assert_eq!(value, Value::Array(vec![Value::from(1u8), Value::from(2u8)]));
/// ```
///
/// # Errors
///
/// Returns an error only if the shape description itself reports one.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_value<T>(value: &mut T) -> Result<Value>
where
    T: ?Sized + Shape,
{
    let mut encoder = ValueEncoder::new();
    value.shape(&mut encoder)?;
    Ok(encoder.into_value())
}

/// Build an instance of `T` from a [`Value`] tree.
///
/// # Examples
///
/// ```rust
/// use shapewire::{from_value, value};
///
/// let pair: (String, u32) = from_value(&value!(["id", 7u32])).unwrap();
/// assert_eq!(pair, ("id".to_string(), 7));
/// ```
///
/// # Errors
///
/// Returns an error if the tree does not have the shape `T` expects or a
/// number does not fit its target type.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_value<T>(value: &Value) -> Result<T>
where
    T: Shape + Default,
{
    let mut decoder = ValueDecoder::new(value);
    let mut result = T::default();
    result.shape(&mut decoder)?;
    Ok(result)
}

/// Generate a random instance of `T`.
///
/// # Examples
///
/// ```rust
/// use shapewire::{random_value, RandomOptions};
///
/// let options = RandomOptions::new().with_seed(1).with_max_len(4);
/// let values: Vec<u64> = random_value(&options).unwrap();
/// assert!(values.len() <= 4);
/// ```
///
/// # Errors
///
/// Returns an error only if the shape description itself reports one.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn random_value<T>(options: &RandomOptions) -> Result<T>
where
    T: Shape + Default,
{
    let mut generator = RandomGenerator::new(options.clone());
    let mut value = T::default();
    value.shape(&mut generator)?;
    Ok(value)
}
