//! Wire Format
//!
//! This module documents the binary format written by [`crate::BinaryEncoder`]
//! and read by [`crate::BinaryDecoder`].
//!
//! # Overview
//!
//! The format carries no type information. A reader must drive the same
//! [`Shape`](crate::Shape) the writer used, or replay a
//! [`Schema`](crate::Schema) recorded from it. Everything else follows from
//! the grammar calls a shape makes.
//!
//! ## Design Philosophy
//!
//! - **Compact**: no field names, no type tags, no per-value headers
//! - **Self-terminating**: dynamic containers end with a sentinel, so no
//!   length has to be known before writing
//! - **Bulk-copyable**: trivial regions have the bytes of the equivalent
//!   C layout, so arrays of plain records can be written in one copy
//!
//! # Primitives
//!
//! | Grammar call | Bytes |
//! |--------------|-------|
//! | `scalar` | Fixed-width little-endian (`i8`..`u64`, `f32`, `f64`) |
//! | `boolean` | One byte, `0x00` or `0x01` |
//! | `string` | UTF-8 bytes followed by `0x00` |
//! | `enumerate` | `u32` index into the label list |
//!
//! Any other boolean byte is an error. Strings cannot contain `0x00`; the
//! encoder rejects them instead of truncating.
//!
//! ```text
//! 7u32      -> 07 00 00 00
//! -1i16     -> FF FF
//! "hi"      -> 68 69 00
//! ```
//!
//! # Containers
//!
//! ## Optional
//!
//! A presence byte (`0x00` absent, `0x01` present), then the payload if
//! present.
//!
//! ## Variant
//!
//! A `u32` arm index, then the payload of that arm only.
//!
//! ## Object and Tuple
//!
//! Members back to back with no prefix, no separators and no names.
//!
//! ## List
//!
//! A list of non-trivial elements writes `0x01` before every element and
//! `0x00` after the last:
//!
//! ```text
//! ["a", "b"] -> 01 61 00 01 62 00 00
//! ```
//!
//! A list of trivial elements writes a `u64` element count and then the
//! elements packed at native alignment. The count is written as zero and
//! patched once the list closes.
//!
//! ```text
//! [(1u8, 2u16), (3, 4)] -> 02 00 00 00 00 00 00 00  01 00 02 00  03 00 04 00
//! ```
//!
//! ## Map
//!
//! Every entry is `0x01`, the key as a string, then the value. A `0x00`
//! closes the map. Entry order is whatever the map iterates in.
//!
//! ```text
//! {"k": 1u8} -> 01 6B 00 01 00
//! ```
//!
//! ## Binary Blocks
//!
//! A binary block is raw memory with an element stride. A variable block
//! writes a `u64` element count followed by `count * stride` bytes. A fixed
//! block has a length known to both sides and writes the bytes alone.
//!
//! # Trivial Regions
//!
//! An object, tuple or list whose shape declares a
//! [`TrivialLayout`](crate::TrivialLayout) is a trivial region. Inside it:
//!
//! - every scalar is padded with zeros to its own size, measured from the
//!   start of the innermost trivial region
//! - a nested trivial record is padded to its alignment before it starts and
//!   to its alignment after its last member
//! - a binary block is aligned to its stride when the stride is a power of
//!   two no larger than 8, and left unaligned otherwise
//!
//! Outside trivial regions nothing is ever padded.
//!
//! ```text
//! { a: 1.5f32, b: 2.5f64, c: 3.5f32 }   (size 24, align 8)
//!
//! 00 00 C0 3F  00 00 00 00      a, then 4 bytes of padding
//! 00 00 00 00 00 00 04 40      b
//! 00 00 60 40  00 00 00 00      c, then tail padding
//! ```
//!
//! Because of this, a list of trivial records encoded one element at a
//! time has exactly the bytes of a [`PodVec`](crate::PodVec) of the same
//! `#[repr(C)]` records copied in bulk, on a little-endian host.
//!
//! # Schemas
//!
//! A [`Schema`](crate::Schema) is itself a [`Shape`](crate::Shape): a list
//! of tokens, each a variant over the 22 token kinds. Schemas therefore
//! travel in this same format and can be stored next to the data they
//! describe.
//!
//! # Chunk Files
//!
//! [`crate::chunk`] wraps encoded values in a labelled container:
//!
//! ```text
//! "SHAPEWR1"
//! [u32 label_len][label][u64 type_hash][u64 data_len][data]
//! [u32 label_len][label][u64 type_hash][u64 data_len][data]
//! ...
//! ```
//!
//! `type_hash` is the schema fingerprint of the stored type.
//!
//! # Error Conditions
//!
//! | Condition | Error |
//! |-----------|-------|
//! | Input ends inside a value | [`Error::UnexpectedEof`](crate::Error::UnexpectedEof) |
//! | String without terminator | [`Error::UnterminatedString`](crate::Error::UnterminatedString) |
//! | Flag byte other than 0 or 1 | [`Error::InvalidFlag`](crate::Error::InvalidFlag) |
//! | Index past the label list | [`Error::IndexOutOfRange`](crate::Error::IndexOutOfRange) |
//! | Bytes left after the value | [`Error::TrailingBytes`](crate::Error::TrailingBytes) |
//! | Schema does not fit the data | [`Error::SchemaMismatch`](crate::Error::SchemaMismatch) |
