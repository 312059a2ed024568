//! Labelled chunk files.
//!
//! A chunk file stores several encoded values side by side. It starts with
//! the 8-byte [`FILE_MARKER`] and is followed by records laid out as
//!
//! ```text
//! [u32 label_len][label bytes][u64 type_hash][u64 data_len][data bytes]
//! ```
//!
//! all little-endian. `type_hash` is the [`Schema::fingerprint`] of the
//! stored type, so reading a chunk back into a different type is caught
//! before any data is decoded. Only `data bytes` pass through the codec.
//!
//! ```rust
//! use shapewire::chunk::{ChunkReader, ChunkWriter};
//!
//! let mut writer = ChunkWriter::new(Vec::new()).unwrap();
//! writer.write("count", &mut 3u32).unwrap();
//! writer.write("names", &mut vec!["a".to_string()]).unwrap();
//! let file = writer.into_inner();
//!
//! let reader = ChunkReader::parse(&file).unwrap();
//! assert_eq!(reader.read::<u32>("count").unwrap(), 3);
//! assert!(reader.read::<u64>("count").is_err());
//! ```

use crate::schema::Schema;
use crate::shape::Shape;
use crate::{from_bytes, to_bytes, Error, Result};
use std::io::Write;

/// Identifies a chunk file ("SHAPEWR1").
pub const FILE_MARKER: [u8; 8] = *b"SHAPEWR1";

/// Appends labelled records to a chunk file.
pub struct ChunkWriter<W: Write> {
    writer: W,
}

impl<W: Write> ChunkWriter<W> {
    /// Writes the file marker and returns a writer positioned after it.
    pub fn new(mut writer: W) -> Result<Self> {
        writer.write_all(&FILE_MARKER)?;
        Ok(ChunkWriter { writer })
    }

    /// Encodes `value` and appends it under `label`.
    pub fn write<T: Shape + Default>(&mut self, label: &str, value: &mut T) -> Result<()> {
        let type_hash = Schema::of::<T>().fingerprint()?;
        let data = to_bytes(value)?;
        self.write_raw(label, type_hash, &data)
    }

    /// Appends an already encoded record.
    pub fn write_raw(&mut self, label: &str, type_hash: u64, data: &[u8]) -> Result<()> {
        let label_len = u32::try_from(label.len())
            .map_err(|_| Error::custom(format!("chunk label of {} bytes is too long", label.len())))?;
        self.writer.write_all(&label_len.to_le_bytes())?;
        self.writer.write_all(label.as_bytes())?;
        self.writer.write_all(&type_hash.to_le_bytes())?;
        self.writer.write_all(&(data.len() as u64).to_le_bytes())?;
        self.writer.write_all(data)?;
        log::trace!(
            "chunk '{label}': {} bytes, type hash {type_hash:#018x}",
            data.len()
        );
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// One record of a chunk file, borrowed from the file bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub label: &'a str,
    pub type_hash: u64,
    pub data: &'a [u8],
}

/// Parsed view over the bytes of a chunk file.
#[derive(Debug)]
pub struct ChunkReader<'a> {
    chunks: Vec<Chunk<'a>>,
}

impl<'a> ChunkReader<'a> {
    /// Checks the file marker and splits the file into records.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let mut cursor = Cursor { bytes, position: 0 };
        let marker = cursor.take(FILE_MARKER.len())?;
        if marker != FILE_MARKER {
            let mut found = [0u8; 8];
            found.copy_from_slice(marker);
            return Err(Error::InvalidMarker(found));
        }

        let mut chunks = Vec::new();
        while cursor.position < bytes.len() {
            let label_len = cursor.u32()? as usize;
            let offset = cursor.position;
            let label = std::str::from_utf8(cursor.take(label_len)?)
                .map_err(|_| Error::InvalidUtf8 { offset })?;
            let type_hash = cursor.u64()?;
            let data_offset = cursor.position;
            let data_len = cursor.u64()?;
            let data_len = usize::try_from(data_len)
                .ok()
                .filter(|len| *len <= cursor.remaining())
                .ok_or(Error::LengthOverflow {
                    offset: data_offset,
                    length: data_len,
                    remaining: cursor.remaining(),
                })?;
            let data = cursor.take(data_len)?;
            log::trace!("chunk '{label}': {data_len} bytes at offset {}", cursor.position - data_len);
            chunks.push(Chunk {
                label,
                type_hash,
                data,
            });
        }
        Ok(ChunkReader { chunks })
    }

    #[must_use]
    pub fn chunks(&self) -> &[Chunk<'a>] {
        &self.chunks
    }

    /// The first record stored under `label`.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&Chunk<'a>> {
        self.chunks.iter().find(|chunk| chunk.label == label)
    }

    /// Decodes the record under `label` after checking its type hash.
    pub fn read<T: Shape + Default>(&self, label: &str) -> Result<T> {
        let chunk = self
            .get(label)
            .ok_or_else(|| Error::MissingChunk(label.to_string()))?;
        let expected = Schema::of::<T>().fingerprint()?;
        if chunk.type_hash != expected {
            return Err(Error::TypeHashMismatch {
                label: label.to_string(),
                expected,
                found: chunk.type_hash,
            });
        }
        from_bytes(chunk.data)
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::eof(self.position, len, self.remaining()));
        }
        let bytes = self.bytes;
        let taken = &bytes[self.position..self.position + len];
        self.position += len;
        Ok(taken)
    }

    fn u32(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn u64(&mut self) -> Result<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }
}
