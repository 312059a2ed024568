//! Binary decoding.
//!
//! This module provides the [`BinaryDecoder`], the reading half of the wire
//! format. It mirrors [`crate::BinaryEncoder`] call for call, tracking the same
//! alignment cursor through trivial regions.
//!
//! ## Safety Guarantees
//!
//! - Every read is bounds-checked before it happens
//! - Length prefixes are checked against the remaining input before anything
//!   is allocated
//! - Truncated or malformed input is reported as an [`Error`], never a panic
//!
//! ```rust
//! use shapewire::{from_bytes, Error};
//!
//! let bytes = [2, 0, 0, 0, 0, 0, 0, 0, 7]; // claims two u8s, carries one
//! let result: Result<Vec<u8>, Error> = from_bytes(&bytes);
//! assert!(result.is_err());
//! ```

use crate::grammar::{align_up, block_align, Region, RegionStack, Scalar, Transcoder, TrivialLayout};
use crate::{Error, Result};

/// Per-region decoder state.
#[derive(Debug)]
enum Frame {
    Dense,
    Variant { active: usize },
    Trivial { start: usize, layout: TrivialLayout },
    TrivialList { start: usize, remaining: u64 },
}

impl Frame {
    fn start(&self) -> Option<usize> {
        match self {
            Frame::Trivial { start, .. } | Frame::TrivialList { start, .. } => Some(*start),
            Frame::Dense | Frame::Variant { .. } => None,
        }
    }
}

/// The binary decoder.
///
/// Borrows its input for the duration of one decode call. Call
/// [`BinaryDecoder::finish`] afterwards to reject trailing bytes.
pub struct BinaryDecoder<'de> {
    input: &'de [u8],
    position: usize,
    regions: RegionStack<Frame>,
    trivial_depth: usize,
}

impl<'de> BinaryDecoder<'de> {
    #[must_use]
    pub fn new(input: &'de [u8]) -> Self {
        BinaryDecoder {
            input,
            position: 0,
            regions: RegionStack::new(),
            trivial_depth: 0,
        }
    }

    /// Offset of the next unread byte.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.input.len() - self.position
    }

    /// Checks that every region is closed and the input is fully consumed.
    pub fn finish(self) -> Result<()> {
        self.regions.assert_closed();
        if self.position < self.input.len() {
            return Err(Error::TrailingBytes {
                offset: self.position,
                count: self.remaining(),
            });
        }
        Ok(())
    }

    fn read(&mut self, len: usize) -> Result<&'de [u8]> {
        if len > self.remaining() {
            return Err(Error::eof(self.position, len, self.remaining()));
        }
        let input = self.input;
        let bytes = &input[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.read(4)?);
        Ok(u32::from_le_bytes(bytes))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(self.read(8)?);
        Ok(u64::from_le_bytes(bytes))
    }

    fn read_flag(&mut self, context: &'static str) -> Result<bool> {
        let offset = self.position;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            byte => Err(Error::InvalidFlag {
                offset,
                byte,
                context,
            }),
        }
    }

    fn read_str(&mut self) -> Result<&'de str> {
        let offset = self.position;
        let input = self.input;
        let rest = &input[offset..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::UnterminatedString { offset })?;
        let text = std::str::from_utf8(&rest[..len]).map_err(|_| Error::InvalidUtf8 { offset })?;
        self.position += len + 1;
        Ok(text)
    }

    fn read_index(&mut self, labels: &[&str], context: &'static str) -> Result<usize> {
        let index = self.read_u32()?;
        if index as usize >= labels.len() {
            return Err(Error::index_out_of_range(
                u64::from(index),
                labels.len(),
                context,
            ));
        }
        Ok(index as usize)
    }

    /// Reads a length prefix that announces at least `min_bytes_each` bytes
    /// per element, rejecting it if the input cannot hold that many.
    fn read_len(&mut self, min_bytes_each: usize) -> Result<u64> {
        let offset = self.position;
        let length = self.read_u64()?;
        let needed = length.checked_mul(min_bytes_each as u64);
        match needed {
            Some(needed) if needed <= self.remaining() as u64 => Ok(length),
            _ => Err(Error::LengthOverflow {
                offset,
                length,
                remaining: self.remaining(),
            }),
        }
    }

    /// Skips padding up to `align` within the innermost trivial region.
    fn align_to(&mut self, align: usize) -> Result<()> {
        if self.trivial_depth == 0 {
            return Ok(());
        }
        let start = self
            .regions
            .iter()
            .rev()
            .find_map(|(_, frame)| frame.start())
            .unwrap_or(0);
        self.skip_from(start, align)
    }

    fn skip_from(&mut self, start: usize, align: usize) -> Result<()> {
        let target = start + align_up(self.position - start, align);
        self.read(target - self.position)?;
        Ok(())
    }

    fn begin_record(&mut self, region: Region, trivial: Option<TrivialLayout>) -> Result<()> {
        match trivial {
            Some(layout) => {
                self.align_to(layout.align)?;
                self.trivial_depth += 1;
                let start = self.position;
                self.regions.push(region, Frame::Trivial { start, layout });
            }
            None => self.regions.push(region, Frame::Dense),
        }
        Ok(())
    }

    fn end_record(&mut self, region: Region, trivial: Option<TrivialLayout>) -> Result<()> {
        match self.regions.pop(region) {
            Frame::Trivial { start, layout } => {
                assert_eq!(
                    Some(layout),
                    trivial,
                    "grammar violation: {region:?} closed with a different layout"
                );
                self.trivial_depth -= 1;
                self.skip_from(start, layout.align)?;
            }
            _ => assert!(
                trivial.is_none(),
                "grammar violation: {region:?} closed with a layout it was not opened with"
            ),
        }
        Ok(())
    }
}

impl<'de> Transcoder for BinaryDecoder<'de> {
    const DECODING: bool = true;

    fn scalar<S: Scalar>(&mut self, value: &mut S) -> Result<()> {
        self.align_to(S::KIND.size())?;
        let mut bytes = S::Bytes::default();
        let len = bytes.as_ref().len();
        bytes.as_mut().copy_from_slice(self.read(len)?);
        *value = S::from_le(bytes);
        Ok(())
    }

    fn boolean(&mut self, value: &mut bool) -> Result<()> {
        let offset = self.position;
        *value = match self.read_u8()? {
            0 => false,
            1 => true,
            byte => return Err(Error::InvalidBool { offset, byte }),
        };
        Ok(())
    }

    fn string(&mut self, value: &mut String) -> Result<()> {
        let text = self.read_str()?;
        value.clear();
        value.push_str(text);
        Ok(())
    }

    fn enumerate(&mut self, labels: &[&str], index: &mut usize) -> Result<()> {
        *index = self.read_index(labels, "enumerate")?;
        Ok(())
    }

    fn optional_begin(&mut self, present: &mut bool) -> Result<()> {
        *present = self.read_flag("optional")?;
        self.regions.push(Region::Optional, Frame::Dense);
        Ok(())
    }

    fn optional_end(&mut self) -> Result<()> {
        self.regions.pop(Region::Optional);
        Ok(())
    }

    fn variant_begin(&mut self, labels: &[&str], index: &mut usize) -> Result<()> {
        let active = self.read_index(labels, "variant")?;
        *index = active;
        self.regions.push(Region::Variant, Frame::Variant { active });
        Ok(())
    }

    fn variant_arm(&mut self, index: usize) -> Result<bool> {
        match self.regions.top_mut(Region::Variant) {
            Frame::Variant { active } => Ok(*active == index),
            _ => unreachable!("variant frames are always Frame::Variant"),
        }
    }

    fn variant_end(&mut self) -> Result<()> {
        self.regions.pop(Region::Variant);
        Ok(())
    }

    fn object_begin(&mut self, trivial: Option<TrivialLayout>) -> Result<()> {
        self.begin_record(Region::Object, trivial)
    }

    fn object_field(&mut self, _key: &str) -> Result<()> {
        self.regions.top_mut(Region::Object);
        Ok(())
    }

    fn object_end(&mut self, trivial: Option<TrivialLayout>) -> Result<()> {
        self.end_record(Region::Object, trivial)
    }

    fn tuple_begin(&mut self, trivial: Option<TrivialLayout>) -> Result<()> {
        self.begin_record(Region::Tuple, trivial)
    }

    fn tuple_element(&mut self) -> Result<()> {
        self.regions.top_mut(Region::Tuple);
        Ok(())
    }

    fn tuple_end(&mut self, trivial: Option<TrivialLayout>) -> Result<()> {
        self.end_record(Region::Tuple, trivial)
    }

    fn list_begin(&mut self, trivial: bool) -> Result<()> {
        if trivial {
            // Trivial elements occupy at least one byte each.
            let remaining = self.read_len(1)?;
            self.trivial_depth += 1;
            let start = self.position;
            self.regions
                .push(Region::List, Frame::TrivialList { start, remaining });
        } else {
            self.regions.push(Region::List, Frame::Dense);
        }
        Ok(())
    }

    fn list_next(&mut self) -> Result<bool> {
        match self.regions.top_mut(Region::List) {
            Frame::TrivialList { remaining, .. } => {
                if *remaining == 0 {
                    Ok(false)
                } else {
                    *remaining -= 1;
                    Ok(true)
                }
            }
            _ => self.read_flag("list"),
        }
    }

    fn list_end(&mut self) -> Result<()> {
        if let Frame::TrivialList { remaining, .. } = self.regions.pop(Region::List) {
            assert_eq!(
                remaining, 0,
                "grammar violation: trivial list closed before its last element"
            );
            self.trivial_depth -= 1;
        }
        Ok(())
    }

    fn map_begin(&mut self) -> Result<()> {
        self.regions.push(Region::Map, Frame::Dense);
        Ok(())
    }

    fn map_entry(&mut self, key: &mut String) -> Result<bool> {
        self.regions.top_mut(Region::Map);
        if !self.read_flag("map")? {
            return Ok(false);
        }
        let text = self.read_str()?;
        key.clear();
        key.push_str(text);
        Ok(true)
    }

    fn map_end(&mut self) -> Result<()> {
        self.regions.pop(Region::Map);
        Ok(())
    }

    fn binary_header(&mut self, stride: usize, count: &mut usize, fixed: bool) -> Result<()> {
        self.align_to(block_align(stride))?;
        if fixed {
            return Ok(());
        }
        let offset = self.position;
        let length = self.read_len(stride)?;
        // Zero-sized elements would let any count through the input check.
        if stride == 0 {
            return Err(Error::LengthOverflow {
                offset,
                length,
                remaining: self.remaining(),
            });
        }
        *count = usize::try_from(length).map_err(|_| Error::LengthOverflow {
            offset,
            length,
            remaining: self.remaining(),
        })?;
        Ok(())
    }

    fn binary_payload(&mut self, bytes: &mut [u8]) -> Result<()> {
        bytes.copy_from_slice(self.read(bytes.len())?);
        Ok(())
    }
}
