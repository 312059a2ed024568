//! Binary encoding.
//!
//! This module provides the [`BinaryEncoder`], the writing half of the
//! compact wire format described in [`crate::format`].
//!
//! ## Overview
//!
//! - **Scalars** are fixed-width little-endian
//! - **Dynamic containers** are self-terminating: a `0x01` flag before every
//!   list element or map entry, a `0x00` sentinel after the last
//! - **Trivial regions** are packed at native alignment, so a run of
//!   bit-copyable records has exactly the bytes a `#[repr(C)]` array would
//!
//! ## Direct Encoder Usage
//!
//! Most users should call [`crate::to_bytes`]. The encoder can also be driven
//! by hand:
//!
//! ```rust
//! use shapewire::{BinaryEncoder, Shape};
//!
//! let mut encoder = BinaryEncoder::new();
//! let mut values = vec![1u16, 2, 3];
//! values.shape(&mut encoder).unwrap();
//!
//! // u64 count, then the elements packed back to back.
//! assert_eq!(encoder.into_inner(), vec![3, 0, 0, 0, 0, 0, 0, 0, 1, 0, 2, 0, 3, 0]);
//! ```

use crate::grammar::{align_up, block_align, Region, RegionStack, Scalar, Transcoder, TrivialLayout};
use crate::{Error, Result};

/// Per-region encoder state.
#[derive(Debug)]
enum Frame {
    /// Packed densely, no alignment.
    Dense,
    Variant { active: usize },
    /// Trivial object or tuple; padding is measured from `start`.
    Trivial { start: usize, layout: TrivialLayout },
    /// Trivial list; the element count is backpatched at `count_at`.
    TrivialList {
        start: usize,
        count_at: usize,
        count: u64,
    },
}

impl Frame {
    fn start(&self) -> Option<usize> {
        match self {
            Frame::Trivial { start, .. } | Frame::TrivialList { start, .. } => Some(*start),
            Frame::Dense | Frame::Variant { .. } => None,
        }
    }
}

/// The binary encoder.
///
/// Writes grammar calls into a growable byte buffer. One encoder serves one
/// encode call; [`BinaryEncoder::into_inner`] hands the buffer back.
pub struct BinaryEncoder {
    output: Vec<u8>,
    regions: RegionStack<Frame>,
    trivial_depth: usize,
}

impl Default for BinaryEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BinaryEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        BinaryEncoder {
            output: Vec::with_capacity(capacity),
            regions: RegionStack::new(),
            trivial_depth: 0,
        }
    }

    /// Bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.output.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }

    /// Returns the encoded bytes. Panics if a region is still open.
    pub fn into_inner(self) -> Vec<u8> {
        self.regions.assert_closed();
        self.output
    }

    /// Pads with zeros until the offset from the innermost trivial region's
    /// start is a multiple of `align`. No-op outside trivial regions.
    fn align_to(&mut self, align: usize) {
        if self.trivial_depth == 0 {
            return;
        }
        let start = self
            .regions
            .iter()
            .rev()
            .find_map(|(_, frame)| frame.start())
            .unwrap_or(0);
        self.pad_from(start, align);
    }

    fn pad_from(&mut self, start: usize, align: usize) {
        let target = start + align_up(self.output.len() - start, align);
        self.output.resize(target, 0);
    }

    #[inline]
    fn write_u8(&mut self, byte: u8) {
        self.output.push(byte);
    }

    #[inline]
    fn write_u32(&mut self, value: u32) {
        self.output.extend_from_slice(&value.to_le_bytes());
    }

    #[inline]
    fn write_u64(&mut self, value: u64) {
        self.output.extend_from_slice(&value.to_le_bytes());
    }

    fn write_str(&mut self, value: &str) -> Result<()> {
        if let Some(position) = value.bytes().position(|b| b == 0) {
            return Err(Error::InteriorNul { position });
        }
        self.output.extend_from_slice(value.as_bytes());
        self.output.push(0);
        Ok(())
    }

    fn write_index(&mut self, labels: &[&str], index: usize, what: &str) {
        assert!(
            index < labels.len(),
            "grammar violation: {what} index {index} outside {} labels",
            labels.len()
        );
        self.write_u32(index as u32);
    }

    fn begin_record(&mut self, region: Region, trivial: Option<TrivialLayout>) {
        match trivial {
            Some(layout) => {
                self.align_to(layout.align);
                self.trivial_depth += 1;
                let start = self.output.len();
                self.regions.push(region, Frame::Trivial { start, layout });
            }
            None => self.regions.push(region, Frame::Dense),
        }
    }

    fn end_record(&mut self, region: Region, trivial: Option<TrivialLayout>) {
        match self.regions.pop(region) {
            Frame::Trivial { start, layout } => {
                assert_eq!(
                    Some(layout),
                    trivial,
                    "grammar violation: {region:?} closed with a different layout"
                );
                self.pad_from(start, layout.align);
                assert_eq!(
                    self.output.len() - start,
                    layout.size,
                    "grammar violation: {region:?} members do not fill the declared layout"
                );
                self.trivial_depth -= 1;
            }
            _ => assert!(
                trivial.is_none(),
                "grammar violation: {region:?} closed with a layout it was not opened with"
            ),
        }
    }
}

impl Transcoder for BinaryEncoder {
    const DECODING: bool = false;

    fn scalar<S: Scalar>(&mut self, value: &mut S) -> Result<()> {
        self.align_to(S::KIND.size());
        self.output.extend_from_slice(value.to_le().as_ref());
        Ok(())
    }

    fn boolean(&mut self, value: &mut bool) -> Result<()> {
        self.write_u8(u8::from(*value));
        Ok(())
    }

    fn string(&mut self, value: &mut String) -> Result<()> {
        self.write_str(value)
    }

    fn enumerate(&mut self, labels: &[&str], index: &mut usize) -> Result<()> {
        self.write_index(labels, *index, "enumerate");
        Ok(())
    }

    fn optional_begin(&mut self, present: &mut bool) -> Result<()> {
        self.write_u8(u8::from(*present));
        self.regions.push(Region::Optional, Frame::Dense);
        Ok(())
    }

    fn optional_end(&mut self) -> Result<()> {
        self.regions.pop(Region::Optional);
        Ok(())
    }

    fn variant_begin(&mut self, labels: &[&str], index: &mut usize) -> Result<()> {
        self.write_index(labels, *index, "variant");
        self.regions
            .push(Region::Variant, Frame::Variant { active: *index });
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
        self.begin_record(Region::Object, trivial);
        Ok(())
    }

    fn object_field(&mut self, _key: &str) -> Result<()> {
        self.regions.top_mut(Region::Object);
        Ok(())
    }

    fn object_end(&mut self, trivial: Option<TrivialLayout>) -> Result<()> {
        self.end_record(Region::Object, trivial);
        Ok(())
    }

    fn tuple_begin(&mut self, trivial: Option<TrivialLayout>) -> Result<()> {
        self.begin_record(Region::Tuple, trivial);
        Ok(())
    }

    fn tuple_element(&mut self) -> Result<()> {
        self.regions.top_mut(Region::Tuple);
        Ok(())
    }

    fn tuple_end(&mut self, trivial: Option<TrivialLayout>) -> Result<()> {
        self.end_record(Region::Tuple, trivial);
        Ok(())
    }

    fn list_begin(&mut self, trivial: bool) -> Result<()> {
        if trivial {
            let count_at = self.output.len();
            self.write_u64(0);
            self.trivial_depth += 1;
            let start = self.output.len();
            self.regions.push(
                Region::List,
                Frame::TrivialList {
                    start,
                    count_at,
                    count: 0,
                },
            );
        } else {
            self.regions.push(Region::List, Frame::Dense);
        }
        Ok(())
    }

    fn list_next(&mut self) -> Result<bool> {
        match self.regions.top_mut(Region::List) {
            Frame::TrivialList { count, .. } => *count += 1,
            _ => self.write_u8(1),
        }
        Ok(true)
    }

    fn list_end(&mut self) -> Result<()> {
        match self.regions.pop(Region::List) {
            Frame::TrivialList {
                count_at, count, ..
            } => {
                self.output[count_at..count_at + 8].copy_from_slice(&count.to_le_bytes());
                self.trivial_depth -= 1;
            }
            _ => self.write_u8(0),
        }
        Ok(())
    }

    fn map_begin(&mut self) -> Result<()> {
        self.regions.push(Region::Map, Frame::Dense);
        Ok(())
    }

    fn map_entry(&mut self, key: &mut String) -> Result<bool> {
        self.regions.top_mut(Region::Map);
        self.write_u8(1);
        self.write_str(key)?;
        Ok(true)
    }

    fn map_end(&mut self) -> Result<()> {
        self.regions.pop(Region::Map);
        self.write_u8(0);
        Ok(())
    }

    fn binary_header(&mut self, stride: usize, count: &mut usize, fixed: bool) -> Result<()> {
        self.align_to(block_align(stride));
        if !fixed {
            self.write_u64(*count as u64);
        }
        Ok(())
    }

    fn binary_payload(&mut self, bytes: &mut [u8]) -> Result<()> {
        self.output.extend_from_slice(bytes);
        Ok(())
    }
}
