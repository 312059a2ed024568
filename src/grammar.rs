//! The container grammar every encoder and decoder implements.
//!
//! A [`Transcoder`] is a state machine driven by grammar calls. Compound
//! regions are bracketed by matching begin/end calls and every member is
//! announced by exactly one "next" call:
//!
//! | Region   | Calls |
//! |----------|-------|
//! | Optional | `optional_begin(&mut present)` → value if present → `optional_end()` |
//! | Variant  | `variant_begin(labels, &mut index)` → `variant_arm(i)` per arm, payload of the arm that returned `true` → `variant_end()` |
//! | Object   | `object_begin(trivial)` → (`object_field(key)` → value)* → `object_end(trivial)` |
//! | Tuple    | `tuple_begin(trivial)` → (`tuple_element()` → value)* → `tuple_end(trivial)` |
//! | List     | `list_begin(trivial)` → (`list_next()` is `true` → value)* → `list_end()` |
//! | Map      | `map_begin()` → (`map_entry(&mut key)` is `true` → value)* → `map_end()` |
//!
//! Scalars, booleans, strings, enumerations and binary blocks are single
//! calls. The same call sequence is issued whether the transcoder writes or
//! reads; [`Transcoder::DECODING`] tells a shape function which way values
//! flow through its `&mut` arguments.
//!
//! Mis-nested calls are programming errors. [`RegionStack`] panics on them.

use crate::value::Number;
use crate::Result;
use std::fmt;

/// An encoder or decoder for the container grammar.
///
/// Encoders read the `&mut` arguments, decoders overwrite them. Methods that
/// return `bool` report control flow: whether another list element or map
/// entry follows, or whether a variant arm is the active one.
pub trait Transcoder {
    /// `true` when values flow from the transcoder into the shape function.
    const DECODING: bool;

    /// A fixed-width number.
    fn scalar<S: Scalar>(&mut self, value: &mut S) -> Result<()>;

    /// A single byte that is either `0x00` or `0x01` on the wire.
    fn boolean(&mut self, value: &mut bool) -> Result<()>;

    /// A UTF-8 string without interior NUL bytes.
    fn string(&mut self, value: &mut String) -> Result<()>;

    /// A label index; only the index travels, labels are a schema-time contract.
    fn enumerate(&mut self, labels: &[&str], index: &mut usize) -> Result<()>;

    /// Opens an optional. Encoders read `*present`; decoders set it.
    fn optional_begin(&mut self, present: &mut bool) -> Result<()>;

    /// Closes the innermost optional.
    fn optional_end(&mut self) -> Result<()>;

    /// Opens a tagged union. Encoders commit to `*index`; decoders set it.
    fn variant_begin(&mut self, labels: &[&str], index: &mut usize) -> Result<()>;

    /// Offers arm `index`; returns `true` if its payload follows.
    fn variant_arm(&mut self, index: usize) -> Result<bool>;

    /// Closes the innermost variant.
    fn variant_end(&mut self) -> Result<()>;

    /// Opens a keyed record, trivial when `trivial` carries its layout.
    fn object_begin(&mut self, trivial: Option<TrivialLayout>) -> Result<()>;

    /// Announces the field named `key`; its value follows.
    fn object_field(&mut self, key: &str) -> Result<()>;

    /// Closes the innermost object with the layout it was opened with.
    fn object_end(&mut self, trivial: Option<TrivialLayout>) -> Result<()>;

    /// Opens a positional record of fixed arity.
    fn tuple_begin(&mut self, trivial: Option<TrivialLayout>) -> Result<()>;

    /// Announces the next tuple element.
    fn tuple_element(&mut self) -> Result<()>;

    /// Closes the innermost tuple with the layout it was opened with.
    fn tuple_end(&mut self, trivial: Option<TrivialLayout>) -> Result<()>;

    /// Opens a homogeneous list. `trivial` is set when every element is bit-copyable.
    fn list_begin(&mut self, trivial: bool) -> Result<()>;

    /// Announces the next element. Encoders always return `true`.
    fn list_next(&mut self) -> Result<bool>;

    /// Closes the innermost list.
    fn list_end(&mut self) -> Result<()>;

    /// Opens a string-keyed map, rendered as an object with runtime keys.
    fn map_begin(&mut self) -> Result<()>;

    /// Announces the next entry and transfers its key.
    fn map_entry(&mut self, key: &mut String) -> Result<bool>;

    /// Closes the innermost map.
    fn map_end(&mut self) -> Result<()>;

    /// Transfers the element count of a block of `stride`-byte elements.
    /// A `fixed` count is statically known and never travels.
    fn binary_header(&mut self, stride: usize, count: &mut usize, fixed: bool) -> Result<()>;

    /// Transfers `count * stride` bytes announced by the preceding header.
    fn binary_payload(&mut self, bytes: &mut [u8]) -> Result<()>;
}

/// Numeric subtypes carried by [`Transcoder::scalar`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ScalarKind {
    #[default]
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 10] = [
        ScalarKind::I8,
        ScalarKind::I16,
        ScalarKind::I32,
        ScalarKind::I64,
        ScalarKind::U8,
        ScalarKind::U16,
        ScalarKind::U32,
        ScalarKind::U64,
        ScalarKind::F32,
        ScalarKind::F64,
    ];

    pub const LABELS: [&'static str; 10] =
        ["i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "f32", "f64"];

    /// Width in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            ScalarKind::I8 | ScalarKind::U8 => 1,
            ScalarKind::I16 | ScalarKind::U16 => 2,
            ScalarKind::I32 | ScalarKind::U32 | ScalarKind::F32 => 4,
            ScalarKind::I64 | ScalarKind::U64 | ScalarKind::F64 => 8,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        Self::LABELS[self as usize]
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fixed-width number that can travel through [`Transcoder::scalar`].
pub trait Scalar: Copy + Default + PartialEq + fmt::Debug + fmt::Display + 'static {
    const KIND: ScalarKind;

    /// Little-endian byte image.
    type Bytes: AsRef<[u8]> + AsMut<[u8]> + Default;

    fn to_le(self) -> Self::Bytes;

    fn from_le(bytes: Self::Bytes) -> Self;

    fn to_number(self) -> Number;

    /// Converts back from a value-tree number, `None` if it does not fit.
    fn from_number(number: &Number) -> Option<Self>;

    /// Maps 64 random bits onto this type. Floats stay finite.
    fn from_random_bits(bits: u64) -> Self;
}

macro_rules! impl_scalar_int {
    ($($ty:ty => $kind:ident, $variant:ident, $wide:ty);* $(;)?) => {$(
        impl Scalar for $ty {
            const KIND: ScalarKind = ScalarKind::$kind;
            type Bytes = [u8; std::mem::size_of::<$ty>()];

            #[inline]
            fn to_le(self) -> Self::Bytes {
                self.to_le_bytes()
            }

            #[inline]
            fn from_le(bytes: Self::Bytes) -> Self {
                <$ty>::from_le_bytes(bytes)
            }

            fn to_number(self) -> Number {
                Number::$variant(self as $wide)
            }

            fn from_number(number: &Number) -> Option<Self> {
                match *number {
                    Number::Signed(i) => <$ty>::try_from(i).ok(),
                    Number::Unsigned(u) => <$ty>::try_from(u).ok(),
                    Number::Float(f) => {
                        if f.fract() == 0.0 && f >= <$ty>::MIN as f64 && f <= <$ty>::MAX as f64 {
                            Some(f as $ty)
                        } else {
                            None
                        }
                    }
                }
            }

            #[inline]
            fn from_random_bits(bits: u64) -> Self {
                bits as $ty
            }
        }
    )*};
}

impl_scalar_int! {
    i8 => I8, Signed, i64;
    i16 => I16, Signed, i64;
    i32 => I32, Signed, i64;
    i64 => I64, Signed, i64;
    u8 => U8, Unsigned, u64;
    u16 => U16, Unsigned, u64;
    u32 => U32, Unsigned, u64;
    u64 => U64, Unsigned, u64;
}

macro_rules! impl_scalar_float {
    ($($ty:ty => $kind:ident, $mantissa:expr);* $(;)?) => {$(
        impl Scalar for $ty {
            const KIND: ScalarKind = ScalarKind::$kind;
            type Bytes = [u8; std::mem::size_of::<$ty>()];

            #[inline]
            fn to_le(self) -> Self::Bytes {
                self.to_le_bytes()
            }

            #[inline]
            fn from_le(bytes: Self::Bytes) -> Self {
                <$ty>::from_le_bytes(bytes)
            }

            fn to_number(self) -> Number {
                Number::Float(self as f64)
            }

            fn from_number(number: &Number) -> Option<Self> {
                match *number {
                    Number::Signed(i) => Some(i as $ty),
                    Number::Unsigned(u) => Some(u as $ty),
                    Number::Float(f) => Some(f as $ty),
                }
            }

            fn from_random_bits(bits: u64) -> Self {
                // Uniform in [-1e6, 1e6), exactly representable mantissa.
                let unit = (bits >> (64 - $mantissa)) as $ty / (1u64 << $mantissa) as $ty;
                unit * 2.0e6 - 1.0e6
            }
        }
    )*};
}

impl_scalar_float! {
    f32 => F32, 24;
    f64 => F64, 53;
}

/// Native layout of a bit-copyable region.
///
/// Scalars are aligned to their own size. A record aligns each member to the
/// member's alignment and rounds its total size up to its largest alignment,
/// exactly as a `#[repr(C)]` struct is laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct TrivialLayout {
    pub size: usize,
    pub align: usize,
}

impl TrivialLayout {
    #[must_use]
    pub const fn scalar(size: usize) -> Option<Self> {
        Some(TrivialLayout { size, align: size })
    }

    /// Layout of a record whose members are laid out in order.
    ///
    /// Returns `None` if any member is not trivial or the record is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shapewire::TrivialLayout;
    ///
    /// let layout = TrivialLayout::record(&[
    ///     TrivialLayout::scalar(4),
    ///     TrivialLayout::scalar(8),
    ///     TrivialLayout::scalar(4),
    /// ]);
    /// assert_eq!(layout, Some(TrivialLayout { size: 24, align: 8 }));
    /// ```
    #[must_use]
    pub const fn record(members: &[Option<TrivialLayout>]) -> Option<Self> {
        if members.is_empty() {
            return None;
        }
        let mut offset = 0;
        let mut align = 1;
        let mut i = 0;
        while i < members.len() {
            let member = match members[i] {
                Some(member) => member,
                None => return None,
            };
            offset = align_up(offset, member.align) + member.size;
            if member.align > align {
                align = member.align;
            }
            i += 1;
        }
        Some(TrivialLayout {
            size: align_up(offset, align),
            align,
        })
    }

    /// Layout of `count` consecutive elements.
    #[must_use]
    pub const fn array(element: Option<TrivialLayout>, count: usize) -> Option<Self> {
        match element {
            Some(element) if count > 0 => Some(TrivialLayout {
                size: element.size * count,
                align: element.align,
            }),
            _ => None,
        }
    }
}

/// Rounds `offset` up to a multiple of `align`.
#[inline]
#[must_use]
pub const fn align_up(offset: usize, align: usize) -> usize {
    if align <= 1 {
        offset
    } else {
        (offset + align - 1) / align * align
    }
}

/// Alignment of a binary block inside a trivial region: its stride when that
/// is a power of two no larger than 8, otherwise unaligned.
#[inline]
#[must_use]
pub const fn block_align(stride: usize) -> usize {
    if stride.is_power_of_two() && stride <= 8 {
        stride
    } else {
        1
    }
}

/// Compound region kinds tracked by [`RegionStack`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    Optional,
    Variant,
    Object,
    Tuple,
    List,
    Map,
}

/// Begin/end bookkeeping shared by every transcoder.
///
/// Each open region carries a transcoder-specific payload `F`. Closing the
/// wrong region kind, or touching a region that is not open, panics: the
/// shape function that issued the calls is broken.
#[derive(Debug)]
pub struct RegionStack<F = ()> {
    frames: Vec<(Region, F)>,
}

impl<F> Default for RegionStack<F> {
    fn default() -> Self {
        RegionStack { frames: Vec::new() }
    }
}

impl<F> RegionStack<F> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, region: Region, frame: F) {
        self.frames.push((region, frame));
    }

    /// Closes the innermost region, which must be of kind `region`.
    pub fn pop(&mut self, region: Region) -> F {
        match self.frames.pop() {
            Some((open, frame)) if open == region => frame,
            Some((open, _)) => {
                panic!("grammar violation: closing {region:?} while {open:?} is open")
            }
            None => panic!("grammar violation: closing {region:?} with no open region"),
        }
    }

    /// The innermost region's payload, which must be of kind `region`.
    pub fn top_mut(&mut self, region: Region) -> &mut F {
        match self.frames.last_mut() {
            Some((open, frame)) if *open == region => frame,
            Some((open, _)) => {
                panic!("grammar violation: {region:?} member call while {open:?} is open")
            }
            None => panic!("grammar violation: {region:?} member call outside any region"),
        }
    }

    /// The innermost region and its payload, whatever its kind.
    pub fn last_mut(&mut self) -> Option<(Region, &mut F)> {
        self.frames.last_mut().map(|(region, frame)| (*region, frame))
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &(Region, F)> {
        self.frames.iter()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Panics unless every region has been closed.
    pub fn assert_closed(&self) {
        if let Some((open, _)) = self.frames.last() {
            panic!(
                "grammar violation: {} region(s) left open, innermost {open:?}",
                self.frames.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout_pads_like_repr_c() {
        #[repr(C)]
        struct Native {
            x: f32,
            y: f64,
            z: f32,
        }

        let layout = TrivialLayout::record(&[
            TrivialLayout::scalar(4),
            TrivialLayout::scalar(8),
            TrivialLayout::scalar(4),
        ])
        .unwrap();
        assert_eq!(layout.size, std::mem::size_of::<Native>());
        assert_eq!(layout.align, std::mem::align_of::<Native>());
    }

    #[test]
    fn test_nested_record_uses_member_alignment() {
        #[repr(C)]
        struct Inner {
            a: u32,
            b: u32,
        }
        #[repr(C)]
        struct Outer {
            tag: u8,
            inner: Inner,
            tail: u16,
        }

        let inner = TrivialLayout::record(&[TrivialLayout::scalar(4), TrivialLayout::scalar(4)]);
        let outer =
            TrivialLayout::record(&[TrivialLayout::scalar(1), inner, TrivialLayout::scalar(2)])
                .unwrap();
        assert_eq!(outer.size, std::mem::size_of::<Outer>());
        assert_eq!(outer.align, std::mem::align_of::<Outer>());
    }

    #[test]
    fn test_record_with_dynamic_member_is_not_trivial() {
        assert_eq!(TrivialLayout::record(&[TrivialLayout::scalar(4), None]), None);
        assert_eq!(TrivialLayout::record(&[]), None);
        assert_eq!(TrivialLayout::array(TrivialLayout::scalar(2), 0), None);
    }

    #[test]
    fn test_scalar_kind_labels() {
        for kind in ScalarKind::ALL {
            assert_eq!(ScalarKind::from_index(kind.index()), Some(kind));
        }
        assert_eq!(ScalarKind::F64.to_string(), "f64");
        assert_eq!(ScalarKind::U16.size(), 2);
    }

    #[test]
    fn test_float_random_bits_stay_finite() {
        for bits in [0, u64::MAX, 0x8000_0000_0000_0000, 12345] {
            assert!(f32::from_random_bits(bits).is_finite());
            assert!(f64::from_random_bits(bits).abs() <= 1.0e6);
        }
    }

    #[test]
    fn test_number_conversions() {
        assert_eq!(u8::from_number(&Number::Signed(-1)), None);
        assert_eq!(i16::from_number(&Number::Unsigned(300)), Some(300));
        assert_eq!(u32::from_number(&Number::Float(7.0)), Some(7));
        assert_eq!(u32::from_number(&Number::Float(7.5)), None);
        assert_eq!(f32::from_number(&Number::Signed(3)), Some(3.0));
    }

    #[test]
    #[should_panic(expected = "grammar violation")]
    fn test_region_stack_rejects_mismatched_end() {
        let mut stack = RegionStack::<()>::new();
        stack.push(Region::Object, ());
        stack.pop(Region::List);
    }

    #[test]
    #[should_panic(expected = "grammar violation")]
    fn test_region_stack_rejects_stray_member() {
        let mut stack = RegionStack::<usize>::new();
        stack.top_mut(Region::List);
    }
}
