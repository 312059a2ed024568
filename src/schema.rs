//! Recorded type shapes.
//!
//! A [`Schema`] is the flat token sequence one traversal of a type's shape
//! produces. It is recorded once by running a default value through the
//! [`Recorder`], is immutable afterwards, and carries no references back into
//! the type: labels and keys are owned strings.
//!
//! ## Recording
//!
//! The recorder is a decoder-shaped transcoder that never consumes input.
//! It reports every optional as present, accepts every variant arm so each
//! arm's payload is traced, and yields exactly one element for every list
//! and map, which is enough to capture the element shape once.
//!
//! ```rust
//! use shapewire::{Schema, ScalarKind, Token};
//!
//! let schema = Schema::of::<Vec<u16>>();
//! assert_eq!(
//!     schema.tokens(),
//!     &[
//!         Token::ListBegin { trivial: true },
//!         Token::ListNext,
//!         Token::Scalar(ScalarKind::U16),
//!         Token::ListEnd,
//!     ]
//! );
//! ```
//!
//! ## Equality
//!
//! Schemas compare token by token: labels, keys, nesting and numeric
//! subtypes must all match. A `Vec<u32>` and a `Vec<u64>` have different
//! schemas.

use crate::grammar::{
    block_align, Region, RegionStack, Scalar, ScalarKind, Transcoder, TrivialLayout,
};
use crate::shape::Shape;
use crate::{Error, Result};

/// Recording deeper than this many open regions panics.
///
/// A shape that contains itself (a tree of `Vec<Node>`) would otherwise
/// recurse forever, since the recorder always yields one list element.
pub const MAX_RECORD_DEPTH: usize = 128;

/// One recorded grammar call.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    Scalar(ScalarKind),
    Bool,
    String,
    Enumerate { labels: Vec<String> },
    OptionalBegin,
    OptionalEnd,
    VariantBegin { labels: Vec<String> },
    /// Start of the payload of arm `index`; the payload runs to the next arm
    /// marker or the variant end at the same depth.
    VariantArm { index: usize },
    VariantEnd,
    ObjectBegin { trivial: Option<TrivialLayout> },
    Field { key: String },
    ObjectEnd { trivial: Option<TrivialLayout> },
    TupleBegin { trivial: Option<TrivialLayout> },
    Element,
    TupleEnd { trivial: Option<TrivialLayout> },
    ListBegin { trivial: bool },
    /// Marks the start of the element shape.
    ListNext,
    ListEnd,
    MapBegin,
    /// Marks the start of the entry value shape.
    MapEntry,
    MapEnd,
    /// A binary block; `fixed` holds the element count when it never travels.
    Binary { stride: usize, fixed: Option<usize> },
}

const TOKEN_LABELS: [&str; 22] = [
    "scalar",
    "bool",
    "string",
    "enumerate",
    "optional_begin",
    "optional_end",
    "variant_begin",
    "variant_arm",
    "variant_end",
    "object_begin",
    "field",
    "object_end",
    "tuple_begin",
    "element",
    "tuple_end",
    "list_begin",
    "list_next",
    "list_end",
    "map_begin",
    "map_entry",
    "map_end",
    "binary",
];

impl Default for Token {
    fn default() -> Self {
        Token::Bool
    }
}

impl Token {
    /// Position of this token's kind in the token label list.
    fn tag(&self) -> usize {
        match self {
            Token::Scalar(_) => 0,
            Token::Bool => 1,
            Token::String => 2,
            Token::Enumerate { .. } => 3,
            Token::OptionalBegin => 4,
            Token::OptionalEnd => 5,
            Token::VariantBegin { .. } => 6,
            Token::VariantArm { .. } => 7,
            Token::VariantEnd => 8,
            Token::ObjectBegin { .. } => 9,
            Token::Field { .. } => 10,
            Token::ObjectEnd { .. } => 11,
            Token::TupleBegin { .. } => 12,
            Token::Element => 13,
            Token::TupleEnd { .. } => 14,
            Token::ListBegin { .. } => 15,
            Token::ListNext => 16,
            Token::ListEnd => 17,
            Token::MapBegin => 18,
            Token::MapEntry => 19,
            Token::MapEnd => 20,
            Token::Binary { .. } => 21,
        }
    }

    /// A token of kind `tag` with an empty payload.
    fn blank(tag: usize) -> Token {
        match tag {
            0 => Token::Scalar(ScalarKind::default()),
            1 => Token::Bool,
            2 => Token::String,
            3 => Token::Enumerate { labels: Vec::new() },
            4 => Token::OptionalBegin,
            5 => Token::OptionalEnd,
            6 => Token::VariantBegin { labels: Vec::new() },
            7 => Token::VariantArm { index: 0 },
            8 => Token::VariantEnd,
            9 => Token::ObjectBegin { trivial: None },
            10 => Token::Field { key: String::new() },
            11 => Token::ObjectEnd { trivial: None },
            12 => Token::TupleBegin { trivial: None },
            13 => Token::Element,
            14 => Token::TupleEnd { trivial: None },
            15 => Token::ListBegin { trivial: false },
            16 => Token::ListNext,
            17 => Token::ListEnd,
            18 => Token::MapBegin,
            19 => Token::MapEntry,
            20 => Token::MapEnd,
            _ => Token::Binary {
                stride: 0,
                fixed: None,
            },
        }
    }

    /// The region this token opens, if any.
    #[must_use]
    pub fn opens(&self) -> Option<Region> {
        match self {
            Token::OptionalBegin => Some(Region::Optional),
            Token::VariantBegin { .. } => Some(Region::Variant),
            Token::ObjectBegin { .. } => Some(Region::Object),
            Token::TupleBegin { .. } => Some(Region::Tuple),
            Token::ListBegin { .. } => Some(Region::List),
            Token::MapBegin => Some(Region::Map),
            _ => None,
        }
    }

    /// The region this token closes, if any.
    #[must_use]
    pub fn closes(&self) -> Option<Region> {
        match self {
            Token::OptionalEnd => Some(Region::Optional),
            Token::VariantEnd => Some(Region::Variant),
            Token::ObjectEnd { .. } => Some(Region::Object),
            Token::TupleEnd { .. } => Some(Region::Tuple),
            Token::ListEnd => Some(Region::List),
            Token::MapEnd => Some(Region::Map),
            _ => None,
        }
    }

    /// The region a member marker must appear directly inside.
    fn member_of(&self) -> Option<Region> {
        match self {
            Token::VariantArm { .. } => Some(Region::Variant),
            Token::Field { .. } => Some(Region::Object),
            Token::Element => Some(Region::Tuple),
            Token::ListNext => Some(Region::List),
            Token::MapEntry => Some(Region::Map),
            _ => None,
        }
    }

    /// The trivial layout carried by an object or tuple boundary.
    fn declared_layout(&self) -> Option<TrivialLayout> {
        match self {
            Token::ObjectBegin { trivial }
            | Token::ObjectEnd { trivial }
            | Token::TupleBegin { trivial }
            | Token::TupleEnd { trivial } => *trivial,
            _ => None,
        }
    }

    /// The layout a single-call token occupies inside a trivial region.
    fn leaf_layout(&self) -> Option<TrivialLayout> {
        match self {
            Token::Scalar(kind) => TrivialLayout::scalar(kind.size()),
            Token::Bool => TrivialLayout::scalar(1),
            Token::Binary {
                stride,
                fixed: Some(count),
            } if *count > 0 => Some(TrivialLayout {
                size: stride.checked_mul(*count)?,
                align: block_align(*stride),
            }),
            _ => None,
        }
    }

    fn shape_payload<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        match self {
            Token::Scalar(kind) => kind.shape(t),
            Token::Enumerate { labels } | Token::VariantBegin { labels } => labels.shape(t),
            Token::VariantArm { index } => shape_usize(index, t),
            Token::ObjectBegin { trivial }
            | Token::ObjectEnd { trivial }
            | Token::TupleBegin { trivial }
            | Token::TupleEnd { trivial } => trivial.shape(t),
            Token::Field { key } => key.shape(t),
            Token::ListBegin { trivial } => trivial.shape(t),
            Token::Binary { stride, fixed } => {
                let mut wide = fixed.map(|count| count as u64);
                t.tuple_begin(None)?;
                t.tuple_element()?;
                shape_usize(stride, t)?;
                t.tuple_element()?;
                wide.shape(t)?;
                t.tuple_end(None)?;
                *fixed = wide.map(narrow).transpose()?;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn narrow(wide: u64) -> Result<usize> {
    usize::try_from(wide).map_err(|_| Error::custom(format!("{wide} does not fit in usize")))
}

fn shape_usize<T: Transcoder>(value: &mut usize, t: &mut T) -> Result<()> {
    let mut wide = *value as u64;
    wide.shape(t)?;
    *value = narrow(wide)?;
    Ok(())
}

impl Shape for Token {
    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        let mut tag = self.tag();
        t.variant_begin(&TOKEN_LABELS, &mut tag)?;
        for arm in 0..TOKEN_LABELS.len() {
            if t.variant_arm(arm)? {
                if self.tag() != arm {
                    *self = Token::blank(arm);
                }
                self.shape_payload(t)?;
            }
        }
        t.variant_end()
    }
}

impl Shape for ScalarKind {
    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        let mut index = self.index();
        t.enumerate(&ScalarKind::LABELS, &mut index)?;
        *self = ScalarKind::from_index(index).ok_or_else(|| {
            Error::index_out_of_range(index as u64, ScalarKind::ALL.len(), "scalar kind")
        })?;
        Ok(())
    }
}

impl Shape for TrivialLayout {
    const TRIVIAL: Option<TrivialLayout> =
        TrivialLayout::record(&[TrivialLayout::scalar(8), TrivialLayout::scalar(8)]);

    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        t.object_begin(Self::TRIVIAL)?;
        t.object_field("size")?;
        shape_usize(&mut self.size, t)?;
        t.object_field("align")?;
        shape_usize(&mut self.align, t)?;
        t.object_end(Self::TRIVIAL)
    }
}

/// A recorded, balanced token sequence describing one type's shape.
///
/// # Examples
///
/// ```rust
/// use shapewire::Schema;
///
/// let a = Schema::of::<(u32, String)>();
/// let b = Schema::of::<(u32, String)>();
/// assert_eq!(a, b);
/// assert_ne!(a, Schema::of::<(u64, String)>());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Schema {
    tokens: Vec<Token>,
}

impl Schema {
    /// Records the shape of `T` by tracing one default value.
    ///
    /// # Panics
    ///
    /// Panics if the shape function breaks the container grammar, nests
    /// deeper than [`MAX_RECORD_DEPTH`], or returns an error while recording.
    #[must_use]
    pub fn of<T: Shape + Default>() -> Self {
        let mut recorder = Recorder::new();
        let mut value = T::default();
        if let Err(err) = value.shape(&mut recorder) {
            panic!(
                "grammar violation: shape of {} failed while recording: {err}",
                std::any::type_name::<T>()
            );
        }
        let schema = recorder.finish();
        log::debug!(
            "recorded schema for {}: {} tokens",
            std::any::type_name::<T>(),
            schema.len()
        );
        schema
    }

    /// Builds a schema from tokens, checking that they are balanced.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shapewire::{Schema, Token};
    ///
    /// assert!(Schema::from_tokens(vec![Token::OptionalBegin, Token::Bool, Token::OptionalEnd]).is_ok());
    /// assert!(Schema::from_tokens(vec![Token::OptionalBegin, Token::Bool]).is_err());
    /// ```
    pub fn from_tokens(tokens: Vec<Token>) -> Result<Self> {
        validate(&tokens)?;
        Ok(Schema { tokens })
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[must_use]
    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// A 64-bit digest of the schema: the first eight bytes of the BLAKE3
    /// hash of the schema's own binary encoding.
    pub fn fingerprint(&self) -> Result<u64> {
        let bytes = crate::to_bytes(&mut self.clone())?;
        let hash = blake3::hash(&bytes);
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        Ok(u64::from_le_bytes(head))
    }

    /// Index of the token closing the region opened at `begin`.
    pub(crate) fn matching_end(&self, begin: usize) -> Result<usize> {
        let mut depth = 0usize;
        for (pc, token) in self.tokens.iter().enumerate().skip(begin) {
            if token.opens().is_some() {
                depth += 1;
            } else if token.closes().is_some() {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(pc);
                }
            }
        }
        Err(Error::schema(begin, "region is never closed"))
    }
}

impl Shape for Schema {
    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        self.tokens.shape(t)?;
        if T::DECODING {
            validate(&self.tokens)?;
        }
        Ok(())
    }
}

/// Validation state of one open region.
struct OpenRegion {
    region: Region,
    arms: usize,
    layout: Option<TrivialLayout>,
    members: Vec<Option<TrivialLayout>>,
}

/// Checks nesting, arm indices and every declared trivial layout.
///
/// A trivial object or tuple must be closed with the layout it was opened
/// with, and that layout must be exactly what its members add up to.
fn validate(tokens: &[Token]) -> Result<()> {
    let mut open: Vec<OpenRegion> = Vec::new();
    for (pc, token) in tokens.iter().enumerate() {
        if let Some(region) = token.opens() {
            let arms = match token {
                Token::VariantBegin { labels } => labels.len(),
                _ => 0,
            };
            let layout = token.declared_layout();
            if let Some(layout) = layout {
                if !is_well_formed(layout) {
                    return Err(Error::schema(
                        pc,
                        &format!("malformed trivial layout {layout:?}"),
                    ));
                }
            }
            open.push(OpenRegion {
                region,
                arms,
                layout,
                members: Vec::new(),
            });
        } else if let Some(region) = token.closes() {
            let closed = match open.pop() {
                Some(top) if top.region == region => top,
                Some(top) => {
                    return Err(Error::schema(
                        pc,
                        &format!("closes {region:?} while {:?} is open", top.region),
                    ))
                }
                None => return Err(Error::schema(pc, &format!("closes unopened {region:?}"))),
            };
            let layout = token.declared_layout();
            if layout != closed.layout {
                return Err(Error::schema(
                    pc,
                    &format!(
                        "{region:?} closed with layout {layout:?}, opened with {:?}",
                        closed.layout
                    ),
                ));
            }
            if let Some(declared) = layout {
                let actual = record_layout(&closed.members);
                if actual != Some(declared) {
                    return Err(Error::schema(
                        pc,
                        &format!("{region:?} members lay out as {actual:?}, declared {declared:?}"),
                    ));
                }
            }
            add_member(&mut open, layout);
        } else if let Some(region) = token.member_of() {
            match open.last() {
                Some(top) if top.region == region => {
                    if let Token::VariantArm { index } = token {
                        if *index >= top.arms {
                            return Err(Error::schema(
                                pc,
                                &format!("arm {index} outside {} labels", top.arms),
                            ));
                        }
                    }
                }
                _ => {
                    return Err(Error::schema(
                        pc,
                        &format!("{token:?} outside a {region:?} region"),
                    ))
                }
            }
        } else {
            add_member(&mut open, token.leaf_layout());
        }
    }
    match open.last() {
        Some(top) => Err(Error::schema(
            tokens.len(),
            &format!("{:?} region is never closed", top.region),
        )),
        None => Ok(()),
    }
}

/// Records a member's layout in the enclosing region if that region is trivial.
fn add_member(open: &mut [OpenRegion], layout: Option<TrivialLayout>) {
    if let Some(top) = open.last_mut() {
        if top.layout.is_some() {
            top.members.push(layout);
        }
    }
}

fn is_well_formed(layout: TrivialLayout) -> bool {
    layout.align.is_power_of_two() && layout.align <= 8 && layout.size % layout.align == 0
}

/// [`TrivialLayout::record`] with overflow reported as `None`.
fn record_layout(members: &[Option<TrivialLayout>]) -> Option<TrivialLayout> {
    if members.is_empty() {
        return None;
    }
    let mut offset = 0usize;
    let mut align = 1;
    for member in members {
        let member = (*member)?;
        offset = checked_align_up(offset, member.align)?.checked_add(member.size)?;
        align = align.max(member.align);
    }
    Some(TrivialLayout {
        size: checked_align_up(offset, align)?,
        align,
    })
}

fn checked_align_up(offset: usize, align: usize) -> Option<usize> {
    if align <= 1 {
        Some(offset)
    } else {
        Some(offset.checked_add(align - 1)? / align * align)
    }
}

/// Per-region recording state.
#[derive(Debug)]
enum Visit {
    Plain,
    Repeated { yielded: bool },
    Variant { seen: Vec<bool> },
}

/// Decoder-shaped transcoder that records one token per grammar call.
#[derive(Debug, Default)]
pub struct Recorder {
    tokens: Vec<Token>,
    regions: RegionStack<Visit>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded schema. Panics if a region is still open.
    #[must_use]
    pub fn finish(self) -> Schema {
        self.regions.assert_closed();
        Schema {
            tokens: self.tokens,
        }
    }

    fn open(&mut self, region: Region, visit: Visit, token: Token) {
        if self.regions.depth() >= MAX_RECORD_DEPTH {
            panic!(
                "grammar violation: shape nests deeper than {MAX_RECORD_DEPTH} regions; \
                 recursive shapes cannot be recorded"
            );
        }
        self.regions.push(region, visit);
        self.tokens.push(token);
    }

    fn close(&mut self, region: Region, token: Token) -> Visit {
        let visit = self.regions.pop(region);
        self.tokens.push(token);
        visit
    }

    /// Yields the single representative element of a list or map.
    fn repeat(&mut self, region: Region, token: Token) -> bool {
        match self.regions.top_mut(region) {
            Visit::Repeated { yielded } if !*yielded => {
                *yielded = true;
                self.tokens.push(token);
                true
            }
            _ => false,
        }
    }
}

impl Transcoder for Recorder {
    const DECODING: bool = true;

    fn scalar<S: Scalar>(&mut self, _value: &mut S) -> Result<()> {
        self.tokens.push(Token::Scalar(S::KIND));
        Ok(())
    }

    fn boolean(&mut self, _value: &mut bool) -> Result<()> {
        self.tokens.push(Token::Bool);
        Ok(())
    }

    fn string(&mut self, _value: &mut String) -> Result<()> {
        self.tokens.push(Token::String);
        Ok(())
    }

    fn enumerate(&mut self, labels: &[&str], _index: &mut usize) -> Result<()> {
        self.tokens.push(Token::Enumerate {
            labels: owned(labels),
        });
        Ok(())
    }

    fn optional_begin(&mut self, present: &mut bool) -> Result<()> {
        *present = true;
        self.open(Region::Optional, Visit::Plain, Token::OptionalBegin);
        Ok(())
    }

    fn optional_end(&mut self) -> Result<()> {
        self.close(Region::Optional, Token::OptionalEnd);
        Ok(())
    }

    fn variant_begin(&mut self, labels: &[&str], _index: &mut usize) -> Result<()> {
        self.open(
            Region::Variant,
            Visit::Variant {
                seen: vec![false; labels.len()],
            },
            Token::VariantBegin {
                labels: owned(labels),
            },
        );
        Ok(())
    }

    fn variant_arm(&mut self, index: usize) -> Result<bool> {
        if let Visit::Variant { seen } = self.regions.top_mut(Region::Variant) {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => panic!("grammar violation: variant arm {index} offered twice"),
                None => panic!(
                    "grammar violation: variant arm {index} outside {} labels",
                    seen.len()
                ),
            }
        }
        self.tokens.push(Token::VariantArm { index });
        Ok(true)
    }

    fn variant_end(&mut self) -> Result<()> {
        if let Visit::Variant { seen } = self.close(Region::Variant, Token::VariantEnd) {
            if let Some(missing) = seen.iter().position(|visited| !visited) {
                panic!("grammar violation: variant arm {missing} was never offered");
            }
        }
        Ok(())
    }

    fn object_begin(&mut self, trivial: Option<TrivialLayout>) -> Result<()> {
        self.open(Region::Object, Visit::Plain, Token::ObjectBegin { trivial });
        Ok(())
    }

    fn object_field(&mut self, key: &str) -> Result<()> {
        self.regions.top_mut(Region::Object);
        self.tokens.push(Token::Field {
            key: key.to_string(),
        });
        Ok(())
    }

    fn object_end(&mut self, trivial: Option<TrivialLayout>) -> Result<()> {
        self.close(Region::Object, Token::ObjectEnd { trivial });
        Ok(())
    }

    fn tuple_begin(&mut self, trivial: Option<TrivialLayout>) -> Result<()> {
        self.open(Region::Tuple, Visit::Plain, Token::TupleBegin { trivial });
        Ok(())
    }

    fn tuple_element(&mut self) -> Result<()> {
        self.regions.top_mut(Region::Tuple);
        self.tokens.push(Token::Element);
        Ok(())
    }

    fn tuple_end(&mut self, trivial: Option<TrivialLayout>) -> Result<()> {
        self.close(Region::Tuple, Token::TupleEnd { trivial });
        Ok(())
    }

    fn list_begin(&mut self, trivial: bool) -> Result<()> {
        self.open(
            Region::List,
            Visit::Repeated { yielded: false },
            Token::ListBegin { trivial },
        );
        Ok(())
    }

    fn list_next(&mut self) -> Result<bool> {
        Ok(self.repeat(Region::List, Token::ListNext))
    }

    fn list_end(&mut self) -> Result<()> {
        self.close(Region::List, Token::ListEnd);
        Ok(())
    }

    fn map_begin(&mut self) -> Result<()> {
        self.open(
            Region::Map,
            Visit::Repeated { yielded: false },
            Token::MapBegin,
        );
        Ok(())
    }

    fn map_entry(&mut self, _key: &mut String) -> Result<bool> {
        Ok(self.repeat(Region::Map, Token::MapEntry))
    }

    fn map_end(&mut self) -> Result<()> {
        self.close(Region::Map, Token::MapEnd);
        Ok(())
    }

    fn binary_header(&mut self, stride: usize, count: &mut usize, fixed: bool) -> Result<()> {
        let fixed = if fixed {
            Some(*count)
        } else {
            *count = 0;
            None
        };
        self.tokens.push(Token::Binary { stride, fixed });
        Ok(())
    }

    fn binary_payload(&mut self, _bytes: &mut [u8]) -> Result<()> {
        Ok(())
    }
}

fn owned(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|label| label.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_bytes, to_bytes, ByteArray, Bytes};

    #[derive(Debug, Default, PartialEq)]
    enum Shape3 {
        #[default]
        Dot,
        Circle(f32),
        Label(String),
    }

    impl Shape for Shape3 {
        fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
            let mut index = match self {
                Shape3::Dot => 0,
                Shape3::Circle(_) => 1,
                Shape3::Label(_) => 2,
            };
            t.variant_begin(&["Dot", "Circle", "Label"], &mut index)?;
            if t.variant_arm(0)? {
                *self = Shape3::Dot;
            }
            if t.variant_arm(1)? {
                let mut radius = match self {
                    Shape3::Circle(r) => *r,
                    _ => 0.0,
                };
                radius.shape(t)?;
                *self = Shape3::Circle(radius);
            }
            if t.variant_arm(2)? {
                let mut text = match self {
                    Shape3::Label(s) => std::mem::take(s),
                    _ => String::new(),
                };
                text.shape(t)?;
                *self = Shape3::Label(text);
            }
            t.variant_end()
        }
    }

    #[test]
    fn test_record_scalar() {
        assert_eq!(Schema::of::<u32>().tokens(), &[Token::Scalar(ScalarKind::U32)]);
    }

    #[test]
    fn test_record_optional_and_map() {
        let schema = Schema::of::<std::collections::BTreeMap<String, Option<bool>>>();
        assert_eq!(
            schema.tokens(),
            &[
                Token::MapBegin,
                Token::MapEntry,
                Token::OptionalBegin,
                Token::Bool,
                Token::OptionalEnd,
                Token::MapEnd,
            ]
        );
    }

    #[test]
    fn test_record_binary_blocks() {
        assert_eq!(
            Schema::of::<Bytes>().tokens(),
            &[Token::Binary {
                stride: 1,
                fixed: None
            }]
        );
        assert_eq!(
            Schema::of::<ByteArray<16>>().tokens(),
            &[Token::Binary {
                stride: 1,
                fixed: Some(16)
            }]
        );
    }

    #[test]
    fn test_variant_records_every_arm() {
        let schema = Schema::of::<Shape3>();
        let arms: Vec<usize> = schema
            .tokens()
            .iter()
            .filter_map(|token| match token {
                Token::VariantArm { index } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(arms, vec![0, 1, 2]);
        assert!(schema.tokens().contains(&Token::Scalar(ScalarKind::F32)));
        assert!(schema.tokens().contains(&Token::String));
    }

    #[test]
    fn test_subtype_is_significant() {
        assert_ne!(Schema::of::<Vec<u32>>(), Schema::of::<Vec<i32>>());
        assert_eq!(Schema::of::<Vec<u32>>(), Schema::of::<Vec<u32>>());
    }

    #[test]
    fn test_from_tokens_rejects_unbalanced() {
        let err = Schema::from_tokens(vec![Token::ListBegin { trivial: false }, Token::MapEnd])
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { token: 1, .. }));

        let err = Schema::from_tokens(vec![Token::Field {
            key: "x".to_string(),
        }])
        .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { token: 0, .. }));

        let err = Schema::from_tokens(vec![
            Token::VariantBegin {
                labels: vec!["a".to_string()],
            },
            Token::VariantArm { index: 1 },
            Token::VariantEnd,
        ])
        .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { token: 1, .. }));
    }

    fn padded_byte() -> Vec<Token> {
        let layout = Some(TrivialLayout { size: 16, align: 8 });
        vec![
            Token::ObjectBegin { trivial: layout },
            Token::Field {
                key: "a".to_string(),
            },
            Token::Scalar(ScalarKind::U8),
            Token::ObjectEnd { trivial: layout },
        ]
    }

    #[test]
    fn test_from_tokens_checks_member_layout() {
        let err = Schema::from_tokens(padded_byte()).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { token: 3, .. }));

        let layout = Some(TrivialLayout { size: 1, align: 1 });
        let err = Schema::from_tokens(vec![
            Token::TupleBegin { trivial: layout },
            Token::Element,
            Token::String,
            Token::TupleEnd { trivial: layout },
        ])
        .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { token: 3, .. }));

        let err = Schema::from_tokens(vec![
            Token::TupleBegin { trivial: layout },
            Token::TupleEnd { trivial: layout },
        ])
        .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { token: 1, .. }));
    }

    #[test]
    fn test_from_tokens_checks_begin_and_end_layouts() {
        let err = Schema::from_tokens(vec![
            Token::TupleBegin {
                trivial: Some(TrivialLayout { size: 1, align: 1 }),
            },
            Token::Element,
            Token::Scalar(ScalarKind::U8),
            Token::TupleEnd { trivial: None },
        ])
        .unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { token: 3, .. }));
    }

    #[test]
    fn test_from_tokens_rejects_malformed_layouts() {
        for layout in [
            TrivialLayout {
                size: 1,
                align: usize::MAX,
            },
            TrivialLayout { size: 16, align: 16 },
            TrivialLayout { size: 6, align: 4 },
            TrivialLayout { size: 0, align: 0 },
        ] {
            let err = Schema::from_tokens(vec![
                Token::ObjectBegin {
                    trivial: Some(layout),
                },
                Token::Field {
                    key: "a".to_string(),
                },
                Token::Scalar(ScalarKind::U8),
                Token::ObjectEnd {
                    trivial: Some(layout),
                },
            ])
            .unwrap_err();
            assert!(matches!(err, Error::SchemaMismatch { token: 0, .. }));
        }
    }

    #[test]
    fn test_from_tokens_accepts_recorded_layouts() {
        for schema in [
            Schema::of::<(f32, f64, f32)>(),
            Schema::of::<(u8, [u16; 3], bool)>(),
            Schema::of::<(u8, ByteArray<3>, u32)>(),
            Schema::of::<Vec<((u8, u64), u16)>>(),
            Schema::of::<std::collections::BTreeMap<u32, i16>>(),
        ] {
            assert_eq!(Schema::from_tokens(schema.tokens().to_vec()).unwrap(), schema);
        }
    }

    #[test]
    fn test_decoded_schema_checks_layouts() {
        let mut forged = Schema {
            tokens: padded_byte(),
        };
        let bytes = to_bytes(&mut forged).unwrap();
        assert!(matches!(
            from_bytes::<Schema>(&bytes).unwrap_err(),
            Error::SchemaMismatch { token: 3, .. }
        ));
    }

    #[test]
    fn test_schema_encodes_itself() {
        let mut schema = Schema::of::<(Shape3, Vec<(u8, u16)>, Option<String>)>();
        let bytes = to_bytes(&mut schema).unwrap();
        let back: Schema = from_bytes(&bytes).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_fingerprint_tracks_structure() {
        let a = Schema::of::<(u32, String)>().fingerprint().unwrap();
        let b = Schema::of::<(u32, String)>().fingerprint().unwrap();
        let c = Schema::of::<(String, u32)>().fingerprint().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_matching_end() {
        let schema = Schema::of::<Vec<Option<u8>>>();
        assert_eq!(schema.matching_end(0).unwrap(), schema.len() - 1);
        assert_eq!(schema.matching_end(2).unwrap(), 4);
    }

    #[derive(Default)]
    struct Tree {
        children: Vec<Tree>,
    }

    impl Shape for Tree {
        fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
            self.children.shape(t)
        }
    }

    #[test]
    #[should_panic(expected = "grammar violation")]
    fn test_recursive_shape_hits_depth_limit() {
        let _ = Schema::of::<Tree>();
    }
}
