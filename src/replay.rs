//! Schema-driven transcoding.
//!
//! [`replay`] walks a [`Schema`] and, for every token, pulls the value out
//! of a live decoder and pushes it into a live encoder. Neither side needs
//! the Rust type the schema was recorded from, so a binary blob can be
//! dumped or converted to a value tree with only its schema at hand.
//!
//! The walk is an explicit stack machine. Each open region owns a frame
//! holding its kind and the token span it repeats or guards; the program
//! counter jumps inside that span instead of recursing, so the host stack
//! stays flat however deeply the data nests.
//!
//! ```rust
//! use shapewire::{to_bytes, transcode_to_debug, Schema};
//!
//! let mut value = vec![(1u8, "one".to_string())];
//! let bytes = to_bytes(&mut value).unwrap();
//! let schema = Schema::of::<Vec<(u8, String)>>();
//! let text = transcode_to_debug(&schema, &bytes).unwrap();
//! assert_eq!(text, shapewire::to_debug_string(&mut value));
//! ```

use crate::de::BinaryDecoder;
use crate::debug::DebugEncoder;
use crate::grammar::{Scalar, ScalarKind, Transcoder};
use crate::schema::{Schema, Token};
use crate::ser::BinaryEncoder;
use crate::value::{Value, ValueDecoder, ValueEncoder};
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameKind {
    /// Object or tuple: closed by its end token, nothing repeats.
    None,
    List,
    Map,
    Optional,
    Variant,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    /// First token of the repeated element, entry value or active arm.
    body: usize,
    /// Index of the region's closing token.
    end: usize,
}

/// Drives `decoder` into `encoder` following `schema`.
///
/// # Errors
///
/// Returns the first error either side reports, or [`Error::SchemaMismatch`]
/// when the data does not fit the schema: a variant index with no arm
/// marker, or a list element the schema holds no shape for.
pub fn replay<D, E>(schema: &Schema, decoder: &mut D, encoder: &mut E) -> Result<()>
where
    D: Transcoder,
    E: Transcoder,
{
    Machine {
        schema,
        frames: Vec::new(),
    }
    .run(decoder, encoder)
}

struct Machine<'s> {
    schema: &'s Schema,
    frames: Vec<Frame>,
}

impl<'s> Machine<'s> {
    fn push(&mut self, kind: FrameKind, pc: usize, body: usize, end: usize) {
        log::trace!("replay: open {kind:?} at token {pc}, body {body}..{end}");
        self.frames.push(Frame { kind, body, end });
    }

    fn pop(&mut self, kind: FrameKind, pc: usize) -> Result<Frame> {
        match self.frames.pop() {
            Some(frame) if frame.kind == kind => {
                log::trace!("replay: close {kind:?} at token {pc}");
                Ok(frame)
            }
            Some(frame) => Err(Error::schema(
                pc,
                &format!("closes {kind:?} while {:?} is open", frame.kind),
            )),
            None => Err(Error::schema(pc, &format!("closes unopened {kind:?}"))),
        }
    }

    fn top(&self, kind: FrameKind, pc: usize) -> Result<&Frame> {
        match self.frames.last() {
            Some(frame) if frame.kind == kind => Ok(frame),
            _ => Err(Error::schema(pc, &format!("not inside a {kind:?} region"))),
        }
    }

    /// Body span of a list or map opened at `pc`, whose element shape starts
    /// after the `marker` token. An empty span means no shape was recorded.
    fn repeated_body(&self, pc: usize, marker: &Token) -> Result<(usize, usize)> {
        let end = self.schema.matching_end(pc)?;
        let tokens = self.schema.tokens();
        if tokens.get(pc + 1) == Some(marker) {
            Ok((pc + 2, end))
        } else {
            Ok((end, end))
        }
    }

    /// Finds the arm marker for `index` among the direct members of the
    /// variant opened at `pc`.
    fn find_arm(&self, pc: usize, end: usize, index: usize) -> Result<usize> {
        let tokens = self.schema.tokens();
        let mut depth = 0usize;
        for (at, token) in tokens.iter().enumerate().take(end).skip(pc + 1) {
            if token.opens().is_some() {
                depth += 1;
            } else if token.closes().is_some() {
                depth = depth.saturating_sub(1);
            } else if depth == 0 && *token == (Token::VariantArm { index }) {
                return Ok(at);
            }
        }
        Err(Error::schema(
            pc,
            &format!("variant index {index} has no arm in the schema"),
        ))
    }

    fn run<D: Transcoder, E: Transcoder>(mut self, d: &mut D, e: &mut E) -> Result<()> {
        let schema = self.schema;
        let tokens = schema.tokens();
        let mut pc = 0;
        while pc < tokens.len() {
            match &tokens[pc] {
                Token::Scalar(kind) => pass_scalar(*kind, d, e)?,
                Token::Bool => {
                    let mut value = false;
                    d.boolean(&mut value)?;
                    e.boolean(&mut value)?;
                }
                Token::String => {
                    let mut value = String::new();
                    d.string(&mut value)?;
                    e.string(&mut value)?;
                }
                Token::Enumerate { labels } => {
                    let labels = borrowed(labels);
                    let mut index = 0;
                    d.enumerate(&labels, &mut index)?;
                    e.enumerate(&labels, &mut index)?;
                }
                Token::Binary { stride, fixed } => {
                    let mut count = fixed.unwrap_or(0);
                    d.binary_header(*stride, &mut count, fixed.is_some())?;
                    let len = count
                        .checked_mul(*stride)
                        .ok_or_else(|| Error::schema(pc, "binary block size overflows"))?;
                    let mut block = vec![0u8; len];
                    d.binary_payload(&mut block)?;
                    e.binary_header(*stride, &mut count, fixed.is_some())?;
                    e.binary_payload(&mut block)?;
                }
                Token::ObjectBegin { trivial } => {
                    d.object_begin(*trivial)?;
                    e.object_begin(*trivial)?;
                    self.push(FrameKind::None, pc, pc + 1, pc + 1);
                }
                Token::Field { key } => {
                    d.object_field(key)?;
                    e.object_field(key)?;
                }
                Token::ObjectEnd { trivial } => {
                    self.pop(FrameKind::None, pc)?;
                    d.object_end(*trivial)?;
                    e.object_end(*trivial)?;
                }
                Token::TupleBegin { trivial } => {
                    d.tuple_begin(*trivial)?;
                    e.tuple_begin(*trivial)?;
                    self.push(FrameKind::None, pc, pc + 1, pc + 1);
                }
                Token::Element => {
                    d.tuple_element()?;
                    e.tuple_element()?;
                }
                Token::TupleEnd { trivial } => {
                    self.pop(FrameKind::None, pc)?;
                    d.tuple_end(*trivial)?;
                    e.tuple_end(*trivial)?;
                }
                Token::ListBegin { trivial } => {
                    d.list_begin(*trivial)?;
                    e.list_begin(*trivial)?;
                    let (body, end) = self.repeated_body(pc, &Token::ListNext)?;
                    self.push(FrameKind::List, pc, body, end);
                    // The end token asks for the first element.
                    pc = end;
                    continue;
                }
                Token::ListEnd => {
                    let body = self.top(FrameKind::List, pc)?.body;
                    if d.list_next()? {
                        if body == pc {
                            return Err(Error::schema(pc, "list element has no recorded shape"));
                        }
                        e.list_next()?;
                        pc = body;
                        continue;
                    }
                    self.pop(FrameKind::List, pc)?;
                    d.list_end()?;
                    e.list_end()?;
                }
                Token::MapBegin => {
                    d.map_begin()?;
                    e.map_begin()?;
                    let (body, end) = self.repeated_body(pc, &Token::MapEntry)?;
                    self.push(FrameKind::Map, pc, body, end);
                    pc = end;
                    continue;
                }
                Token::MapEnd => {
                    let body = self.top(FrameKind::Map, pc)?.body;
                    let mut key = String::new();
                    if d.map_entry(&mut key)? {
                        if body == pc {
                            return Err(Error::schema(pc, "map entry has no recorded shape"));
                        }
                        e.map_entry(&mut key)?;
                        pc = body;
                        continue;
                    }
                    self.pop(FrameKind::Map, pc)?;
                    d.map_end()?;
                    e.map_end()?;
                }
                Token::OptionalBegin => {
                    let mut present = false;
                    d.optional_begin(&mut present)?;
                    e.optional_begin(&mut present)?;
                    let end = schema.matching_end(pc)?;
                    self.push(FrameKind::Optional, pc, pc + 1, end);
                    if !present {
                        pc = end;
                        continue;
                    }
                }
                Token::OptionalEnd => {
                    self.pop(FrameKind::Optional, pc)?;
                    d.optional_end()?;
                    e.optional_end()?;
                }
                Token::VariantBegin { labels } => {
                    let labels = borrowed(labels);
                    let mut index = 0;
                    d.variant_begin(&labels, &mut index)?;
                    e.variant_begin(&labels, &mut index)?;
                    let end = schema.matching_end(pc)?;
                    let arm = self.find_arm(pc, end, index)?;
                    if !d.variant_arm(index)? || !e.variant_arm(index)? {
                        return Err(Error::schema(
                            arm,
                            &format!("arm {index} was not accepted as the active arm"),
                        ));
                    }
                    self.push(FrameKind::Variant, pc, arm + 1, end);
                    pc = arm + 1;
                    continue;
                }
                Token::VariantArm { .. } => {
                    // Reaching the next arm marker ends the active arm.
                    pc = self.top(FrameKind::Variant, pc)?.end;
                    continue;
                }
                Token::VariantEnd => {
                    self.pop(FrameKind::Variant, pc)?;
                    d.variant_end()?;
                    e.variant_end()?;
                }
                Token::ListNext | Token::MapEntry => {
                    return Err(Error::schema(pc, "member marker outside its region body"));
                }
            }
            pc += 1;
        }
        match self.frames.last() {
            Some(frame) => Err(Error::schema(
                tokens.len(),
                &format!("{:?} region is never closed", frame.kind),
            )),
            None => Ok(()),
        }
    }
}

fn borrowed(labels: &[String]) -> Vec<&str> {
    labels.iter().map(String::as_str).collect()
}

fn pass<S: Scalar, D: Transcoder, E: Transcoder>(d: &mut D, e: &mut E) -> Result<()> {
    let mut value = S::default();
    d.scalar(&mut value)?;
    e.scalar(&mut value)
}

fn pass_scalar<D: Transcoder, E: Transcoder>(kind: ScalarKind, d: &mut D, e: &mut E) -> Result<()> {
    match kind {
        ScalarKind::I8 => pass::<i8, D, E>(d, e),
        ScalarKind::I16 => pass::<i16, D, E>(d, e),
        ScalarKind::I32 => pass::<i32, D, E>(d, e),
        ScalarKind::I64 => pass::<i64, D, E>(d, e),
        ScalarKind::U8 => pass::<u8, D, E>(d, e),
        ScalarKind::U16 => pass::<u16, D, E>(d, e),
        ScalarKind::U32 => pass::<u32, D, E>(d, e),
        ScalarKind::U64 => pass::<u64, D, E>(d, e),
        ScalarKind::F32 => pass::<f32, D, E>(d, e),
        ScalarKind::F64 => pass::<f64, D, E>(d, e),
    }
}

/// Renders a binary encoding as debug text using only its schema.
///
/// Fails if the bytes do not fit the schema or are not fully consumed.
pub fn transcode_to_debug(schema: &Schema, bytes: &[u8]) -> Result<String> {
    let mut decoder = BinaryDecoder::new(bytes);
    let mut encoder = DebugEncoder::new();
    replay(schema, &mut decoder, &mut encoder)?;
    decoder.finish()?;
    Ok(encoder.into_string())
}

/// Converts a binary encoding into a value tree using only its schema.
pub fn transcode_to_value(schema: &Schema, bytes: &[u8]) -> Result<Value> {
    let mut decoder = BinaryDecoder::new(bytes);
    let mut encoder = ValueEncoder::new();
    replay(schema, &mut decoder, &mut encoder)?;
    decoder.finish()?;
    Ok(encoder.into_value())
}

/// Converts a value tree into the binary encoding described by `schema`.
pub fn transcode_from_value(schema: &Schema, value: &Value) -> Result<Vec<u8>> {
    let mut decoder = ValueDecoder::new(value);
    let mut encoder = BinaryEncoder::new();
    replay(schema, &mut decoder, &mut encoder)?;
    Ok(encoder.into_inner())
}
