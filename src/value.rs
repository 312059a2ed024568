//! Dynamic value tree.
//!
//! This module provides the [`Value`] enum, an in-memory document that any
//! shape can be transcoded into and back out of. It is useful when the
//! structure isn't known at compile time: a [`crate::Schema`] replayed into a
//! [`ValueEncoder`] turns a binary blob into a `Value` with no Rust type in
//! scope.
//!
//! ## Core Types
//!
//! - [`Value`]: null, bool, number, string, bytes, array, object or variant
//! - [`Number`]: signed, unsigned or floating-point numbers
//! - [`ValueEncoder`] / [`ValueDecoder`]: the transcoders that build and read trees
//!
//! ## Grammar Mapping
//!
//! | Region | Value |
//! |--------|-------|
//! | scalar | `Number` |
//! | enumerate | `String` holding the label |
//! | optional | `Null` when absent, the inner value otherwise |
//! | variant | `Variant { label, value }` |
//! | object, map | `Object` |
//! | tuple, list | `Array` |
//! | binary block | `Bytes` |
//!
//! ## Usage
//!
//! ```rust
//! use shapewire::{from_value, to_value, Value};
//!
//! let mut pair = (7u8, "seven".to_string());
//! let value = to_value(&mut pair).unwrap();
//! assert_eq!(value, Value::Array(vec![Value::from(7u8), Value::from("seven")]));
//!
//! let back: (u8, String) = from_value(&value).unwrap();
//! assert_eq!(back, pair);
//! ```

use crate::grammar::{Region, RegionStack, Scalar, Transcoder, TrivialLayout};
use crate::{Error, Result, ValueMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A dynamically-typed value tree.
///
/// # Examples
///
/// ```rust
/// use shapewire::{Number, Value};
///
/// let null = Value::Null;
/// let num = Value::Number(Number::Unsigned(42));
/// let text = Value::String("hello".to_string());
///
/// assert!(null.is_null());
/// assert!(num.is_number());
/// assert!(text.is_string());
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Object(ValueMap),
    Variant { label: String, value: Box<Value> },
}

/// A number carried by a [`Value`].
///
/// Integers compare equal across `Signed` and `Unsigned` when they denote the
/// same integer; floats only compare equal to floats.
///
/// # Examples
///
/// ```rust
/// use shapewire::Number;
///
/// assert_eq!(Number::Signed(5), Number::Unsigned(5));
/// assert_ne!(Number::Signed(-1), Number::Unsigned(u64::MAX));
/// assert_eq!(Number::Float(2.5).as_f64(), 2.5);
/// ```
#[derive(Clone, Copy, Debug)]
pub enum Number {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl Number {
    #[inline]
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Number::Signed(_) | Number::Unsigned(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, Number::Float(_))
    }

    /// Converts to an `i64` if the number is a whole number in range.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shapewire::Number;
    ///
    /// assert_eq!(Number::Unsigned(42).as_i64(), Some(42));
    /// assert_eq!(Number::Float(42.0).as_i64(), Some(42));
    /// assert_eq!(Number::Float(42.5).as_i64(), None);
    /// assert_eq!(Number::Unsigned(u64::MAX).as_i64(), None);
    /// ```
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        i64::from_number(self)
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        u64::from_number(self)
    }

    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Signed(i) => i as f64,
            Number::Unsigned(u) => u as f64,
            Number::Float(f) => f,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Number::Signed(a), Number::Signed(b)) => a == b,
            (Number::Unsigned(a), Number::Unsigned(b)) => a == b,
            (Number::Signed(a), Number::Unsigned(b)) | (Number::Unsigned(b), Number::Signed(a)) => {
                u64::try_from(a).map_or(false, |a| a == b)
            }
            (Number::Float(a), Number::Float(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Signed(i) => write!(f, "{}", i),
            Number::Unsigned(u) => write!(f, "{}", u),
            Number::Float(fl) => write!(f, "{}", fl),
        }
    }
}

impl Value {
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_variant(&self) -> bool {
        matches!(self, Value::Variant { .. })
    }

    /// Short name of the value's kind, used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Variant { .. } => "variant",
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// If the value is a string, returns a reference to it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shapewire::Value;
    ///
    /// assert_eq!(Value::from("hello").as_str(), Some("hello"));
    /// assert_eq!(Value::from(42u8).as_str(), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&ValueMap> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// The active label and payload of a variant.
    ///
    /// A single-entry object is read as a variant as well, which is how
    /// variants look after a trip through JSON.
    #[must_use]
    pub fn as_variant(&self) -> Option<(&str, &Value)> {
        match self {
            Value::Variant { label, value } => Some((label, value)),
            Value::Object(obj) => obj.single().map(|(label, value)| (label.as_str(), value)),
            _ => None,
        }
    }

    /// Looks up an object field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|obj| obj.get(key))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Bytes(bytes) => {
                write!(f, "0x")?;
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, element) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Object(obj) => {
                write!(f, "{{")?;
                for (i, (key, value)) in obj.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Variant { label, value } => write!(f, "{}({})", label, value),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(Number::Signed(i)) => serializer.serialize_i64(*i),
            Value::Number(Number::Unsigned(u)) => serializer.serialize_u64(*u),
            Value::Number(Number::Float(f)) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(bytes) => serializer.serialize_bytes(bytes),
            Value::Array(arr) => {
                use serde::ser::SerializeSeq;
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for element in arr {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Value::Object(obj) => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(obj.len()))?;
                for (k, v) in obj.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Variant { label, value } => {
                use serde::ser::SerializeMap;
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(label, value)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any value")
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Self::Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Self::Value, E> {
                Ok(Value::Number(Number::Signed(value)))
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Self::Value, E> {
                Ok(Value::Number(Number::Unsigned(value)))
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Self::Value, E> {
                Ok(Value::Number(Number::Float(value)))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E> {
                Ok(Value::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Self::Value, E> {
                Ok(Value::String(value))
            }

            fn visit_bytes<E>(self, value: &[u8]) -> std::result::Result<Self::Value, E> {
                Ok(Value::Bytes(value.to_vec()))
            }

            fn visit_byte_buf<E>(self, value: Vec<u8>) -> std::result::Result<Self::Value, E> {
                Ok(Value::Bytes(value))
            }

            fn visit_unit<E>(self) -> std::result::Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut vec = Vec::new();
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Value::Array(vec))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut values = ValueMap::new();
                while let Some((key, value)) = map.next_entry()? {
                    values.insert(key, value);
                }
                Ok(Value::Object(values))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

/// Builder state of one open region.
#[derive(Debug)]
enum Builder {
    Sequence(Vec<Value>),
    Fields { map: ValueMap, key: Option<String> },
    Optional(Option<Value>),
    Variant {
        active: usize,
        label: String,
        value: Option<Value>,
    },
}

/// Transcoder that builds a [`Value`] from grammar calls.
#[derive(Debug, Default)]
pub struct ValueEncoder {
    regions: RegionStack<Builder>,
    root: Option<Value>,
}

impl ValueEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the finished tree. Panics if a region is still open.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.regions.assert_closed();
        self.root.unwrap_or_default()
    }

    fn emit(&mut self, value: Value) {
        match self.regions.last_mut() {
            None => self.root = Some(value),
            Some((_, Builder::Sequence(values))) => values.push(value),
            Some((region, Builder::Fields { map, key })) => match key.take() {
                Some(key) => {
                    map.insert(key, value);
                }
                None => panic!("grammar violation: {region:?} value without a key"),
            },
            Some((_, Builder::Optional(slot))) | Some((_, Builder::Variant { value: slot, .. })) => {
                *slot = Some(value)
            }
        }
    }

    fn begin_fields(&mut self, region: Region) {
        self.regions.push(
            region,
            Builder::Fields {
                map: ValueMap::new(),
                key: None,
            },
        );
    }

    fn set_key(&mut self, region: Region, name: &str) {
        if let Builder::Fields { key, .. } = self.regions.top_mut(region) {
            *key = Some(name.to_string());
        }
    }

    fn end_fields(&mut self, region: Region) {
        if let Builder::Fields { map, .. } = self.regions.pop(region) {
            self.emit(Value::Object(map));
        }
    }

    fn end_sequence(&mut self, region: Region) {
        if let Builder::Sequence(values) = self.regions.pop(region) {
            self.emit(Value::Array(values));
        }
    }
}

impl Transcoder for ValueEncoder {
    const DECODING: bool = false;

    fn scalar<S: Scalar>(&mut self, value: &mut S) -> Result<()> {
        self.emit(Value::Number(value.to_number()));
        Ok(())
    }

    fn boolean(&mut self, value: &mut bool) -> Result<()> {
        self.emit(Value::Bool(*value));
        Ok(())
    }

    fn string(&mut self, value: &mut String) -> Result<()> {
        self.emit(Value::String(value.clone()));
        Ok(())
    }

    fn enumerate(&mut self, labels: &[&str], index: &mut usize) -> Result<()> {
        let label = label_at(labels, *index, "enumerate");
        self.emit(Value::String(label.to_string()));
        Ok(())
    }

    fn optional_begin(&mut self, _present: &mut bool) -> Result<()> {
        self.regions.push(Region::Optional, Builder::Optional(None));
        Ok(())
    }

    fn optional_end(&mut self) -> Result<()> {
        if let Builder::Optional(slot) = self.regions.pop(Region::Optional) {
            self.emit(slot.unwrap_or_default());
        }
        Ok(())
    }

    fn variant_begin(&mut self, labels: &[&str], index: &mut usize) -> Result<()> {
        let label = label_at(labels, *index, "variant").to_string();
        self.regions.push(
            Region::Variant,
            Builder::Variant {
                active: *index,
                label,
                value: None,
            },
        );
        Ok(())
    }

    fn variant_arm(&mut self, index: usize) -> Result<bool> {
        match self.regions.top_mut(Region::Variant) {
            Builder::Variant { active, .. } => Ok(*active == index),
            _ => unreachable!("variant regions always hold Builder::Variant"),
        }
    }

    fn variant_end(&mut self) -> Result<()> {
        if let Builder::Variant { label, value, .. } = self.regions.pop(Region::Variant) {
            self.emit(Value::Variant {
                label,
                value: Box::new(value.unwrap_or_default()),
            });
        }
        Ok(())
    }

    fn object_begin(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        self.begin_fields(Region::Object);
        Ok(())
    }

    fn object_field(&mut self, key: &str) -> Result<()> {
        self.set_key(Region::Object, key);
        Ok(())
    }

    fn object_end(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        self.end_fields(Region::Object);
        Ok(())
    }

    fn tuple_begin(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        self.regions.push(Region::Tuple, Builder::Sequence(Vec::new()));
        Ok(())
    }

    fn tuple_element(&mut self) -> Result<()> {
        self.regions.top_mut(Region::Tuple);
        Ok(())
    }

    fn tuple_end(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        self.end_sequence(Region::Tuple);
        Ok(())
    }

    fn list_begin(&mut self, _trivial: bool) -> Result<()> {
        self.regions.push(Region::List, Builder::Sequence(Vec::new()));
        Ok(())
    }

    fn list_next(&mut self) -> Result<bool> {
        self.regions.top_mut(Region::List);
        Ok(true)
    }

    fn list_end(&mut self) -> Result<()> {
        self.end_sequence(Region::List);
        Ok(())
    }

    fn map_begin(&mut self) -> Result<()> {
        self.begin_fields(Region::Map);
        Ok(())
    }

    fn map_entry(&mut self, key: &mut String) -> Result<bool> {
        self.set_key(Region::Map, key);
        Ok(true)
    }

    fn map_end(&mut self) -> Result<()> {
        self.end_fields(Region::Map);
        Ok(())
    }

    fn binary_header(&mut self, _stride: usize, _count: &mut usize, _fixed: bool) -> Result<()> {
        Ok(())
    }

    fn binary_payload(&mut self, bytes: &mut [u8]) -> Result<()> {
        self.emit(Value::Bytes(bytes.to_vec()));
        Ok(())
    }
}

fn label_at<'a>(labels: &[&'a str], index: usize, what: &str) -> &'a str {
    match labels.get(index) {
        Some(label) => label,
        None => panic!(
            "grammar violation: {what} index {index} outside {} labels",
            labels.len()
        ),
    }
}

static NULL: Value = Value::Null;

/// Read position inside one open region.
#[derive(Debug)]
enum Cursor<'v> {
    Sequence(std::slice::Iter<'v, Value>),
    Fields(&'v ValueMap),
    Entries(indexmap::map::Iter<'v, String, Value>),
    Optional,
    Variant { active: usize },
}

/// Transcoder that reads grammar calls out of a [`Value`].
///
/// Objects are matched by key, so field order in the tree does not matter; a
/// missing field reads as `Null`, which an optional accepts as absent.
#[derive(Debug)]
pub struct ValueDecoder<'v> {
    regions: RegionStack<Cursor<'v>>,
    pending: Option<&'v Value>,
    block: Vec<u8>,
}

impl<'v> ValueDecoder<'v> {
    #[must_use]
    pub fn new(root: &'v Value) -> Self {
        ValueDecoder {
            regions: RegionStack::new(),
            pending: Some(root),
            block: Vec::new(),
        }
    }

    fn take(&mut self) -> Result<&'v Value> {
        self.pending
            .take()
            .ok_or_else(|| Error::custom("value tree has no value at this position"))
    }

    fn sequence(&mut self, region: Region) -> Result<()> {
        let value = self.take()?;
        match value {
            Value::Array(values) => {
                self.regions.push(region, Cursor::Sequence(values.iter()));
                Ok(())
            }
            other => Err(Error::type_mismatch("array", other.kind_name())),
        }
    }

    fn advance(&mut self, region: Region) -> bool {
        if let Cursor::Sequence(iter) = self.regions.top_mut(region) {
            if let Some(value) = iter.next() {
                self.pending = Some(value);
                return true;
            }
        }
        false
    }
}

fn find_label(labels: &[&str], label: &str, context: &'static str) -> Result<usize> {
    labels
        .iter()
        .position(|candidate| *candidate == label)
        .ok_or_else(|| Error::type_mismatch(&format!("{context} label in {labels:?}"), label))
}

impl<'v> Transcoder for ValueDecoder<'v> {
    const DECODING: bool = true;

    fn scalar<S: Scalar>(&mut self, value: &mut S) -> Result<()> {
        match self.take()? {
            Value::Number(number) => {
                *value = S::from_number(number).ok_or_else(|| {
                    Error::type_mismatch(S::KIND.as_str(), &number.to_string())
                })?;
                Ok(())
            }
            other => Err(Error::type_mismatch(S::KIND.as_str(), other.kind_name())),
        }
    }

    fn boolean(&mut self, value: &mut bool) -> Result<()> {
        match self.take()? {
            Value::Bool(b) => {
                *value = *b;
                Ok(())
            }
            other => Err(Error::type_mismatch("bool", other.kind_name())),
        }
    }

    fn string(&mut self, value: &mut String) -> Result<()> {
        match self.take()? {
            Value::String(s) => {
                value.clone_from(s);
                Ok(())
            }
            other => Err(Error::type_mismatch("string", other.kind_name())),
        }
    }

    fn enumerate(&mut self, labels: &[&str], index: &mut usize) -> Result<()> {
        *index = match self.take()? {
            Value::String(label) => find_label(labels, label, "enumerate")?,
            Value::Number(number) => {
                let raw = number
                    .as_u64()
                    .ok_or_else(|| Error::type_mismatch("label index", &number.to_string()))?;
                match usize::try_from(raw) {
                    Ok(i) if i < labels.len() => i,
                    _ => return Err(Error::index_out_of_range(raw, labels.len(), "enumerate")),
                }
            }
            other => return Err(Error::type_mismatch("enumerate label", other.kind_name())),
        };
        Ok(())
    }

    fn optional_begin(&mut self, present: &mut bool) -> Result<()> {
        let value = self.take()?;
        *present = !value.is_null();
        if *present {
            self.pending = Some(value);
        }
        self.regions.push(Region::Optional, Cursor::Optional);
        Ok(())
    }

    fn optional_end(&mut self) -> Result<()> {
        self.regions.pop(Region::Optional);
        Ok(())
    }

    fn variant_begin(&mut self, labels: &[&str], index: &mut usize) -> Result<()> {
        let value = self.take()?;
        let (label, payload) = match value {
            Value::String(label) => (label.as_str(), &NULL),
            other => other
                .as_variant()
                .ok_or_else(|| Error::type_mismatch("variant", other.kind_name()))?,
        };
        let active = find_label(labels, label, "variant")?;
        *index = active;
        self.pending = Some(payload);
        self.regions.push(Region::Variant, Cursor::Variant { active });
        Ok(())
    }

    fn variant_arm(&mut self, index: usize) -> Result<bool> {
        match self.regions.top_mut(Region::Variant) {
            Cursor::Variant { active } => Ok(*active == index),
            _ => unreachable!("variant regions always hold Cursor::Variant"),
        }
    }

    fn variant_end(&mut self) -> Result<()> {
        self.regions.pop(Region::Variant);
        self.pending = None;
        Ok(())
    }

    fn object_begin(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        match self.take()? {
            Value::Object(map) => {
                self.regions.push(Region::Object, Cursor::Fields(map));
                Ok(())
            }
            other => Err(Error::type_mismatch("object", other.kind_name())),
        }
    }

    fn object_field(&mut self, key: &str) -> Result<()> {
        if let Cursor::Fields(map) = self.regions.top_mut(Region::Object) {
            let map: &'v ValueMap = *map;
            self.pending = Some(map.get(key).unwrap_or(&NULL));
        }
        Ok(())
    }

    fn object_end(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        self.regions.pop(Region::Object);
        Ok(())
    }

    fn tuple_begin(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        self.sequence(Region::Tuple)
    }

    fn tuple_element(&mut self) -> Result<()> {
        if self.advance(Region::Tuple) {
            Ok(())
        } else {
            Err(Error::type_mismatch("another tuple element", "end of array"))
        }
    }

    fn tuple_end(&mut self, _trivial: Option<TrivialLayout>) -> Result<()> {
        self.regions.pop(Region::Tuple);
        Ok(())
    }

    fn list_begin(&mut self, _trivial: bool) -> Result<()> {
        self.sequence(Region::List)
    }

    fn list_next(&mut self) -> Result<bool> {
        Ok(self.advance(Region::List))
    }

    fn list_end(&mut self) -> Result<()> {
        self.regions.pop(Region::List);
        Ok(())
    }

    fn map_begin(&mut self) -> Result<()> {
        match self.take()? {
            Value::Object(map) => {
                self.regions.push(Region::Map, Cursor::Entries(map.iter()));
                Ok(())
            }
            other => Err(Error::type_mismatch("object", other.kind_name())),
        }
    }

    fn map_entry(&mut self, key: &mut String) -> Result<bool> {
        if let Cursor::Entries(iter) = self.regions.top_mut(Region::Map) {
            if let Some((name, value)) = iter.next() {
                key.clone_from(name);
                self.pending = Some(value);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn map_end(&mut self) -> Result<()> {
        self.regions.pop(Region::Map);
        Ok(())
    }

    fn binary_header(&mut self, stride: usize, count: &mut usize, fixed: bool) -> Result<()> {
        self.block = match self.take()? {
            Value::Bytes(bytes) => bytes.clone(),
            Value::Array(values) => values
                .iter()
                .map(|value| match value {
                    Value::Number(number) => u8::from_number(number)
                        .ok_or_else(|| Error::type_mismatch("byte", &number.to_string())),
                    other => Err(Error::type_mismatch("byte", other.kind_name())),
                })
                .collect::<Result<Vec<u8>>>()?,
            other => return Err(Error::type_mismatch("bytes", other.kind_name())),
        };
        let len = self.block.len();
        if fixed {
            if len != *count * stride {
                return Err(Error::type_mismatch(
                    &format!("{} bytes", *count * stride),
                    &format!("{len} bytes"),
                ));
            }
        } else if stride == 0 || len % stride != 0 {
            return Err(Error::type_mismatch(
                &format!("a multiple of {stride} bytes"),
                &format!("{len} bytes"),
            ));
        } else {
            *count = len / stride;
        }
        Ok(())
    }

    fn binary_payload(&mut self, bytes: &mut [u8]) -> Result<()> {
        if bytes.len() != self.block.len() {
            return Err(Error::type_mismatch(
                &format!("{} bytes", bytes.len()),
                &format!("{} bytes", self.block.len()),
            ));
        }
        bytes.copy_from_slice(&self.block);
        self.block.clear();
        Ok(())
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_i64()
            .ok_or_else(|| Error::type_mismatch("i64", value.kind_name()))
    }
}

impl TryFrom<Value> for u64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_u64()
            .ok_or_else(|| Error::type_mismatch("u64", value.kind_name()))
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| Error::type_mismatch("f64", value.kind_name()))
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        value
            .as_bool()
            .ok_or_else(|| Error::type_mismatch("bool", value.kind_name()))
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(Error::type_mismatch("string", other.kind_name())),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty),* $(,)?) => {$(
        impl From<$ty> for Number {
            fn from(value: $ty) -> Self {
                value.to_number()
            }
        }

        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Number(value.to_number())
            }
        }
    )*};
}

impl_from_scalar!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Number(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

impl From<ValueMap> for Value {
    fn from(value: ValueMap) -> Self {
        Value::Object(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{from_value, to_value, Bytes, Shape};
    use std::collections::BTreeMap;

    #[test]
    fn test_number_equality_across_sign_kinds() {
        assert_eq!(Number::Signed(42), Number::Unsigned(42));
        assert_eq!(Number::Unsigned(42), Number::Signed(42));
        assert_ne!(Number::Signed(-42), Number::Unsigned(42));
        assert_ne!(Number::Signed(1), Number::Float(1.0));
    }

    #[test]
    fn test_tryfrom_conversions() {
        assert_eq!(i64::try_from(Value::from(42u8)).unwrap(), 42);
        assert_eq!(u64::try_from(Value::from(7i32)).unwrap(), 7);
        assert!(u64::try_from(Value::from(-7i32)).is_err());
        assert_eq!(f64::try_from(Value::from(2.5f32)).unwrap(), 2.5);
        assert!(bool::try_from(Value::from(1u8)).is_err());
        assert_eq!(String::try_from(Value::from("hi")).unwrap(), "hi");
    }

    #[test]
    fn test_encoder_builds_nested_tree() {
        let mut value = (1u8, vec![Some(2u16), None], "x".to_string());
        let tree = to_value(&mut value).unwrap();
        assert_eq!(
            tree,
            Value::Array(vec![
                Value::from(1u8),
                Value::Array(vec![Value::from(2u16), Value::Null]),
                Value::from("x"),
            ])
        );
    }

    #[test]
    fn test_string_keyed_map_becomes_object() {
        let mut map = BTreeMap::new();
        map.insert("b".to_string(), 2u32);
        map.insert("a".to_string(), 1u32);
        let tree = to_value(&mut map).unwrap();
        assert_eq!(tree.get("a"), Some(&Value::from(1u32)));
        assert_eq!(tree.get("b"), Some(&Value::from(2u32)));
        assert_eq!(from_value::<BTreeMap<String, u32>>(&tree).unwrap(), map);
    }

    #[test]
    fn test_bytes_roundtrip_and_array_form() {
        let mut bytes = Bytes::from(vec![1, 2, 3]);
        let tree = to_value(&mut bytes).unwrap();
        assert_eq!(tree, Value::Bytes(vec![1, 2, 3]));

        let as_array = Value::Array(vec![Value::from(4u8), Value::from(5u8)]);
        assert_eq!(from_value::<Bytes>(&as_array).unwrap().into_inner(), vec![4, 5]);
    }

    #[test]
    fn test_decoder_reports_kind_mismatch() {
        let err = from_value::<u32>(&Value::from("nope")).unwrap_err();
        assert_eq!(err, Error::type_mismatch("u32", "string"));

        let err = from_value::<u8>(&Value::from(300u32)).unwrap_err();
        assert_eq!(err, Error::type_mismatch("u8", "300"));
    }

    #[test]
    fn test_short_tuple_is_an_error() {
        let tree = Value::Array(vec![Value::from(1u8)]);
        assert!(from_value::<(u8, u8)>(&tree).is_err());
    }

    #[test]
    fn test_missing_field_reads_as_absent_optional() {
        struct Partial {
            id: u32,
            note: Option<String>,
        }

        impl Shape for Partial {
            fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
                t.object_begin(None)?;
                t.object_field("id")?;
                self.id.shape(t)?;
                t.object_field("note")?;
                self.note.shape(t)?;
                t.object_end(None)
            }
        }

        impl Default for Partial {
            fn default() -> Self {
                Partial {
                    id: 0,
                    note: Some("stale".to_string()),
                }
            }
        }

        let mut map = ValueMap::new();
        map.insert("id".to_string(), Value::from(9u8));
        let back: Partial = from_value(&Value::Object(map)).unwrap();
        assert_eq!(back.id, 9);
        assert_eq!(back.note, None);
    }

    #[test]
    fn test_display() {
        let mut map = ValueMap::new();
        map.insert("k".to_string(), Value::Bytes(vec![0xab, 0x01]));
        let tree = Value::Array(vec![
            Value::Null,
            Value::from("s"),
            Value::Object(map),
            Value::Variant {
                label: "Some".to_string(),
                value: Box::new(Value::from(1u8)),
            },
        ]);
        assert_eq!(tree.to_string(), r#"[null, "s", {k: 0xab01}, Some(1)]"#);
    }

    #[test]
    fn test_json_rendering_of_variant() {
        let tree = Value::Variant {
            label: "Circle".to_string(),
            value: Box::new(Value::from(2.5f64)),
        };
        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(json, r#"{"Circle":2.5}"#);

        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_variant(), Some(("Circle", &Value::from(2.5f64))));
    }
}
