//! The shape protocol: one traversal per type, reused by every transcoder.
//!
//! A type describes its structure once, in [`Shape::shape`], as a sequence of
//! grammar calls. The same function encodes, decodes, records a schema and
//! fills a value with random data, depending on the [`Transcoder`] it is
//! handed.
//!
//! ```rust
//! use shapewire::{Result, Shape, Transcoder};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Sample {
//!     id: u32,
//!     name: String,
//! }
//!
//! impl Shape for Sample {
//!     fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
//!         t.object_begin(None)?;
//!         t.object_field("id")?;
//!         self.id.shape(t)?;
//!         t.object_field("name")?;
//!         self.name.shape(t)?;
//!         t.object_end(None)
//!     }
//! }
//!
//! let mut sample = Sample { id: 7, name: "seven".to_string() };
//! let bytes = shapewire::to_bytes(&mut sample).unwrap();
//! let back: Sample = shapewire::from_bytes(&bytes).unwrap();
//! assert_eq!(back, sample);
//! ```
//!
//! The [`shape_object!`](crate::shape_object), [`shape_tuple!`](crate::shape_tuple),
//! [`shape_enumerate!`](crate::shape_enumerate) and
//! [`shape_variant!`](crate::shape_variant) macros generate these impls.

use crate::grammar::{Transcoder, TrivialLayout};
use crate::Result;
use bytemuck::Pod;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::ops::{Deref, DerefMut};

/// A type whose structure can be driven through any [`Transcoder`].
///
/// The value is borrowed mutably in every direction: decoders write through
/// the borrow, encoders only read it.
pub trait Shape {
    /// Layout when every byte of the value is bit-copyable, `None` otherwise.
    ///
    /// Types opt in explicitly; the binary codec packs trivial regions at
    /// native alignment.
    const TRIVIAL: Option<TrivialLayout> = None;

    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()>;
}

macro_rules! impl_shape_scalar {
    ($($ty:ty),* $(,)?) => {$(
        impl Shape for $ty {
            const TRIVIAL: Option<TrivialLayout> =
                TrivialLayout::scalar(std::mem::size_of::<$ty>());

            #[inline]
            fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
                t.scalar(self)
            }
        }
    )*};
}

impl_shape_scalar!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl Shape for bool {
    const TRIVIAL: Option<TrivialLayout> = TrivialLayout::scalar(1);

    #[inline]
    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        t.boolean(self)
    }
}

impl Shape for String {
    #[inline]
    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        t.string(self)
    }
}

impl Shape for () {
    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        t.tuple_begin(None)?;
        t.tuple_end(None)
    }
}

impl<E: Shape> Shape for Box<E> {
    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        (**self).shape(t)
    }
}

impl<E: Shape + Default> Shape for Option<E> {
    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        let mut present = self.is_some();
        t.optional_begin(&mut present)?;
        if present {
            self.get_or_insert_with(E::default).shape(t)?;
        } else {
            *self = None;
        }
        t.optional_end()
    }
}

impl<E: Shape + Default> Shape for Vec<E> {
    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        t.list_begin(E::TRIVIAL.is_some())?;
        if T::DECODING {
            self.clear();
            while t.list_next()? {
                let mut element = E::default();
                element.shape(t)?;
                self.push(element);
            }
        } else {
            for element in self.iter_mut() {
                t.list_next()?;
                element.shape(t)?;
            }
        }
        t.list_end()
    }
}

impl<E: Shape, const N: usize> Shape for [E; N] {
    const TRIVIAL: Option<TrivialLayout> = TrivialLayout::array(E::TRIVIAL, N);

    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        t.tuple_begin(Self::TRIVIAL)?;
        for element in self.iter_mut() {
            t.tuple_element()?;
            element.shape(t)?;
        }
        t.tuple_end(Self::TRIVIAL)
    }
}

macro_rules! impl_shape_tuple {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: Shape),+> Shape for ($($name,)+) {
            const TRIVIAL: Option<TrivialLayout> =
                TrivialLayout::record(&[$(<$name as Shape>::TRIVIAL),+]);

            fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
                t.tuple_begin(Self::TRIVIAL)?;
                $(
                    t.tuple_element()?;
                    self.$idx.shape(t)?;
                )+
                t.tuple_end(Self::TRIVIAL)
            }
        }
    };
}

impl_shape_tuple!(A.0);
impl_shape_tuple!(A.0, B.1);
impl_shape_tuple!(A.0, B.1, C.2);
impl_shape_tuple!(A.0, B.1, C.2, D.3);
impl_shape_tuple!(A.0, B.1, C.2, D.3, E.4);
impl_shape_tuple!(A.0, B.1, C.2, D.3, E.4, F.5);

/// A map key.
///
/// Keys that expose their text through [`MapKey::text_mut`] make the map a
/// map region (an object with runtime keys). Every other key type makes the
/// map a list of `(key, value)` tuples, whose order on the wire is the map's
/// iteration order.
pub trait MapKey: Shape + Default + Clone {
    fn text_mut(&mut self) -> Option<&mut String> {
        None
    }
}

impl MapKey for String {
    fn text_mut(&mut self) -> Option<&mut String> {
        Some(self)
    }
}

macro_rules! impl_map_key {
    ($($ty:ty),* $(,)?) => {$( impl MapKey for $ty {} )*};
}

impl_map_key!(i8, i16, i32, i64, u8, u16, u32, u64, bool);

fn keyed_by_text<K: MapKey>() -> bool {
    K::default().text_mut().is_some()
}

fn text_key<K: MapKey>(key: &mut K) -> &mut String {
    match key.text_mut() {
        Some(text) => text,
        None => panic!("grammar violation: map key stopped exposing its text"),
    }
}

fn encode_entries<'a, T, K, V>(
    t: &mut T,
    entries: impl Iterator<Item = (&'a K, &'a mut V)>,
) -> Result<()>
where
    T: Transcoder,
    K: MapKey + 'a,
    V: Shape + 'a,
{
    if keyed_by_text::<K>() {
        t.map_begin()?;
        for (key, value) in entries {
            let mut key = key.clone();
            t.map_entry(text_key(&mut key))?;
            value.shape(t)?;
        }
        return t.map_end();
    }

    let pair = TrivialLayout::record(&[K::TRIVIAL, V::TRIVIAL]);
    t.list_begin(pair.is_some())?;
    for (key, value) in entries {
        let mut key = key.clone();
        t.list_next()?;
        t.tuple_begin(pair)?;
        t.tuple_element()?;
        key.shape(t)?;
        t.tuple_element()?;
        value.shape(t)?;
        t.tuple_end(pair)?;
    }
    t.list_end()
}

fn decode_entries<T, K, V>(t: &mut T, mut insert: impl FnMut(K, V)) -> Result<()>
where
    T: Transcoder,
    K: MapKey,
    V: Shape + Default,
{
    if keyed_by_text::<K>() {
        t.map_begin()?;
        loop {
            let mut key = K::default();
            if !t.map_entry(text_key(&mut key))? {
                break;
            }
            let mut value = V::default();
            value.shape(t)?;
            insert(key, value);
        }
        return t.map_end();
    }

    let pair = TrivialLayout::record(&[K::TRIVIAL, V::TRIVIAL]);
    t.list_begin(pair.is_some())?;
    while t.list_next()? {
        let mut key = K::default();
        let mut value = V::default();
        t.tuple_begin(pair)?;
        t.tuple_element()?;
        key.shape(t)?;
        t.tuple_element()?;
        value.shape(t)?;
        t.tuple_end(pair)?;
        insert(key, value);
    }
    t.list_end()
}

impl<K, V> Shape for BTreeMap<K, V>
where
    K: MapKey + Ord,
    V: Shape + Default,
{
    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        if T::DECODING {
            self.clear();
            decode_entries(t, |key, value| {
                self.insert(key, value);
            })
        } else {
            encode_entries(t, self.iter_mut())
        }
    }
}

impl<K, V, S> Shape for HashMap<K, V, S>
where
    K: MapKey + Eq + Hash,
    V: Shape + Default,
    S: BuildHasher,
{
    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        if T::DECODING {
            self.clear();
            decode_entries(t, |key, value| {
                self.insert(key, value);
            })
        } else {
            encode_entries(t, self.iter_mut())
        }
    }
}

impl<K, V, S> Shape for IndexMap<K, V, S>
where
    K: MapKey + Eq + Hash,
    V: Shape + Default,
    S: BuildHasher,
{
    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        if T::DECODING {
            self.clear();
            decode_entries(t, |key, value| {
                self.insert(key, value);
            })
        } else {
            encode_entries(t, self.iter_mut())
        }
    }
}

/// A vector of plain-old-data moved as one binary block.
///
/// The elements are copied with a single memory copy instead of one grammar
/// call per field. On little-endian hosts the bytes are identical to encoding
/// the same elements one by one as a trivial list.
///
/// # Examples
///
/// ```rust
/// use shapewire::{from_bytes, to_bytes, PodVec};
///
/// let mut samples = PodVec::from(vec![1.5f32, 2.5, 3.5]);
/// let bytes = to_bytes(&mut samples).unwrap();
/// assert_eq!(bytes.len(), 8 + 12);
/// let back: PodVec<f32> = from_bytes(&bytes).unwrap();
/// assert_eq!(back, samples);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PodVec<E: Pod>(pub Vec<E>);

/// A dynamically sized byte buffer.
pub type Bytes = PodVec<u8>;

impl<E: Pod> PodVec<E> {
    #[must_use]
    pub fn new() -> Self {
        PodVec(Vec::new())
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<E> {
        self.0
    }
}

impl<E: Pod> Default for PodVec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Pod> From<Vec<E>> for PodVec<E> {
    fn from(vec: Vec<E>) -> Self {
        PodVec(vec)
    }
}

impl<E: Pod> Deref for PodVec<E> {
    type Target = Vec<E>;

    fn deref(&self) -> &Vec<E> {
        &self.0
    }
}

impl<E: Pod> DerefMut for PodVec<E> {
    fn deref_mut(&mut self) -> &mut Vec<E> {
        &mut self.0
    }
}

impl<E: Pod> Shape for PodVec<E> {
    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        let mut count = self.0.len();
        t.binary_header(std::mem::size_of::<E>(), &mut count, false)?;
        if T::DECODING {
            self.0.clear();
            self.0.resize(count, E::zeroed());
        }
        t.binary_payload(bytemuck::cast_slice_mut(&mut self.0))
    }
}

/// A statically sized byte block; its length never travels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ByteArray<const N: usize>(pub [u8; N]);

impl<const N: usize> Default for ByteArray<N> {
    fn default() -> Self {
        ByteArray([0; N])
    }
}

impl<const N: usize> Shape for ByteArray<N> {
    const TRIVIAL: Option<TrivialLayout> = TrivialLayout::array(TrivialLayout::scalar(1), N);

    fn shape<T: Transcoder>(&mut self, t: &mut T) -> Result<()> {
        let mut count = N;
        t.binary_header(1, &mut count, true)?;
        t.binary_payload(&mut self.0)
    }
}
