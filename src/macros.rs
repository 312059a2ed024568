/// Implements [`Shape`](crate::Shape) for a struct with named fields.
///
/// Fields are visited in the order they are listed. Prefix the struct name
/// with `#[trivial]` and give each field its type to make the record
/// trivial; the binary codec then packs it at native alignment. A trivial
/// record whose members are not all trivial fails to compile.
///
/// ```rust
/// use shapewire::{shape_object, Shape, TrivialLayout};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Vertex { x: f32, y: f64, z: f32 }
/// shape_object!(#[trivial] Vertex { x: f32, y: f64, z: f32 });
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Named { id: u32, name: String }
/// shape_object!(Named { id, name });
///
/// assert_eq!(Vertex::TRIVIAL, Some(TrivialLayout { size: 24, align: 8 }));
/// assert_eq!(Named::TRIVIAL, None);
/// ```
#[macro_export]
macro_rules! shape_object {
    (#[trivial] $name:ident { $($field:ident : $ty:ty),+ $(,)? }) => {
        impl $crate::Shape for $name {
            const TRIVIAL: ::core::option::Option<$crate::TrivialLayout> =
                $crate::TrivialLayout::record(&[$(<$ty as $crate::Shape>::TRIVIAL),+]);

            fn shape<T: $crate::Transcoder>(&mut self, t: &mut T) -> $crate::Result<()> {
                t.object_begin(Self::TRIVIAL)?;
                $(
                    t.object_field(stringify!($field))?;
                    $crate::Shape::shape(&mut self.$field, t)?;
                )+
                t.object_end(Self::TRIVIAL)
            }
        }

        const _: () = assert!(
            <$name as $crate::Shape>::TRIVIAL.is_some(),
            concat!(stringify!($name), " is marked trivial but has a non-trivial field")
        );
    };

    ($name:ident { $($field:ident),* $(,)? }) => {
        impl $crate::Shape for $name {
            fn shape<T: $crate::Transcoder>(&mut self, t: &mut T) -> $crate::Result<()> {
                t.object_begin(None)?;
                $(
                    t.object_field(stringify!($field))?;
                    $crate::Shape::shape(&mut self.$field, t)?;
                )*
                t.object_end(None)
            }
        }
    };
}

/// Implements [`Shape`](crate::Shape) for a tuple struct.
///
/// ```rust
/// use shapewire::{shape_tuple, Shape};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Pair(u16, u16);
/// shape_tuple!(#[trivial] Pair(0: u16, 1: u16));
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Tagged(String, u8);
/// shape_tuple!(Tagged(0, 1));
///
/// assert!(Pair::TRIVIAL.is_some());
/// assert!(Tagged::TRIVIAL.is_none());
/// ```
#[macro_export]
macro_rules! shape_tuple {
    (#[trivial] $name:ident ( $($index:tt : $ty:ty),+ $(,)? )) => {
        impl $crate::Shape for $name {
            const TRIVIAL: ::core::option::Option<$crate::TrivialLayout> =
                $crate::TrivialLayout::record(&[$(<$ty as $crate::Shape>::TRIVIAL),+]);

            fn shape<T: $crate::Transcoder>(&mut self, t: &mut T) -> $crate::Result<()> {
                t.tuple_begin(Self::TRIVIAL)?;
                $(
                    t.tuple_element()?;
                    $crate::Shape::shape(&mut self.$index, t)?;
                )+
                t.tuple_end(Self::TRIVIAL)
            }
        }

        const _: () = assert!(
            <$name as $crate::Shape>::TRIVIAL.is_some(),
            concat!(stringify!($name), " is marked trivial but has a non-trivial element")
        );
    };

    ($name:ident ( $($index:tt),* $(,)? )) => {
        impl $crate::Shape for $name {
            fn shape<T: $crate::Transcoder>(&mut self, t: &mut T) -> $crate::Result<()> {
                t.tuple_begin(None)?;
                $(
                    t.tuple_element()?;
                    $crate::Shape::shape(&mut self.$index, t)?;
                )*
                t.tuple_end(None)
            }
        }
    };
}

/// Implements [`Shape`](crate::Shape) for a fieldless enum as an enumerate.
///
/// The wire index of each variant is its position in the list.
///
/// ```rust
/// use shapewire::{from_bytes, shape_enumerate, to_bytes};
///
/// #[derive(Clone, Copy, Debug, Default, PartialEq)]
/// enum Level { #[default] Low, High }
/// shape_enumerate!(Level { Low, High });
///
/// assert_eq!(to_bytes(&mut Level::High).unwrap(), vec![1, 0, 0, 0]);
/// assert_eq!(from_bytes::<Level>(&[1, 0, 0, 0]).unwrap(), Level::High);
/// ```
#[macro_export]
macro_rules! shape_enumerate {
    ($name:ident { $($label:ident),+ $(,)? }) => {
        impl $crate::Shape for $name {
            #[allow(unused_assignments)]
            fn shape<T: $crate::Transcoder>(&mut self, t: &mut T) -> $crate::Result<()> {
                const LABELS: &[&str] = &[$(stringify!($label)),+];
                let mut index = 0usize;
                let mut _i = 0usize;
                $(
                    if matches!(*self, $name::$label) {
                        index = _i;
                    }
                    _i += 1;
                )+
                t.enumerate(LABELS, &mut index)?;
                if T::DECODING {
                    _i = 0;
                    $(
                        if index == _i {
                            *self = $name::$label;
                        }
                        _i += 1;
                    )+
                }
                Ok(())
            }
        }
    };
}

/// Implements [`Shape`](crate::Shape) for an enum whose variants carry at
/// most one payload each.
///
/// Every arm is offered to the transcoder in declaration order.
///
/// ```rust
/// use shapewire::{from_bytes, shape_variant, to_bytes};
///
/// #[derive(Debug, Default, PartialEq)]
/// enum Reading {
///     #[default]
///     Missing,
///     Celsius(f32),
///     Note(String),
/// }
/// shape_variant!(Reading { Missing, Celsius(f32), Note(String) });
///
/// let mut reading = Reading::Note("ok".to_string());
/// let bytes = to_bytes(&mut reading).unwrap();
/// assert_eq!(bytes, vec![2, 0, 0, 0, b'o', b'k', 0]);
/// assert_eq!(from_bytes::<Reading>(&bytes).unwrap(), reading);
/// ```
#[macro_export]
macro_rules! shape_variant {
    ($name:ident { $($label:ident $(( $ty:ty ))?),+ $(,)? }) => {
        impl $crate::Shape for $name {
            #[allow(unused_assignments)]
            fn shape<T: $crate::Transcoder>(&mut self, t: &mut T) -> $crate::Result<()> {
                const LABELS: &[&str] = &[$(stringify!($label)),+];
                let mut index = 0usize;
                let mut _i = 0usize;
                $(
                    if matches!(*self, $crate::shape_variant!(@pattern $name $label $($ty)?)) {
                        index = _i;
                    }
                    _i += 1;
                )+
                t.variant_begin(LABELS, &mut index)?;
                _i = 0;
                $(
                    if t.variant_arm(_i)? {
                        $crate::shape_variant!(@arm self t $name $label $($ty)?);
                    }
                    _i += 1;
                )+
                t.variant_end()
            }
        }
    };

    (@pattern $name:ident $label:ident) => {
        $name::$label
    };
    (@pattern $name:ident $label:ident $ty:ty) => {
        $name::$label(_)
    };

    (@arm $this:ident $t:ident $name:ident $label:ident) => {
        if T::DECODING {
            *$this = $name::$label;
        }
    };
    (@arm $this:ident $t:ident $name:ident $label:ident $ty:ty) => {
        if T::DECODING && !matches!(*$this, $name::$label(_)) {
            *$this = $name::$label(<$ty as ::core::default::Default>::default());
        }
        if let $name::$label(payload) = $this {
            $crate::Shape::shape(payload, $t)?;
        }
    };
}

/// Builds a [`Value`](crate::Value) from JSON-like syntax.
///
/// ```rust
/// use shapewire::{value, Value};
///
/// let data = value!({
///     "name": "Alice",
///     "age": 30u32,
///     "tags": ["rust", "wire"]
/// });
/// assert_eq!(data.get("name").and_then(Value::as_str), Some("Alice"));
/// assert_eq!(data.get("age").and_then(Value::as_u64), Some(30));
/// ```
#[macro_export]
macro_rules! value {
    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::Array(::std::vec::Vec::new())
    };

    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::Array(vec![$($crate::value!($elem)),*])
    };

    ({}) => {
        $crate::Value::Object($crate::ValueMap::new())
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut object = $crate::ValueMap::new();
        $(
            object.insert($key.to_string(), $crate::value!($value));
        )*
        $crate::Value::Object(object)
    }};

    // Any other expression with a `Value` conversion
    ($e:expr) => {
        $crate::Value::from($e)
    };
}

#[cfg(test)]
mod tests {
    use crate::{from_bytes, to_bytes, Number, Schema, Shape, Token, TrivialLayout, Value, ValueMap};

    #[derive(Debug, Default, PartialEq)]
    struct Sample {
        x: f32,
        y: f64,
        z: f32,
    }
    shape_object!(#[trivial] Sample { x: f32, y: f64, z: f32 });

    #[derive(Debug, Default, PartialEq)]
    struct Wrapper(u8, String);
    shape_tuple!(Wrapper(0, 1));

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    enum Mode {
        #[default]
        Idle,
        Busy,
    }
    shape_enumerate!(Mode { Idle, Busy });

    #[derive(Debug, Default, PartialEq)]
    enum Event {
        #[default]
        Reset,
        Move(Sample),
        Say(Wrapper),
    }
    shape_variant!(Event { Reset, Move(Sample), Say(Wrapper) });

    #[test]
    fn test_trivial_object_layout() {
        assert_eq!(Sample::TRIVIAL, Some(TrivialLayout { size: 24, align: 8 }));
        assert_eq!(Wrapper::TRIVIAL, None);
    }

    #[test]
    fn test_enumerate_roundtrip() {
        let bytes = to_bytes(&mut Mode::Busy).unwrap();
        assert_eq!(bytes, vec![1, 0, 0, 0]);
        assert_eq!(from_bytes::<Mode>(&bytes).unwrap(), Mode::Busy);
        assert!(from_bytes::<Mode>(&[2, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_variant_roundtrip() {
        for mut event in [
            Event::Reset,
            Event::Move(Sample { x: 1.0, y: 2.0, z: 3.0 }),
            Event::Say(Wrapper(4, "hi".to_string())),
        ] {
            let bytes = to_bytes(&mut event).unwrap();
            assert_eq!(from_bytes::<Event>(&bytes).unwrap(), event);
        }
    }

    #[test]
    fn test_variant_schema_offers_every_arm() {
        let schema = Schema::of::<Event>();
        let arms: Vec<usize> = schema
            .tokens()
            .iter()
            .filter_map(|token| match token {
                Token::VariantArm { index } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(arms, vec![0, 1, 2]);
    }

    #[test]
    fn test_value_macro_primitives() {
        assert_eq!(value!(null), Value::Null);
        assert_eq!(value!(true), Value::Bool(true));
        assert_eq!(value!(false), Value::Bool(false));
        assert_eq!(value!(42i64), Value::Number(Number::Signed(42)));
        assert_eq!(value!(3.5), Value::Number(Number::Float(3.5)));
        assert_eq!(value!("hello"), Value::String("hello".to_string()));
    }

    #[test]
    fn test_value_macro_nested() {
        assert_eq!(value!([]), Value::Array(vec![]));
        assert_eq!(value!({}), Value::Object(ValueMap::new()));

        let obj = value!({
            "name": "Alice",
            "scores": [1u8, 2u8]
        });
        match obj {
            Value::Object(map) => {
                assert_eq!(map.len(), 2);
                assert_eq!(map.get("name"), Some(&Value::String("Alice".to_string())));
                assert_eq!(
                    map.get("scores"),
                    Some(&Value::Array(vec![Value::from(1u8), Value::from(2u8)]))
                );
            }
            _ => panic!("Expected object"),
        }
    }
}
