use shapewire::{
    from_bytes, shape_enumerate, shape_object, shape_tuple, shape_variant, to_bytes,
    to_debug_string, value, Number, Schema, Shape, Token, TrivialLayout, Value, ValueMap,
};

#[derive(Debug, Default, PartialEq)]
struct Color(u8, u8, u8);
shape_tuple!(#[trivial] Color(0: u8, 1: u8, 2: u8));

#[derive(Debug, Default, PartialEq)]
struct Label(String, Option<u32>);
shape_tuple!(Label(0, 1));

#[derive(Debug, Default, PartialEq)]
struct Pixel {
    x: u16,
    y: u16,
    color: Color,
}
shape_object!(#[trivial] Pixel { x: u16, y: u16, color: Color });

#[derive(Debug, Default, PartialEq)]
struct Empty {}
shape_object!(Empty {});

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum Axis {
    #[default]
    X,
    Y,
    Z,
}
shape_enumerate!(Axis { X, Y, Z });

#[derive(Debug, Default, PartialEq)]
enum Brush {
    #[default]
    Eraser,
    Solid(Color),
    Named(Label),
    Mirror(Axis),
}
shape_variant!(Brush { Eraser, Solid(Color), Named(Label), Mirror(Axis) });

#[test]
fn test_shape_object_trivial_layout() {
    assert_eq!(Color::TRIVIAL, Some(TrivialLayout { size: 3, align: 1 }));
    assert_eq!(Pixel::TRIVIAL, Some(TrivialLayout { size: 8, align: 2 }));
    assert_eq!(Label::TRIVIAL, None);
    assert_eq!(Brush::TRIVIAL, None);
}

#[test]
fn test_shape_object_bytes() {
    let mut pixel = Pixel {
        x: 1,
        y: 2,
        color: Color(3, 4, 5),
    };
    let bytes = to_bytes(&mut pixel).unwrap();
    assert_eq!(bytes, vec![1, 0, 2, 0, 3, 4, 5, 0]);
    assert_eq!(from_bytes::<Pixel>(&bytes).unwrap(), pixel);
}

#[test]
fn test_shape_object_empty() {
    assert!(to_bytes(&mut Empty {}).unwrap().is_empty());
    assert_eq!(
        Schema::of::<Empty>().tokens(),
        &[
            Token::ObjectBegin { trivial: None },
            Token::ObjectEnd { trivial: None }
        ]
    );
}

#[test]
fn test_shape_tuple_dense() {
    let mut label = Label("tip".to_string(), Some(9));
    let bytes = to_bytes(&mut label).unwrap();
    assert_eq!(bytes, vec![b't', b'i', b'p', 0, 1, 9, 0, 0, 0]);
    assert_eq!(from_bytes::<Label>(&bytes).unwrap(), label);
}

#[test]
fn test_shape_enumerate_every_label() {
    for (index, mut axis) in [Axis::X, Axis::Y, Axis::Z].into_iter().enumerate() {
        let bytes = to_bytes(&mut axis).unwrap();
        assert_eq!(bytes, (index as u32).to_le_bytes().to_vec());
        assert_eq!(from_bytes::<Axis>(&bytes).unwrap(), axis);
    }
    assert_eq!(
        Schema::of::<Axis>().tokens(),
        &[Token::Enumerate {
            labels: vec!["X".to_string(), "Y".to_string(), "Z".to_string()]
        }]
    );
}

#[test]
fn test_shape_variant_roundtrip() {
    for mut brush in [
        Brush::Eraser,
        Brush::Solid(Color(1, 2, 3)),
        Brush::Named(Label("n".to_string(), None)),
        Brush::Mirror(Axis::Z),
    ] {
        let bytes = to_bytes(&mut brush).unwrap();
        assert_eq!(from_bytes::<Brush>(&bytes).unwrap(), brush);
    }
}

#[test]
fn test_shape_variant_debug() {
    assert_eq!(to_debug_string(&mut Brush::Eraser), "Eraser\n");
    assert_eq!(to_debug_string(&mut Brush::Mirror(Axis::Y)), "Mirror Y\n");
    assert_eq!(
        to_debug_string(&mut Brush::Solid(Color(1, 2, 3))),
        "Solid (\n  1\n  2\n  3\n)\n"
    );
}

#[test]
fn test_value_macro_null() {
    assert_eq!(value!(null), Value::Null);
}

#[test]
fn test_value_macro_booleans() {
    assert_eq!(value!(true), Value::Bool(true));
    assert_eq!(value!(false), Value::Bool(false));
}

#[test]
fn test_value_macro_numbers() {
    assert_eq!(value!(42u8), Value::Number(Number::Unsigned(42)));
    assert_eq!(value!(3.5), Value::Number(Number::Float(3.5)));
    assert_eq!(value!(-123), Value::Number(Number::Signed(-123)));
}

#[test]
fn test_value_macro_strings() {
    assert_eq!(value!("hello world"), Value::String("hello world".to_string()));
    assert_eq!(value!(""), Value::String(String::new()));
}

#[test]
fn test_value_macro_arrays() {
    assert_eq!(value!([]), Value::Array(vec![]));
    assert_eq!(
        value!([1u8, "two", null]),
        Value::Array(vec![Value::from(1u8), Value::from("two"), Value::Null])
    );
}

#[test]
fn test_value_macro_nested_objects() {
    let data = value!({
        "user": {
            "name": "Alice",
            "roles": ["admin", "dev"]
        },
        "active": true
    });

    let mut roles = Vec::new();
    roles.push(Value::from("admin"));
    roles.push(Value::from("dev"));
    let mut user = ValueMap::new();
    user.insert("name".to_string(), Value::from("Alice"));
    user.insert("roles".to_string(), Value::Array(roles));
    let mut expected = ValueMap::new();
    expected.insert("user".to_string(), Value::Object(user));
    expected.insert("active".to_string(), Value::Bool(true));

    assert_eq!(data, Value::Object(expected));
    assert_eq!(
        data.get("user").and_then(|u| u.get("name")).and_then(Value::as_str),
        Some("Alice")
    );
}
