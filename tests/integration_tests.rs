use bytemuck::{Pod, Zeroable};
use shapewire::chunk::{ChunkReader, ChunkWriter};
use shapewire::{
    from_bytes, from_value, random_value, shape_enumerate, shape_object, shape_variant, to_bytes,
    to_debug_string, to_value, transcode_from_value, transcode_to_debug, transcode_to_value,
    value, Error, PodVec, RandomOptions, Schema, Shape, Token, Value,
};
use std::collections::BTreeMap;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Default, PartialEq)]
struct Vertex {
    a: f32,
    b: f64,
    c: f32,
}
shape_object!(#[trivial] Vertex { a: f32, b: f64, c: f32 });

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
struct Particle {
    x: f32,
    y: f32,
    mass: f64,
}
shape_object!(#[trivial] Particle { x: f32, y: f32, mass: f64 });

#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum Role {
    #[default]
    Guest,
    Member,
    Admin,
}
shape_enumerate!(Role { Guest, Member, Admin });

#[derive(Debug, Default, PartialEq)]
struct User {
    id: u32,
    name: String,
    role: Role,
    email: Option<String>,
    tags: Vec<String>,
}
shape_object!(User { id, name, role, email, tags });

#[derive(Debug, Default, PartialEq)]
struct Order {
    order_id: u64,
    customer: User,
    items: Vec<(String, u32)>,
    points: Vec<Particle>,
    attributes: BTreeMap<String, i32>,
}
shape_object!(Order { order_id, customer, items, points, attributes });

#[derive(Debug, Default, PartialEq)]
enum Command {
    #[default]
    Stop,
    Jump(u16),
    Say(String),
    Spawn(Vec<Particle>),
    Tag(Option<(u8, bool)>),
    Notes(BTreeMap<String, i32>),
}
shape_variant!(Command {
    Stop,
    Jump(u16),
    Say(String),
    Spawn(Vec<Particle>),
    Tag(Option<(u8, bool)>),
    Notes(BTreeMap<String, i32>),
});

fn sample_order() -> Order {
    let mut attributes = BTreeMap::new();
    attributes.insert("priority".to_string(), 2);
    attributes.insert("weight".to_string(), -40);
    Order {
        order_id: 12345,
        customer: User {
            id: 7,
            name: "Alice".to_string(),
            role: Role::Admin,
            email: Some("alice@example.com".to_string()),
            tags: vec!["vip".to_string()],
        },
        items: vec![("WIDGET".to_string(), 3), ("GADGET".to_string(), 1)],
        points: vec![
            Particle { x: 1.0, y: 2.0, mass: 0.5 },
            Particle { x: -1.0, y: 0.25, mass: 8.0 },
        ],
        attributes,
    }
}

#[test]
fn test_nested_roundtrip() {
    init_logging();
    let mut order = sample_order();
    let bytes = to_bytes(&mut order).unwrap();
    let order_back: Order = from_bytes(&bytes).unwrap();
    assert_eq!(order, order_back);
}

#[test]
fn test_trivial_record_layout() {
    let mut vertex = Vertex { a: 1.5, b: 2.5, c: 3.5 };
    let bytes = to_bytes(&mut vertex).unwrap();
    assert_eq!(
        bytes,
        vec![
            0x00, 0x00, 0xC0, 0x3F, 0x00, 0x00, 0x00, 0x00, //
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x40, //
            0x00, 0x00, 0x60, 0x40, 0x00, 0x00, 0x00, 0x00,
        ]
    );
    assert_eq!(from_bytes::<Vertex>(&bytes).unwrap(), vertex);
}

#[test]
fn test_trivial_list_matches_bulk_copy() {
    let particles: Vec<Particle> = (0..5)
        .map(|i| Particle {
            x: i as f32,
            y: -(i as f32) / 2.0,
            mass: f64::from(i) * 1.25,
        })
        .collect();

    let element_wise = to_bytes(&mut particles.clone()).unwrap();
    let bulk = to_bytes(&mut PodVec::from(particles.clone())).unwrap();
    if cfg!(target_endian = "little") {
        assert_eq!(element_wise, bulk);
    }
    assert_eq!(element_wise.len(), 8 + 5 * 16);

    let back: PodVec<Particle> = from_bytes(&element_wise).unwrap();
    assert_eq!(back.into_inner(), particles);
}

#[test]
fn test_every_strict_prefix_fails() {
    let bytes = to_bytes(&mut sample_order()).unwrap();
    for len in 0..bytes.len() {
        assert!(
            from_bytes::<Order>(&bytes[..len]).is_err(),
            "prefix of {len} bytes decoded"
        );
    }
}

#[test]
fn test_trailing_bytes_rejected() {
    let mut bytes = to_bytes(&mut Command::Jump(3)).unwrap();
    bytes.push(0);
    assert_eq!(
        from_bytes::<Command>(&bytes).unwrap_err(),
        Error::TrailingBytes { offset: 6, count: 1 }
    );
}

#[test]
fn test_schema_equality() {
    assert_eq!(Schema::of::<Order>(), Schema::of::<Order>());
    assert_eq!(Schema::of::<(u32, String)>(), Schema::of::<(u32, String)>());
    assert_ne!(Schema::of::<(u32, String)>(), Schema::of::<(u64, String)>());
    assert_ne!(Schema::of::<Vec<u8>>(), Schema::of::<PodVec<u8>>());
}

#[test]
fn test_schema_offers_one_arm_per_label() {
    let schema = Schema::of::<Command>();
    let labels = match &schema.tokens()[0] {
        Token::VariantBegin { labels } => labels.clone(),
        other => panic!("expected a variant, found {other:?}"),
    };
    assert_eq!(labels, vec!["Stop", "Jump", "Say", "Spawn", "Tag", "Notes"]);

    let arms: Vec<usize> = schema
        .tokens()
        .iter()
        .filter_map(|token| match token {
            Token::VariantArm { index } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(arms, (0..labels.len()).collect::<Vec<_>>());
}

#[test]
fn test_replay_matches_direct_dump() {
    init_logging();
    let schema = Schema::of::<Order>();
    let mut order = sample_order();
    let bytes = to_bytes(&mut order).unwrap();
    assert_eq!(
        transcode_to_debug(&schema, &bytes).unwrap(),
        to_debug_string(&mut order)
    );
}

#[test]
fn test_replay_through_value_tree() {
    let schema = Schema::of::<Order>();
    let mut order = sample_order();
    let bytes = to_bytes(&mut order).unwrap();

    let value = transcode_to_value(&schema, &bytes).unwrap();
    assert_eq!(value, to_value(&mut order).unwrap());
    assert_eq!(transcode_from_value(&schema, &value).unwrap(), bytes);
    assert_eq!(from_value::<Order>(&value).unwrap(), order);
}

#[test]
fn test_random_variants_roundtrip() {
    init_logging();
    let schema = Schema::of::<Command>();
    let mut seen = [false; 6];
    for seed in 0..1000 {
        let options = RandomOptions::new().with_seed(seed).with_max_len(4);
        let mut command: Command = random_value(&options).unwrap();
        seen[match command {
            Command::Stop => 0,
            Command::Jump(_) => 1,
            Command::Say(_) => 2,
            Command::Spawn(_) => 3,
            Command::Tag(_) => 4,
            Command::Notes(_) => 5,
        }] = true;

        let bytes = to_bytes(&mut command).unwrap();
        assert_eq!(from_bytes::<Command>(&bytes).unwrap(), command);
        assert_eq!(
            transcode_to_debug(&schema, &bytes).unwrap(),
            to_debug_string(&mut command)
        );
    }
    assert!(seen.iter().all(|arm| *arm), "arms never generated: {seen:?}");
}

#[test]
fn test_value_tree_from_macro() {
    let user: User = from_value(&value!({
        "id": 9u32,
        "name": "Bob",
        "role": "Member",
        "tags": ["a", "b"]
    }))
    .unwrap();
    assert_eq!(
        user,
        User {
            id: 9,
            name: "Bob".to_string(),
            role: Role::Member,
            email: None,
            tags: vec!["a".to_string(), "b".to_string()],
        }
    );

    let err = from_value::<User>(&value!({ "id": "nine" })).unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
}

#[test]
fn test_schema_travels_with_data_in_chunk_file() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.bin");

    let mut order = sample_order();
    let mut schema = Schema::of::<Order>();
    {
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ChunkWriter::new(file).unwrap();
        writer.write("schema", &mut schema).unwrap();
        writer.write("order", &mut order).unwrap();
        writer.flush().unwrap();
    }

    let file = std::fs::read(&path).unwrap();
    let reader = ChunkReader::parse(&file).unwrap();
    assert_eq!(reader.read::<Order>("order").unwrap(), order);

    let stored: Schema = reader.read("schema").unwrap();
    assert_eq!(stored, schema);
    let data = reader.get("order").unwrap().data;
    let value = transcode_to_value(&stored, data).unwrap();
    assert_eq!(value.get("order_id").and_then(Value::as_u64), Some(12345));
    assert_eq!(
        reader.get("order").unwrap().type_hash,
        stored.fingerprint().unwrap()
    );
}

#[test]
fn test_fingerprint_is_stable_per_type() {
    let a = Schema::of::<Order>().fingerprint().unwrap();
    let b = Schema::of::<Order>().fingerprint().unwrap();
    let c = Schema::of::<User>().fingerprint().unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_schema_mismatch_is_an_error() {
    let bytes = to_bytes(&mut Command::Say("hello".to_string())).unwrap();
    let wrong = Schema::of::<(u32, u8)>();
    assert!(transcode_to_debug(&wrong, &bytes).is_err());
}
