//! Property-based tests for the core codec guarantees
//!
//! These tests complement the integration tests by checking round trips,
//! truncation handling and schema replay across generated inputs.

use proptest::prelude::*;
use shapewire::{
    from_bytes, from_value, to_bytes, to_debug_string, to_value, transcode_to_debug,
    transcode_to_value, PodVec, Schema, Shape,
};
use std::collections::BTreeMap;

fn roundtrip<T: Shape + Default + PartialEq + std::fmt::Debug>(value: &mut T) -> bool {
    match to_bytes(value) {
        Ok(encoded) => match from_bytes::<T>(&encoded) {
            Ok(decoded) => *value == decoded,
            Err(e) => {
                eprintln!("Decode failed: {}", e);
                eprintln!("Encoded was: {:02x?}", encoded);
                false
            }
        },
        Err(e) => {
            eprintln!("Encode failed: {}", e);
            false
        }
    }
}

fn nul_free_string() -> impl Strategy<Value = String> {
    "\\PC{0,24}"
}

proptest! {
    // Primitive types
    #[test]
    fn prop_i32(mut n in any::<i32>()) {
        prop_assert!(roundtrip(&mut n));
    }

    #[test]
    fn prop_u64(mut n in any::<u64>()) {
        prop_assert!(roundtrip(&mut n));
    }

    #[test]
    fn prop_f64_bits(n in any::<f64>()) {
        let bytes = to_bytes(&mut n.clone()).unwrap();
        let back: f64 = from_bytes(&bytes).unwrap();
        prop_assert_eq!(back.to_bits(), n.to_bits());
    }

    #[test]
    fn prop_bool(mut b in any::<bool>()) {
        prop_assert!(roundtrip(&mut b));
    }

    #[test]
    fn prop_string(mut s in nul_free_string()) {
        prop_assert!(roundtrip(&mut s));
    }

    // Collections
    #[test]
    fn prop_vec_i32(mut v in prop::collection::vec(any::<i32>(), 0..20)) {
        prop_assert!(roundtrip(&mut v));
    }

    #[test]
    fn prop_vec_string(mut v in prop::collection::vec(nul_free_string(), 0..8)) {
        prop_assert!(roundtrip(&mut v));
    }

    #[test]
    fn prop_option_i32(mut opt in proptest::option::of(any::<i32>())) {
        prop_assert!(roundtrip(&mut opt));
    }

    #[test]
    fn prop_tuple_padded(mut t in (any::<u8>(), any::<u32>(), any::<u16>())) {
        prop_assert!(roundtrip(&mut t));
    }

    #[test]
    fn prop_string_map(mut m in prop::collection::btree_map(nul_free_string(), any::<i64>(), 0..8)) {
        prop_assert!(roundtrip(&mut m));
    }

    #[test]
    fn prop_pod_vec_matches_trivial_list(v in prop::collection::vec(any::<u32>(), 0..32)) {
        let element_wise = to_bytes(&mut v.clone()).unwrap();
        let bulk = to_bytes(&mut PodVec::from(v.clone())).unwrap();
        if cfg!(target_endian = "little") {
            prop_assert_eq!(element_wise, bulk);
        }
    }

    // Error handling
    #[test]
    fn prop_truncation_never_decodes(v in prop::collection::vec((any::<u16>(), nul_free_string()), 1..6)) {
        let bytes = to_bytes(&mut v.clone()).unwrap();
        for len in 0..bytes.len() {
            prop_assert!(from_bytes::<Vec<(u16, String)>>(&bytes[..len]).is_err());
        }
    }

    #[test]
    fn prop_garbage_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = from_bytes::<Vec<(Option<u8>, String, BTreeMap<String, u16>)>>(&bytes);
        let _ = from_bytes::<Schema>(&bytes);
    }

    // Replay and value trees
    #[test]
    fn prop_replay_matches_direct(mut v in prop::collection::vec(
        (any::<i16>(), proptest::option::of(nul_free_string()), any::<bool>()),
        0..6,
    )) {
        let schema = Schema::of::<Vec<(i16, Option<String>, bool)>>();
        let bytes = to_bytes(&mut v).unwrap();
        prop_assert_eq!(transcode_to_debug(&schema, &bytes).unwrap(), to_debug_string(&mut v));
        prop_assert_eq!(transcode_to_value(&schema, &bytes).unwrap(), to_value(&mut v).unwrap());
    }

    #[test]
    fn prop_value_roundtrip(mut m in prop::collection::btree_map(nul_free_string(), any::<u32>(), 0..8)) {
        let value = to_value(&mut m).unwrap();
        prop_assert_eq!(from_value::<BTreeMap<String, u32>>(&value).unwrap(), m);
    }
}
