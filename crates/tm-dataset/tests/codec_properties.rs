//! Property-based tests for the dataset codecs.

use proptest::prelude::*;
use serde_json::{json, Value as Json};
use tm_common::{DiscriminatorKey, Literal, SchemaEntry, SchemaStore, TypeNode};
use tm_dataset::{decode_store, encode_store, literal_from_bytes, literal_to_bytes};

fn json_strategy() -> impl Strategy<Value = Json> {
    let leaf = prop_oneof![
        Just(Json::Null),
        any::<bool>().prop_map(Json::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        any::<u64>().prop_map(|n| json!(n)),
        (-1.0e9f64..1.0e9).prop_map(|f| json!(f)),
        "[a-z ]{0,8}".prop_map(Json::String),
    ];
    leaf.prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Json::Array),
            prop::collection::btree_map("[a-z_]{1,5}", inner, 0..4)
                .prop_map(|m| Json::Object(m.into_iter().collect())),
        ]
    })
}

fn literal_strategy() -> impl Strategy<Value = Literal> {
    prop_oneof![
        1 => Just(Literal::Absent),
        6 => json_strategy().prop_map(Literal::from),
    ]
}

fn key_strategy() -> impl Strategy<Value = DiscriminatorKey> {
    prop::collection::btree_map("[a-z]{1,3}(\\.[a-z]{1,3})?", literal_strategy(), 0..3)
        .prop_map(|m| m.into_iter().collect())
}

fn event_strategy() -> impl Strategy<Value = (Vec<Json>, Vec<(DiscriminatorKey, Vec<Json>)>)> {
    (
        prop::collection::vec(json_strategy(), 0..4),
        prop::collection::vec((key_strategy(), prop::collection::vec(json_strategy(), 0..3)), 0..3),
    )
}

fn store_strategy() -> impl Strategy<Value = SchemaStore> {
    prop::collection::btree_map("[A-Z_]{1,12}", event_strategy(), 0..4).prop_map(|events| {
        let mut store = SchemaStore::new();
        for (name, (base_samples, entries)) in events {
            let (schema, _) = store.get_or_insert(&name);
            for sample in &base_samples {
                schema.base.merge(sample);
            }
            for (key, samples) in entries {
                if schema.find_entry(&key).is_some() {
                    continue;
                }
                let mut entry = SchemaEntry::new(key);
                for sample in &samples {
                    entry.schema.merge(sample);
                }
                schema.entries.push(entry);
            }
        }
        store
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Decoding an encoded store yields the same store.
    #[test]
    fn store_roundtrip(store in store_strategy()) {
        let bytes = encode_store(&store).expect("encode");
        let decoded = decode_store(&bytes).expect("decode");
        prop_assert_eq!(decoded, store);
    }

    /// Literals built from arbitrary JSON survive encoding, numbers included.
    #[test]
    fn literal_roundtrip(literal in literal_strategy()) {
        let bytes = literal_to_bytes(&literal).expect("encode");
        prop_assert_eq!(literal_from_bytes(&bytes).expect("decode"), literal);
    }

    /// Arbitrary bytes never panic the decoder.
    #[test]
    fn decode_arbitrary_bytes_does_not_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode_store(&bytes);
        let _ = tm_dataset::store_codec::decode_store_raw(&bytes);
        let _ = tm_dataset::node_from_bytes(&bytes);
        let _ = tm_dataset::key_from_bytes(&bytes);
    }

    /// Flipping one byte of an encoded store is either detected or decodes
    /// to some store; it never panics.
    #[test]
    fn corrupted_store_does_not_panic(
        store in store_strategy(),
        index in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let mut raw = tm_dataset::store_codec::encode_store_raw(&store).expect("encode");
        if !raw.is_empty() {
            let i = index.index(raw.len());
            raw[i] ^= flip;
            let _ = tm_dataset::store_codec::decode_store_raw(&raw);
        }
    }
}

#[test]
fn test_deep_node_roundtrips_through_store() {
    let mut value = json!(1);
    for _ in 0..100 {
        value = json!({ "n": value });
    }
    let mut store = SchemaStore::new();
    let (schema, _) = store.get_or_insert("DEEP");
    schema.base = TypeNode::from_value(&value);

    let decoded = decode_store(&encode_store(&store).unwrap()).unwrap();
    assert_eq!(decoded.get("DEEP").unwrap().base.depth(), 101);
}
