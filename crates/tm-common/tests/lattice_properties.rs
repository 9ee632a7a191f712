//! Property-based tests for type lattice invariants.

use proptest::prelude::*;
use serde_json::{json, Value as Json};
use tm_common::TypeNode;

fn json_strategy() -> impl Strategy<Value = Json> {
    let leaf = prop_oneof![
        Just(Json::Null),
        any::<bool>().prop_map(Json::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        (-1.0e6f64..1.0e6).prop_map(|f| json!(f)),
        "[a-z]{0,6}".prop_map(Json::String),
    ];
    leaf.prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Json::Array),
            prop::collection::btree_map("[a-d]", inner, 0..4)
                .prop_map(|m| Json::Object(m.into_iter().collect())),
        ]
    })
}

/// True if everything recorded in `before` is still recorded in `after`.
fn widens(before: &TypeNode, after: &TypeNode) -> bool {
    if before.optional && !after.optional {
        return false;
    }
    if !after.primitives.contains(before.primitives) {
        return false;
    }
    match (&before.element, &after.element) {
        (Some(b), Some(a)) => {
            if !widens(b, a) {
                return false;
            }
        }
        (Some(_), None) => return false,
        _ => {}
    }
    match (&before.fields, &after.fields) {
        (Some(b), Some(a)) => b
            .iter()
            .all(|(name, child)| a.get(name).is_some_and(|other| widens(child, other))),
        (Some(_), None) => false,
        _ => true,
    }
}

/// Structural equality that ignores `optional` flags.
fn same_shape(a: &TypeNode, b: &TypeNode) -> bool {
    if a.primitives != b.primitives {
        return false;
    }
    let elements = match (&a.element, &b.element) {
        (Some(x), Some(y)) => same_shape(x, y),
        (None, None) => true,
        _ => false,
    };
    let fields = match (&a.fields, &b.fields) {
        (Some(x), Some(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(name, child)| y.get(name).is_some_and(|other| same_shape(child, other)))
        }
        (None, None) => true,
        _ => false,
    };
    elements && fields
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// Merging never removes a tag, field, or optional flag.
    #[test]
    fn merge_is_monotonic(v1 in json_strategy(), v2 in json_strategy()) {
        let mut node = TypeNode::new();
        node.merge(&v1);
        let before = node.clone();
        node.merge(&v2);
        prop_assert!(widens(&before, &node));
    }

    /// Re-merging a value changes nothing but (possibly) optional flags.
    #[test]
    fn remerge_is_idempotent_up_to_optional(
        prior in json_strategy(),
        v in json_strategy(),
    ) {
        let mut once = TypeNode::new();
        once.merge(&prior);
        once.merge(&v);

        let mut twice = once.clone();
        twice.merge(&v);

        prop_assert!(same_shape(&once, &twice));
        prop_assert!(widens(&once, &twice));
    }

    /// A single merge into an empty node is exactly idempotent for scalars
    /// and flat objects.
    #[test]
    fn flat_object_remerge_is_exact(
        m in prop::collection::btree_map("[a-d]", any::<i32>(), 0..4),
    ) {
        let value = Json::Object(m.into_iter().map(|(k, v)| (k, json!(v))).collect());
        let once = TypeNode::from_value(&value);
        let mut twice = once.clone();
        twice.merge(&value);
        prop_assert_eq!(once, twice);
    }
}
