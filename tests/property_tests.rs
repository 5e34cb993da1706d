//! Property-based tests for CSV flattening and `Accept` parsing.

use conneg::formats::csv::{flatten, unflatten};
use conneg::AcceptHeader;
use proptest::prelude::*;
use serde_json::{Map, Value};

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        "[a-z0-9 .]{0,8}".prop_map(Value::from),
        Just(Value::Null),
    ]
}

/// Non-empty objects with dot-free member names and scalar leaves.
fn object_tree() -> impl Strategy<Value = Value> {
    let member = leaf().prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map("[a-z_]{1,6}", inner, 1..4)
            .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>()))
    });
    prop::collection::btree_map("[a-z_]{1,6}", member, 1..5)
        .prop_map(|m| Value::Object(m.into_iter().collect()))
}

proptest! {
    #[test]
    fn prop_unflatten_inverts_flatten(tree in object_tree()) {
        let flat = flatten(&tree);
        prop_assert!(flat.keys().all(|k| !k.is_empty()));
        prop_assert_eq!(unflatten(flat), tree);
    }

    #[test]
    fn prop_flatten_leaves_no_containers(tree in object_tree()) {
        for value in flatten(&tree).values() {
            prop_assert!(!value.is_object() && !value.is_array());
        }
    }

    #[test]
    fn prop_accept_preferred_is_ordered(header in "[a-z*/;=,. 0-9q]{0,40}") {
        let accept = AcceptHeader::parse(&header);
        let preferred: Vec<_> = accept.preferred().collect();
        prop_assert_eq!(preferred.len(), accept.entries().len());
        for pair in preferred.windows(2) {
            prop_assert!(pair[0].quality() >= pair[1].quality());
        }
    }
}
