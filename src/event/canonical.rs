//! Canonical byte encoding (spec §4.1, §6).
//!
//! Deterministic UTF-8 JSON with keys sorted lexicographically at every
//! nesting level, UUIDs as lowercase canonical strings, instants as
//! ISO-8601 with explicit UTC offset, and enums as their stable string
//! values. `serde_json::Value`'s map is a `BTreeMap` when the
//! `preserve_order` feature is off (it is, in this crate's Cargo.toml) —
//! routing every payload through `Value` before serializing is what makes
//! key order deterministic regardless of struct field declaration order.

use serde::Serialize;

/// Canonical bytes for any serializable value: convert to `Value` first so
/// that nested object keys sort, then serialize without extra whitespace.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    let as_value = serde_json::to_value(value).expect("payload types must always serialize");
    serde_json::to_vec(&as_value).expect("serde_json::Value always serializes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Sample {
        zebra: u32,
        alpha: u32,
        nested: Nested,
    }

    #[derive(Serialize)]
    struct Nested {
        b: u32,
        a: u32,
    }

    #[test]
    fn sorts_keys_recursively_regardless_of_field_order() {
        let sample = Sample {
            zebra: 1,
            alpha: 2,
            nested: Nested { b: 3, a: 4 },
        };
        let bytes = canonical_bytes(&sample);
        let json = String::from_utf8(bytes).unwrap();
        assert_eq!(json, r#"{"alpha":2,"nested":{"a":4,"b":3},"zebra":1}"#);
    }

    #[test]
    fn identical_inputs_produce_identical_bytes() {
        let a = Sample { zebra: 1, alpha: 2, nested: Nested { b: 3, a: 4 } };
        let b = Sample { zebra: 1, alpha: 2, nested: Nested { b: 3, a: 4 } };
        assert_eq!(canonical_bytes(&a), canonical_bytes(&b));
    }
}
