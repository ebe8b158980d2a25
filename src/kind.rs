//! Runtime classification of untrusted JSON values.
//!
//! Settings read back from disk arrive as `serde_json::Value` with no shape
//! guarantees. The predicates here classify a value against one or more
//! expected kinds; they are pure and never fail.

use serde_json::Value;

/// The runtime kind of a JSON value.
///
/// This is a closed set: every `serde_json::Value` maps to exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl Kind {
    /// Classify a value.
    pub fn of(value: &Value) -> Kind {
        match value {
            Value::Null => Kind::Null,
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Object(_) => Kind::Object,
        }
    }

    /// Stable lowercase name, used in log and panic messages.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether `value`'s kind is one of `kinds`.
pub fn matches_any(value: &Value, kinds: &[Kind]) -> bool {
    kinds.contains(&Kind::of(value))
}

/// Whether `value` is an array whose every element matches one of `kinds`.
///
/// Non-arrays are never homogeneous. An empty array is.
pub fn is_homogeneous_array(value: &Value, kinds: &[Kind]) -> bool {
    match value {
        Value::Array(items) => items.iter().all(|item| matches_any(item, kinds)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_of_covers_every_variant() {
        assert_eq!(Kind::of(&Value::Null), Kind::Null);
        assert_eq!(Kind::of(&json!(true)), Kind::Bool);
        assert_eq!(Kind::of(&json!(42)), Kind::Number);
        assert_eq!(Kind::of(&json!(4.2)), Kind::Number);
        assert_eq!(Kind::of(&json!("hi")), Kind::String);
        assert_eq!(Kind::of(&json!([1, 2])), Kind::Array);
        assert_eq!(Kind::of(&json!({"a": 1})), Kind::Object);
    }

    #[test]
    fn matches_any_checks_the_whole_set() {
        let kinds = [Kind::String, Kind::Number];
        assert!(matches_any(&json!("x"), &kinds));
        assert!(matches_any(&json!(1), &kinds));
        assert!(!matches_any(&json!(true), &kinds));
        assert!(!matches_any(&Value::Null, &kinds));
        assert!(!matches_any(&json!("x"), &[]));
    }

    #[test]
    fn homogeneous_array_accepts_empty() {
        assert!(is_homogeneous_array(&json!([]), &[Kind::String]));
    }

    #[test]
    fn homogeneous_array_rejects_mixed_elements() {
        assert!(is_homogeneous_array(&json!(["a", "b"]), &[Kind::String]));
        assert!(!is_homogeneous_array(&json!(["a", 1]), &[Kind::String]));
        assert!(is_homogeneous_array(
            &json!(["a", 1]),
            &[Kind::String, Kind::Number]
        ));
    }

    #[test]
    fn homogeneous_array_rejects_non_arrays() {
        assert!(!is_homogeneous_array(&json!("abc"), &[Kind::String]));
        assert!(!is_homogeneous_array(&json!({"0": "a"}), &[Kind::String]));
        assert!(!is_homogeneous_array(&Value::Null, &[Kind::String]));
    }
}
