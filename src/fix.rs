//! Field-level repair of untrusted settings objects.
//!
//! Each fixer takes the compiled-in defaults object, the untrusted candidate
//! object, a field name, and the set of kinds (or exact values) the field may
//! hold. The candidate's field is returned when it passes; otherwise the
//! default takes its place. Bad data never raises: a corrupt settings file
//! must not be able to block startup (see [`crate::store`]).
//!
//! Misusing a fixer against the wrong schema shape is a caller bug, not a
//! data condition, and panics.

use crate::kind::{self, Kind};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};

/// Canonical primitive form of a JSON value.
///
/// Numbers holding an integral finite float are collapsed to their integer
/// representation (`5.0` becomes `5`), so repaired files round-trip to the
/// same text regardless of how the original spelled the number. Arrays and
/// objects are canonicalized element-wise. Everything else passes through
/// unchanged.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Number(n) => {
            if n.is_f64() {
                if let Some(f) = n.as_f64() {
                    if f.is_finite()
                        && f.fract() == 0.0
                        && f >= i64::MIN as f64
                        && f < i64::MAX as f64
                    {
                        return Value::from(f as i64);
                    }
                }
            }
            value.clone()
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), canonicalize(item)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

fn default_for<'a>(defaults: &'a Map<String, Value>, key: &str, caller: &str) -> &'a Value {
    match defaults.get(key) {
        Some(value) => value,
        None => panic!("{caller}: no default for key `{key}`"),
    }
}

/// Repair a single field against its default.
///
/// Returns the candidate's field, canonicalized, when its kind is in
/// `kinds`; otherwise the canonicalized default. A missing field counts as
/// mismatched.
///
/// # Panics
///
/// Panics if `key` has no entry in `defaults` — that is a schema/caller
/// mismatch, not bad data.
pub fn fix_field(
    defaults: &Map<String, Value>,
    candidate: &Map<String, Value>,
    key: &str,
    kinds: &[Kind],
) -> Value {
    let fallback = default_for(defaults, key, "fix_field");
    match candidate.get(key) {
        Some(value) if kind::matches_any(value, kinds) => canonicalize(value),
        _ => canonicalize(fallback),
    }
}

/// Repair a sequence field against its default.
///
/// The candidate's field is accepted unchanged (order and length preserved)
/// iff it is an array whose every element matches one of `element_kinds`.
/// Anything else falls back to a fresh array rebuilt element-wise from the
/// default, each element canonicalized. The result is always homogeneous in
/// `element_kinds`.
///
/// # Panics
///
/// Panics if `key` has no entry in `defaults`, or if the default itself is
/// not an array. Both indicate the fixer was invoked against the wrong
/// schema shape.
pub fn fix_array(
    defaults: &Map<String, Value>,
    candidate: &Map<String, Value>,
    key: &str,
    element_kinds: &[Kind],
) -> Value {
    let fallback = default_for(defaults, key, "fix_array");
    let default_items = match fallback {
        Value::Array(items) => items,
        other => panic!(
            "fix_array: default for key `{key}` is {}, expected an array",
            Kind::of(other)
        ),
    };
    match candidate.get(key) {
        Some(value) if kind::is_homogeneous_array(value, element_kinds) => value.clone(),
        _ => Value::Array(default_items.iter().map(canonicalize).collect()),
    }
}

/// Repair a field constrained to a closed set of exact values.
///
/// Membership is by strict deep equality, no canonicalization. The default
/// must itself be a member of `allowed`, so the result always is.
///
/// # Panics
///
/// Panics if `key` has no entry in `defaults`.
pub fn fix_in_set(
    defaults: &Map<String, Value>,
    candidate: &Map<String, Value>,
    key: &str,
    allowed: &[Value],
) -> Value {
    let fallback = default_for(defaults, key, "fix_in_set");
    debug_assert!(
        allowed.contains(fallback),
        "fix_in_set: default for key `{key}` is outside its own allowed set"
    );
    match candidate.get(key) {
        Some(value) if allowed.contains(value) => value.clone(),
        _ => fallback.clone(),
    }
}

/// A repaired value paired with a lazily computed validity flag.
///
/// `valid()` answers "was the input already fully valid?", i.e. whether the
/// repaired raw value is deeply equal to the original untrusted input. The
/// comparison can be expensive for large settings trees and most callers
/// only want the repaired value, so it runs on first access and is memoized.
#[derive(Debug)]
pub struct Fixed<T> {
    value: T,
    original: Value,
    repaired: Value,
    valid: OnceCell<bool>,
}

impl<T> Fixed<T> {
    /// Bundle a repaired typed value with the raw values it came from.
    pub fn new(original: Value, repaired: Value, value: T) -> Self {
        Self {
            value,
            original,
            repaired,
            valid: OnceCell::new(),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    /// The untrusted input, as given.
    pub fn original(&self) -> &Value {
        &self.original
    }

    /// The repaired raw value the typed value was built from.
    pub fn repaired(&self) -> &Value {
        &self.repaired
    }

    /// Whether no repair was actually necessary.
    ///
    /// Computed on first access by deep structural equality (strict type and
    /// value, order-sensitive for arrays) between the original input and the
    /// repaired value, then cached. Concurrent first access from several
    /// threads may run the comparison more than once but always observes a
    /// fully computed result.
    pub fn valid(&self) -> bool {
        *self.valid.get_or_init(|| self.original == self.repaired)
    }
}

/// Top-level keys whose value changed between the original input and its
/// repaired form. Used for repair reporting and log messages.
///
/// A non-object original is treated as having no keys, so every repaired
/// key counts as changed.
pub fn changed_keys(original: &Value, repaired: &Value) -> Vec<String> {
    let empty = Map::new();
    let before = original.as_object().unwrap_or(&empty);
    let after = match repaired.as_object() {
        Some(map) => map,
        None => return Vec::new(),
    };
    let mut keys = Vec::new();
    for (key, value) in after {
        if before.get(key) != Some(value) {
            keys.push(key.clone());
        }
    }
    // Keys present in the input but absent from the repaired shape were
    // dropped by the repair and count as changed too.
    for key in before.keys() {
        if !after.contains_key(key) {
            keys.push(key.clone());
        }
    }
    keys.sort();
    keys
}

/// Subset of [`changed_keys`] that was actually broken: values the input
/// supplied that were replaced or dropped, as opposed to fields merely
/// filled in from defaults. Nested objects are compared recursively, so a
/// sparse sub-object whose present fields all survived does not count. A
/// non-object input is broken wholesale, so every changed key is returned.
pub fn repaired_keys(original: &Value, repaired: &Value) -> Vec<String> {
    let before = match original.as_object() {
        Some(map) => map,
        None => return changed_keys(original, repaired),
    };
    let empty = Map::new();
    let after = repaired.as_object().unwrap_or(&empty);
    let mut keys = Vec::new();
    for (key, value) in before {
        let broken = match after.get(key) {
            Some(new_value) => is_broken(value, new_value),
            None => true,
        };
        if broken {
            keys.push(key.clone());
        }
    }
    keys.sort();
    keys
}

/// Whether the repair replaced or dropped anything the input supplied.
fn is_broken(original: &Value, repaired: &Value) -> bool {
    match (original, repaired) {
        (Value::Object(before), Value::Object(after)) => {
            before.iter().any(|(key, value)| match after.get(key) {
                Some(new_value) => is_broken(value, new_value),
                None => true,
            })
        }
        _ => original != repaired,
    }
}
