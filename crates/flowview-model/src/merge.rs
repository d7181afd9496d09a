//! Deep-merge policy for update deltas
//!
//! Update records are partial: only the fields that changed are sent.
//! Merging must therefore never erase what the update leaves out.

use serde_json::Value as JsonValue;

/// In-place, field-by-field merge of an incoming partial record
pub trait Merge {
    /// Merge `incoming` into `self`
    fn merge_from(&mut self, incoming: Self);
}

/// Overwrite `slot` only when the incoming value is present
#[inline]
pub fn merge_opt<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}

/// Merge two JSON values in place
///
/// - `null` in the source leaves the target untouched
/// - objects merge key by key, recursively
/// - arrays merge index by index; extra source elements are appended and
///   extra target elements kept
/// - anything else is overwritten by the source
pub fn merge_json(target: &mut JsonValue, source: JsonValue) {
    match (target, source) {
        (_, JsonValue::Null) => {}
        (JsonValue::Object(target_map), JsonValue::Object(source_map)) => {
            for (key, source_val) in source_map {
                match target_map.get_mut(&key) {
                    Some(target_val) => merge_json(target_val, source_val),
                    None if source_val.is_null() => {}
                    None => {
                        target_map.insert(key, source_val);
                    }
                }
            }
        }
        (JsonValue::Array(target_arr), JsonValue::Array(source_arr)) => {
            for (index, source_val) in source_arr.into_iter().enumerate() {
                match target_arr.get_mut(index) {
                    Some(target_val) => merge_json(target_val, source_val),
                    None => target_arr.push(source_val),
                }
            }
        }
        (target_val, source_val) => *target_val = source_val,
    }
}
