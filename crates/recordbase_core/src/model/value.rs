//! Payload value helpers shared by hydration and listing paths.
//!
//! # Responsibility
//! - Define the falsy-value policy used by the filtered merge.
//! - Strip storage bookkeeping keys from outgoing field mappings.
//!
//! # Invariants
//! - `filtered_merge` gives incoming keys precedence, then drops every
//!   falsy merged value. Empty-string/zero/false updates to existing
//!   fields are therefore no-ops. This is intentional legacy behavior;
//!   do not change it without product sign-off.

use serde_json::Value;

use crate::model::entity::Fields;

/// Reserved keys the SQLite store maintains inside every persisted
/// document. Never exposed through listing or association resolution.
pub const BOOKKEEPING_FIELDS: [&str; 3] = ["__rev", "__created_at", "__updated_at"];

/// Returns whether a payload value counts as falsy for the filtered merge.
///
/// Falsy: null, `false`, numeric zero, empty string, empty array,
/// empty object. The string `"0"` is *not* falsy.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64().is_some_and(|number| number == 0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Merges `incoming` over `existing` (incoming wins per key), then drops
/// every falsy merged value.
pub fn filtered_merge(existing: Fields, incoming: Fields) -> Fields {
    let mut merged = existing;
    for (key, value) in incoming {
        merged.insert(key, value);
    }
    merged.retain(|_, value| !is_falsy(value));
    merged
}

/// Removes the reserved storage bookkeeping keys from a field mapping.
pub fn strip_bookkeeping(fields: &mut Fields) {
    for key in BOOKKEEPING_FIELDS {
        fields.remove(key);
    }
}
