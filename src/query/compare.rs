//! Total ordering over JSON field values
//!
//! Values of different kinds order by kind first:
//! null < bool < number < timestamp < string < array < object.

use crate::types::{JsonValue, Timestamp};
use std::cmp::Ordering;

fn rank(value: &JsonValue) -> u8 {
    match value {
        JsonValue::Null => 0,
        JsonValue::Bool(_) => 1,
        JsonValue::Number(_) => 2,
        JsonValue::Object(_) if Timestamp::from_value(value).is_some() => 3,
        JsonValue::String(_) => 4,
        JsonValue::Array(_) => 5,
        JsonValue::Object(_) => 6,
    }
}

/// Compare two field values
pub fn compare_values(a: &JsonValue, b: &JsonValue) -> Ordering {
    let by_rank = rank(a).cmp(&rank(b));
    if by_rank != Ordering::Equal {
        return by_rank;
    }

    match (a, b) {
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        (JsonValue::Array(x), JsonValue::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (JsonValue::Object(_), JsonValue::Object(_)) => {
            match (Timestamp::from_value(a), Timestamp::from_value(b)) {
                (Some(x), Some(y)) => x.cmp(&y),
                // Plain maps have no meaningful order; fall back to their text
                _ => a.to_string().cmp(&b.to_string()),
            }
        }
        _ => Ordering::Equal,
    }
}
