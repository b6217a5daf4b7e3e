//! Purpose: Count filled versus total leaf fields in a nested JSON record.
//! Exports: `LeafCounts`, `count_leaves`, `for_each_leaf`, `missing_leaf_paths`.
//! Role: Pure traversal core; every report is derived from these functions.
//! Invariants: Input values are never mutated; traversal is total and deterministic.
//! Invariants: Containers contribute no leaf of their own; `{}` and `[]` yield (0, 0).
use std::fmt::Write as _;
use std::ops::AddAssign;

use serde::Serialize;
use serde_json::Value;

/// Componentwise leaf tally for one subtree. `filled <= total` always holds.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct LeafCounts {
    pub filled: u64,
    pub total: u64,
}

impl LeafCounts {
    pub fn empty(&self) -> u64 {
        self.total - self.filled
    }

    /// Completeness as a percentage. A record with no leaves is 0.0,
    /// never a division error.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.filled as f64 / self.total as f64 * 100.0
    }
}

impl AddAssign for LeafCounts {
    fn add_assign(&mut self, other: Self) {
        self.filled += other.filled;
        self.total += other.total;
    }
}

/// Count leaves under `value`. Objects and arrays recurse into their
/// members and contribute nothing themselves; every scalar is one leaf,
/// filled unless it is `null` or the empty string.
pub fn count_leaves(value: &Value) -> LeafCounts {
    match value {
        Value::Object(members) => {
            let mut counts = LeafCounts::default();
            for member in members.values() {
                counts += count_leaves(member);
            }
            counts
        }
        Value::Array(items) => {
            let mut counts = LeafCounts::default();
            for item in items {
                counts += count_leaves(item);
            }
            counts
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => LeafCounts {
            filled: u64::from(leaf_is_filled(value)),
            total: 1,
        },
    }
}

/// Whether a scalar leaf counts as filled. Containers are dispatched
/// before this is asked; one passed anyway is not a leaf and so not a
/// filled one.
fn leaf_is_filled(leaf: &Value) -> bool {
    match leaf {
        Value::Null => false,
        Value::String(text) => !text.is_empty(),
        // false and 0 are answers, not absences.
        Value::Bool(_) | Value::Number(_) => true,
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Visit every scalar leaf under `value` with its rendered path.
/// Object members extend the path with `.key` (bare key at the root);
/// array elements append `[index]`. A scalar root is visited with an
/// empty path.
pub fn for_each_leaf<F>(value: &Value, mut visit: F)
where
    F: FnMut(&str, &Value),
{
    let mut path = String::new();
    walk(value, &mut path, &mut visit);
}

fn walk<F>(value: &Value, path: &mut String, visit: &mut F)
where
    F: FnMut(&str, &Value),
{
    match value {
        Value::Object(members) => {
            for (key, member) in members {
                let mark = path.len();
                if !path.is_empty() {
                    path.push('.');
                }
                path.push_str(key);
                walk(member, path, visit);
                path.truncate(mark);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                let mark = path.len();
                let _ = write!(path, "[{index}]");
                walk(item, path, visit);
                path.truncate(mark);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            visit(path.as_str(), value);
        }
    }
}

/// Paths of all unfilled leaves, in traversal order.
pub fn missing_leaf_paths(value: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    for_each_leaf(value, |path, leaf| {
        if !leaf_is_filled(leaf) {
            paths.push(path.to_string());
        }
    });
    paths
}
