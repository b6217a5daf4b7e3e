//! Purpose: Provide a stable, serializable completeness report model.
//! Exports: `CompletenessReport`, `SectionStats`, `record_id_field`.
//! Role: Shared contract between the CLI emission paths and library users.
//! Invariants: Reports are additive-only; section counts always sum to the totals.
//! Invariants: Building a report never fails for any well-formed record.
use serde::Serialize;
use serde_json::Value;

use crate::core::count::{LeafCounts, count_leaves, missing_leaf_paths};

/// Leaf tally for one top-level member of an object record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SectionStats {
    pub name: String,
    pub counts: LeafCounts,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletenessReport {
    pub source: String,
    pub record_id: Option<String>,
    pub counts: LeafCounts,
    pub sections: Vec<SectionStats>,
    pub missing: Option<Vec<String>>,
}

impl CompletenessReport {
    /// Count the record and, for object records, each top-level member.
    /// Sections appear in `serde_json::Map` iteration order (key-sorted);
    /// non-object roots produce no sections.
    pub fn build(source: impl Into<String>, record: &Value) -> Self {
        let counts = count_leaves(record);
        let sections = match record {
            Value::Object(members) => members
                .iter()
                .map(|(name, member)| SectionStats {
                    name: name.clone(),
                    counts: count_leaves(member),
                })
                .collect(),
            _ => Vec::new(),
        };
        Self {
            source: source.into(),
            record_id: None,
            counts,
            sections,
            missing: None,
        }
    }

    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    pub fn with_missing_from(mut self, record: &Value) -> Self {
        self.missing = Some(missing_leaf_paths(record));
        self
    }

    pub fn percent(&self) -> f64 {
        self.counts.percent()
    }

    /// Threshold rule for `check`: a record with no leaves is 0.0 percent
    /// complete and only meets a 0.0 minimum.
    pub fn meets_minimum(&self, min_percent: f64) -> bool {
        self.percent() >= min_percent
    }
}

/// Display form of a top-level identity field, if the record has one and
/// it is a filled scalar. Containers and absent leaves yield `None`.
pub fn record_id_field(record: &Value, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::String(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{CompletenessReport, record_id_field};
    use crate::core::count::LeafCounts;
    use serde_json::json;

    #[test]
    fn sections_sum_to_overall_counts() {
        let record = json!({
            "ident": {"phone_number": "0000000008", "village_name": ""},
            "family_members": [{"name": "gg", "age": null}],
            "status": "completed",
        });
        let report = CompletenessReport::build("record.json", &record);

        let mut summed = LeafCounts::default();
        for section in &report.sections {
            summed += section.counts;
        }
        assert_eq!(summed, report.counts);
        assert_eq!(report.counts, LeafCounts { filled: 3, total: 5 });
    }

    #[test]
    fn sections_are_key_sorted() {
        let record = json!({"b": 1, "a": null, "c": {}});
        let report = CompletenessReport::build("-", &record);
        let names: Vec<&str> = report.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn non_object_roots_have_no_sections() {
        let report = CompletenessReport::build("-", &json!([1, null]));
        assert!(report.sections.is_empty());
        assert_eq!(report.counts, LeafCounts { filled: 1, total: 2 });
    }

    #[test]
    fn missing_paths_attach_on_request() {
        let record = json!({"a": null, "b": "x"});
        let report = CompletenessReport::build("-", &record).with_missing_from(&record);
        assert_eq!(report.missing, Some(vec!["a".to_string()]));
    }

    #[test]
    fn empty_record_only_meets_a_zero_minimum() {
        let report = CompletenessReport::build("-", &json!({}));
        assert_eq!(report.percent(), 0.0);
        assert!(report.meets_minimum(0.0));
        assert!(!report.meets_minimum(0.1));
    }

    #[test]
    fn record_id_field_accepts_filled_scalars_only() {
        let record = json!({
            "phone_number": "0000000008",
            "current_version": 1,
            "is_deleted": false,
            "surveyor_name": null,
            "postal_address": "",
            "family_members": [],
        });
        assert_eq!(
            record_id_field(&record, "phone_number").as_deref(),
            Some("0000000008")
        );
        assert_eq!(
            record_id_field(&record, "current_version").as_deref(),
            Some("1")
        );
        assert_eq!(
            record_id_field(&record, "is_deleted").as_deref(),
            Some("false")
        );
        assert_eq!(record_id_field(&record, "surveyor_name"), None);
        assert_eq!(record_id_field(&record, "postal_address"), None);
        assert_eq!(record_id_field(&record, "family_members"), None);
        assert_eq!(record_id_field(&record, "absent"), None);
    }
}
