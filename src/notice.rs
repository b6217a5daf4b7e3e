//! Purpose: Define a stable, structured schema for non-fatal stderr notices.
//! Exports: `Notice`, `notice_json`.
//! Role: Shared contract helper for CLI diagnostics (non-error events).
//! Invariants: Notices are non-fatal and never alter stdout payloads.
//! Invariants: JSON schema is stable once published; fields are additive-only.
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: String,
    pub time: String,
    pub cmd: String,
    pub source: String,
    pub message: String,
    pub details: Map<String, Value>,
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind));
    inner.insert("time".to_string(), json!(notice.time));
    inner.insert("cmd".to_string(), json!(notice.cmd));
    inner.insert("source".to_string(), json!(notice.source));
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}

#[cfg(test)]
mod tests {
    use super::{Notice, notice_json};
    use serde_json::{Map, Value};

    #[test]
    fn notice_json_has_required_fields() {
        let mut details = Map::new();
        details.insert("field".to_string(), Value::from("phone_number"));

        let notice = Notice {
            kind: "missing-id-field".to_string(),
            time: "2026-02-11T19:50:37Z".to_string(),
            cmd: "report".to_string(),
            source: "record.json".to_string(),
            message: "record has no filled scalar field phone_number".to_string(),
            details,
        };

        let value = notice_json(&notice);
        let obj = value
            .get("notice")
            .and_then(|v| v.as_object())
            .expect("notice object");

        assert_eq!(
            obj.get("kind").and_then(|v| v.as_str()),
            Some("missing-id-field")
        );
        assert_eq!(
            obj.get("time").and_then(|v| v.as_str()),
            Some("2026-02-11T19:50:37Z")
        );
        assert_eq!(obj.get("cmd").and_then(|v| v.as_str()), Some("report"));
        assert_eq!(
            obj.get("source").and_then(|v| v.as_str()),
            Some("record.json")
        );
        assert!(obj.get("message").and_then(|v| v.as_str()).is_some());
        assert!(obj.get("details").and_then(|v| v.as_object()).is_some());
    }
}
