//! Log entry type shared by the server and the store.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// One observed runtime event submitted by an instrumented program.
///
/// Every field is optional on ingest. Unknown fields are preserved verbatim
/// through the flattened `extra` map so instrumented callers can attach
/// whatever they need without the collector caring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Unique identifier. Assigned by the server when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Caller-supplied milliseconds-since-epoch at the event source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Server-assigned receipt time in milliseconds-since-epoch.
    /// Always overwritten on ingest, never trusted from the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_timestamp: Option<i64>,
    /// Free-form "file:line" source pointer. Opaque to the collector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Human-readable description of the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Arbitrary structured payload. Opaque to the collector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Groups entries from one debugging session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Distinguishes reproduction passes within a session
    /// (e.g. "initial" vs "post-fix").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// Tags the entry with the hypothesis it was designed to test.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hypothesis_id: Option<String>,
    /// Any fields the collector does not know about.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Generate a server-side entry id: millisecond timestamp prefix plus a
/// short random suffix. Good enough for a local, low-volume debugging tool;
/// there is no collision check.
pub fn generate_id(now_ms: i64) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..0x100_0000);
    format!("{now_ms:x}-{suffix:06x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_fields_round_trip() {
        let entry: LogEntry = serde_json::from_str(
            r#"{"message":"x","customField":42,"hypothesisId":"H1"}"#,
        )
        .unwrap();
        assert_eq!(entry.message.as_deref(), Some("x"));
        assert_eq!(entry.hypothesis_id.as_deref(), Some("H1"));
        assert_eq!(entry.extra["customField"], serde_json::json!(42));

        let out = serde_json::to_string(&entry).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["customField"], serde_json::json!(42));
        assert_eq!(value["hypothesisId"], serde_json::json!("H1"));
    }

    #[test]
    fn absent_fields_are_not_serialized() {
        let entry: LogEntry = serde_json::from_str(r#"{"message":"x"}"#).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&entry).unwrap()).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("id"));
        assert!(!object.contains_key("serverTimestamp"));
        assert!(!object.contains_key("sessionId"));
    }

    #[test]
    fn generated_ids_carry_timestamp_prefix() {
        let id = generate_id(0x1234_5678);
        assert!(id.starts_with("12345678-"));
        assert_eq!(id.len(), "12345678-".len() + 6);
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(serde_json::from_str::<LogEntry>(r#"[1,2,3]"#).is_err());
        assert!(serde_json::from_str::<LogEntry>(r#""text""#).is_err());
    }
}
