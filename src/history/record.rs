//! The persisted history record schema
//!
//! One `MessageRecord` is one line of the history log. Field names stay
//! camelCase on the wire so existing `history.jsonl` files parse unchanged,
//! including legacy records that predate the `role` and `sessionId` fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Session id assigned on read to legacy records that carry none
pub const FALLBACK_SESSION_ID: &str = "unknown";

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Operator input
    User,
    /// Agent reply (including synthetic fallback replies)
    Assistant,
}

/// An attachment embedded verbatim in a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PastedContent {
    /// Attachment kind as reported by the client
    #[serde(rename = "type")]
    pub kind: String,
    /// Raw attachment payload
    pub content: String,
}

/// One persisted chat event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// Conversation this record belongs to; absent on legacy records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Absent means user (legacy records never carried a role)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Primary message body
    #[serde(default)]
    pub display: String,
    /// Legacy fallback body, consulted when `display` is empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Working directory at write time
    #[serde(default)]
    pub project: String,
    /// Attachments keyed by client-side identifier
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub pasted_contents: HashMap<String, PastedContent>,
}

impl MessageRecord {
    /// Create a user record (role left unset, as the interactive CLI writes it)
    pub fn user(
        session_id: impl Into<String>,
        display: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            session_id: Some(session_id.into()),
            role: None,
            display: display.into(),
            content: None,
            timestamp: now_millis(),
            project: project.into(),
            pasted_contents: HashMap::new(),
        }
    }

    /// Create an assistant record
    pub fn assistant(
        session_id: impl Into<String>,
        display: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            role: Some(Role::Assistant),
            ..Self::user(session_id, display, project)
        }
    }

    /// Session id with the legacy fallback applied
    #[must_use]
    pub fn session(&self) -> &str {
        self.session_id.as_deref().unwrap_or(FALLBACK_SESSION_ID)
    }

    /// Message body, falling back to the legacy `content` field
    #[must_use]
    pub fn body(&self) -> &str {
        if self.display.is_empty() {
            self.content.as_deref().unwrap_or("")
        } else {
            &self.display
        }
    }
}

/// Current time in milliseconds since the Unix epoch
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a session id for a chat turn that arrived without one
#[must_use]
pub fn generated_session_id(now: i64) -> String {
    format!("web-{now}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_defaults_to_user_on_legacy_records() {
        let json = r#"{"display":"hi","timestamp":100,"project":"/tmp","sessionId":"s1"}"#;
        let record: MessageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.role, None);
        assert_eq!(record.session(), "s1");
        assert_eq!(record.body(), "hi");
    }

    #[test]
    fn missing_session_id_reads_as_unknown() {
        let json = r#"{"display":"old entry","timestamp":1}"#;
        let record: MessageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.session(), FALLBACK_SESSION_ID);
    }

    #[test]
    fn body_falls_back_to_content() {
        let json = r#"{"content":"legacy body","timestamp":1,"sessionId":"s"}"#;
        let record: MessageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.body(), "legacy body");
    }

    #[test]
    fn serializes_camel_case_without_empty_fields() {
        let record = MessageRecord::assistant("s1", "reply", "/work");
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"sessionId\":\"s1\""));
        assert!(json.contains("\"role\":\"assistant\""));
        assert!(!json.contains("pastedContents"));
        assert!(!json.contains("\"content\""));
    }

    #[test]
    fn pasted_contents_round_trip() {
        let mut record = MessageRecord::user("s1", "see attachment", "/work");
        record.pasted_contents.insert(
            "1".to_string(),
            PastedContent {
                kind: "text".to_string(),
                content: "pasted".to_string(),
            },
        );
        let json = serde_json::to_string(&record).unwrap();
        let parsed: MessageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
