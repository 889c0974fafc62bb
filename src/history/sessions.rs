//! Session aggregation over the flat record log
//!
//! Sessions are a derived view, recomputed from a full scan on every read.
//! These are pure functions over `&[MessageRecord]` with no shared state.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{DeckError, Result};

use super::record::{MessageRecord, PastedContent, Role};

/// Title shown for sessions whose first message has no body
pub const UNTITLED_SESSION: &str = "Untitled session";

/// Titles are the first message truncated to this many characters
const TITLE_MAX_CHARS: usize = 50;

/// Derived per-session summary
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Session identifier
    pub id: String,
    /// First 50 characters of the first message, or a placeholder
    pub title: String,
    /// Project of the first record seen for the session
    pub project: String,
    /// Timestamp of the first record in scan order
    pub created_at: i64,
    /// Maximum timestamp seen for the session
    pub updated_at: i64,
    /// Number of records in the session
    pub message_count: usize,
}

/// One materialized message inside a session view
///
/// The `id` is synthesized per read (timestamp plus a random suffix) because
/// records carry no stable identifier; callers must not expect it to survive
/// across reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMessage {
    /// Synthesized display identifier
    pub id: String,
    /// Resolved role (absent roles read as user)
    pub role: Role,
    /// Message body
    pub content: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Attachments carried by the record
    pub pasted_contents: HashMap<String, PastedContent>,
}

/// Fully materialized session detail view
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    /// Summary fields, flattened into the response object
    #[serde(flatten)]
    pub summary: SessionSummary,
    /// Messages in original append order
    pub messages: Vec<SessionMessage>,
}

/// One page of a session's messages, newest first
#[derive(Debug, Clone, Serialize)]
pub struct MessagePage {
    /// Page contents
    pub messages: Vec<SessionMessage>,
    /// Pre-slice count of the session's messages
    pub total: usize,
    /// Applied limit
    pub limit: usize,
    /// Applied offset
    pub offset: usize,
}

/// Group records into session summaries, most recently active first.
///
/// The sort is stable and descending by `updated_at`; ties keep the order in
/// which sessions first appeared in the log.
#[must_use]
pub fn list_sessions(records: &[MessageRecord]) -> Vec<SessionSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut sessions: Vec<SessionSummary> = Vec::new();

    for record in records {
        let key = record.session();
        let slot = match index.get(key) {
            Some(&slot) => slot,
            None => {
                sessions.push(SessionSummary {
                    id: key.to_string(),
                    title: title_of(record),
                    project: record.project.clone(),
                    created_at: record.timestamp,
                    updated_at: record.timestamp,
                    message_count: 0,
                });
                index.insert(key, sessions.len() - 1);
                sessions.len() - 1
            }
        };
        let session = &mut sessions[slot];
        session.message_count += 1;
        session.updated_at = session.updated_at.max(record.timestamp);
    }

    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    sessions
}

/// Materialize one session with its full message list.
///
/// Fails with `NotFound` when no record matches the session id.
pub fn session_detail(records: &[MessageRecord], session_id: &str) -> Result<SessionDetail> {
    let matching: Vec<&MessageRecord> = records
        .iter()
        .filter(|record| record.session() == session_id)
        .collect();

    let Some(first) = matching.first() else {
        return Err(DeckError::not_found(format!("session {session_id}")));
    };

    let created_at = first.timestamp;
    let updated_at = matching
        .iter()
        .map(|record| record.timestamp)
        .max()
        .unwrap_or(created_at);

    Ok(SessionDetail {
        summary: SessionSummary {
            id: session_id.to_string(),
            title: title_of(first),
            project: first.project.clone(),
            created_at,
            updated_at,
            message_count: matching.len(),
        },
        messages: matching.iter().map(|record| to_message(record)).collect(),
    })
}

/// Page through one session's messages, newest first.
///
/// `limit` and `offset` are clamped to zero but otherwise unchecked; an
/// offset past the end yields an empty page, not an error. `total` is the
/// pre-slice count for the session.
#[must_use]
pub fn page_messages(
    records: &[MessageRecord],
    session_id: &str,
    limit: i64,
    offset: i64,
) -> MessagePage {
    let limit = limit.max(0) as usize;
    let offset = offset.max(0) as usize;

    let mut messages: Vec<SessionMessage> = records
        .iter()
        .filter(|record| record.session() == session_id)
        .map(to_message)
        .collect();
    let total = messages.len();

    messages.reverse();
    let page = messages.into_iter().skip(offset).take(limit).collect();

    MessagePage {
        messages: page,
        total,
        limit,
        offset,
    }
}

fn title_of(record: &MessageRecord) -> String {
    let body = record.body();
    if body.is_empty() {
        UNTITLED_SESSION.to_string()
    } else {
        body.chars().take(TITLE_MAX_CHARS).collect()
    }
}

fn to_message(record: &MessageRecord) -> SessionMessage {
    SessionMessage {
        id: display_id(record.timestamp),
        role: record.role.unwrap_or(Role::User),
        content: record.body().to_string(),
        timestamp: record.timestamp,
        pasted_contents: record.pasted_contents.clone(),
    }
}

fn display_id(timestamp: i64) -> String {
    let uuid = Uuid::new_v4().simple().to_string();
    format!("{timestamp}-{}", &uuid[..9])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(session: &str, body: &str, timestamp: i64) -> MessageRecord {
        let mut record = MessageRecord::user(session, body, "/work");
        record.timestamp = timestamp;
        record
    }

    #[test]
    fn sorts_by_updated_at_descending() {
        // s1 spans timestamps 100..200, s2 sits at 150; s1 wins on recency.
        let records = vec![
            record("s1", "first", 100),
            record("s2", "other", 150),
            record("s1", "followup", 200),
        ];

        let sessions = list_sessions(&records);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, "s1");
        assert_eq!(sessions[0].updated_at, 200);
        assert_eq!(sessions[1].id, "s2");
    }

    #[test]
    fn message_counts_sum_to_record_count() {
        let records = vec![
            record("a", "x", 1),
            record("b", "y", 2),
            record("a", "z", 3),
            record("c", "w", 4),
        ];
        let sessions = list_sessions(&records);
        let total: usize = sessions.iter().map(|s| s.message_count).sum();
        assert_eq!(total, records.len());
    }

    #[test]
    fn ties_keep_first_occurrence_order() {
        let records = vec![record("early", "a", 100), record("late", "b", 100)];
        let sessions = list_sessions(&records);
        assert_eq!(sessions[0].id, "early");
        assert_eq!(sessions[1].id, "late");
    }

    #[test]
    fn title_truncates_at_fifty_chars() {
        let long = "x".repeat(80);
        let records = vec![record("s", &long, 1)];
        let sessions = list_sessions(&records);
        assert_eq!(sessions[0].title.chars().count(), 50);
    }

    #[test]
    fn empty_body_gets_placeholder_title() {
        let records = vec![record("s", "", 1)];
        let sessions = list_sessions(&records);
        assert_eq!(sessions[0].title, UNTITLED_SESSION);
    }

    #[test]
    fn legacy_records_group_under_unknown() {
        let mut legacy = record("x", "old", 5);
        legacy.session_id = None;
        let sessions = list_sessions(&[legacy]);
        assert_eq!(sessions[0].id, "unknown");
    }

    #[test]
    fn detail_preserves_append_order_and_resolves_roles() {
        let mut reply = MessageRecord::assistant("s", "sure", "/work");
        reply.timestamp = 2;
        let records = vec![record("s", "hi", 1), reply];

        let detail = session_detail(&records, "s").unwrap();
        assert_eq!(detail.summary.message_count, 2);
        assert_eq!(detail.summary.created_at, 1);
        assert_eq!(detail.summary.updated_at, 2);
        assert_eq!(detail.messages[0].role, Role::User);
        assert_eq!(detail.messages[1].role, Role::Assistant);
    }

    #[test]
    fn detail_of_missing_session_is_not_found() {
        let records = vec![record("s", "hi", 1)];
        let err = session_detail(&records, "nope").unwrap_err();
        assert!(matches!(err, DeckError::NotFound(_)));
    }

    #[test]
    fn paging_is_newest_first() {
        let records = vec![
            record("s", "one", 1),
            record("s", "two", 2),
            record("s", "three", 3),
        ];
        let page = page_messages(&records, "s", 10, 0);
        assert_eq!(page.total, 3);
        let bodies: Vec<&str> = page.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(bodies, ["three", "two", "one"]);
    }

    #[test]
    fn offset_past_end_yields_empty_page_with_total() {
        let records = vec![record("s", "one", 1)];
        let page = page_messages(&records, "s", 10, 99);
        assert!(page.messages.is_empty());
        assert_eq!(page.total, 1);
    }

    #[test]
    fn negative_limit_and_offset_clamp_to_zero() {
        let records = vec![record("s", "one", 1)];
        let page = page_messages(&records, "s", -5, -5);
        assert!(page.messages.is_empty());
        assert_eq!(page.offset, 0);
        assert_eq!(page.limit, 0);
    }

    #[test]
    fn display_ids_are_not_stable_across_reads() {
        let records = vec![record("s", "one", 1)];
        let a = session_detail(&records, "s").unwrap();
        let b = session_detail(&records, "s").unwrap();
        assert_ne!(a.messages[0].id, b.messages[0].id);
    }
}
