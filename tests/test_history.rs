//! Integration tests for the append-only history log

use agentdeck::{DeckError, MessageLog, MessageRecord, list_sessions};

fn log_in(dir: &tempfile::TempDir) -> MessageLog {
    MessageLog::new(dir.path().join("history.jsonl"))
}

fn record(session: &str, body: &str, timestamp: i64) -> MessageRecord {
    let mut record = MessageRecord::user(session, body, "/work");
    record.timestamp = timestamp;
    record
}

#[tokio::test]
async fn append_then_read_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_in(&dir);

    let mut original = MessageRecord::user("s1", "hello\nworld \u{4f60}\u{597d} \u{1f680}", "/work");
    original.timestamp = 42;
    log.append(&original).await.unwrap();

    let records = log.read_all().await.unwrap();
    assert_eq!(records, vec![original]);
}

#[tokio::test]
async fn append_creates_file_and_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/deeper/history.jsonl");
    let log = MessageLog::new(&path);

    log.append(&record("s1", "hi", 1)).await.unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn missing_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_in(&dir);
    assert!(log.read_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_line_fails_the_whole_read() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_in(&dir);
    log.append(&record("s1", "fine", 1)).await.unwrap();

    std::fs::write(
        log.path(),
        format!(
            "{}\nnot json at all\n",
            std::fs::read_to_string(log.path()).unwrap().trim_end()
        ),
    )
    .unwrap();

    match log.read_all().await.unwrap_err() {
        DeckError::CorruptRecord { line, .. } => assert_eq!(line, 2),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn blank_lines_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_in(&dir);
    log.append(&record("s1", "a", 1)).await.unwrap();

    let mut raw = std::fs::read_to_string(log.path()).unwrap();
    raw.push('\n');
    raw.push('\n');
    std::fs::write(log.path(), raw).unwrap();

    assert_eq!(log.read_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_session_removes_only_matching_records() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_in(&dir);
    log.append(&record("keep", "one", 1)).await.unwrap();
    log.append(&record("drop", "two", 2)).await.unwrap();
    log.append(&record("keep", "three", 3)).await.unwrap();
    log.append(&record("drop", "four", 4)).await.unwrap();

    let removed = log.delete_session("drop").await.unwrap();
    assert_eq!(removed, 2);

    let records = log.read_all().await.unwrap();
    let bodies: Vec<&str> = records.iter().map(|r| r.body()).collect();
    assert_eq!(bodies, ["one", "three"]);
}

#[tokio::test]
async fn delete_rewrite_keeps_trailing_newline_only_when_nonempty() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_in(&dir);
    log.append(&record("a", "one", 1)).await.unwrap();
    log.append(&record("b", "two", 2)).await.unwrap();

    log.delete_session("a").await.unwrap();
    let raw = std::fs::read_to_string(log.path()).unwrap();
    assert!(raw.ends_with('\n'));
    assert_eq!(raw.matches('\n').count(), 1);

    log.delete_session("b").await.unwrap();
    let raw = std::fs::read_to_string(log.path()).unwrap();
    assert!(raw.is_empty());
}

#[tokio::test]
async fn delete_without_log_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_in(&dir);
    assert!(matches!(
        log.delete_session("any").await.unwrap_err(),
        DeckError::NotFound(_)
    ));
}

#[tokio::test]
async fn appends_after_delete_survive() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_in(&dir);
    log.append(&record("a", "one", 1)).await.unwrap();
    log.delete_session("a").await.unwrap();
    log.append(&record("b", "two", 2)).await.unwrap();

    let records = log.read_all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].session(), "b");
}

#[tokio::test]
async fn aggregation_matches_log_contents() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_in(&dir);
    log.append(&record("s1", "first", 100)).await.unwrap();
    log.append(&record("s2", "other", 150)).await.unwrap();
    log.append(&record("s1", "followup", 200)).await.unwrap();

    let records = log.read_all().await.unwrap();
    let sessions = list_sessions(&records);

    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, "s1");
    assert_eq!(sessions[1].id, "s2");
    let total: usize = sessions.iter().map(|s| s.message_count).sum();
    assert_eq!(total, records.len());
}

#[tokio::test]
async fn concurrent_appends_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let log = std::sync::Arc::new(log_in(&dir));

    let mut handles = Vec::new();
    for i in 0..20i64 {
        let log = std::sync::Arc::clone(&log);
        handles.push(tokio::spawn(async move {
            log.append(&record("s", &format!("msg {i}"), i)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(log.read_all().await.unwrap().len(), 20);
}
