use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Local, TimeZone};
use sundar_core::transcript::{format_exchange, TranscriptLog};

#[test]
fn exchange_format_has_stamped_user_and_ai_lines() {
    let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
    assert_eq!(
        format_exchange(at, "hello", "Good afternoon."),
        "[2024-03-09 14:05:07] User: hello\n[2024-03-09 14:05:07] AI: Good afternoon.\n\n"
    );
}

#[test]
fn appends_create_parent_and_accumulate() {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let root = std::env::temp_dir().join(format!("sundar-transcript-{unique}"));
    let log = TranscriptLog::new(root.join("nested").join("transcript.log"));

    let at = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    log.append_at(at, "one", "first").unwrap();
    log.append_at(at, "two", "second").unwrap();

    let written = std::fs::read_to_string(log.path()).unwrap();
    assert_eq!(written.matches("User: ").count(), 2);
    assert!(written.ends_with("AI: second\n\n"));
    assert!(written.starts_with("[2024-01-01 00:00:00] User: one\n"));

    std::fs::remove_dir_all(&root).unwrap();
}
