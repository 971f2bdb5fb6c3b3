use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "domcast-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn stdout_value<'a>(stdout: &'a str, key: &str) -> Option<&'a str> {
    let prefix = format!("{key}=");
    stdout
        .lines()
        .find_map(|line| line.strip_prefix(prefix.as_str()))
}

fn record(out: &Path, extra: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_record_demo"))
        .args(["--out", out.to_str().unwrap()])
        .args(extra)
        .output()
        .expect("run record_demo");
    assert!(
        output.status.success(),
        "record_demo failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn record_demo_writes_event_array() {
    let dir = unique_temp_dir("record");
    let session = dir.join("session.json");
    let stdout = record(&session, &[]);
    assert!(
        stdout.lines().any(|l| l == "done: events=15, checkpoints=0"),
        "unexpected stdout: {stdout}"
    );

    let raw = fs::read_to_string(&session).expect("read session.json");
    let v: Value = serde_json::from_str(&raw).expect("parse session.json");
    let arr = v.as_array().expect("session must be a JSON array");
    assert_eq!(arr.len(), 15);
    assert_eq!(arr[0].get("type").and_then(|t| t.as_str()), Some("meta"));
    assert_eq!(
        arr[1].get("type").and_then(|t| t.as_str()),
        Some("full_snapshot")
    );
    let ts: Vec<i64> = arr
        .iter()
        .map(|e| e.get("timestamp").and_then(Value::as_i64).expect("timestamp"))
        .collect();
    assert!(ts.windows(2).all(|w| w[0] <= w[1]));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn record_demo_emits_checkpoints() {
    let dir = unique_temp_dir("record-checkpoints");
    let session = dir.join("session.json");
    let stdout = record(&session, &["--checkout-every-nth", "3"]);
    assert!(
        stdout.lines().any(|l| l == "done: events=23, checkpoints=8"),
        "unexpected stdout: {stdout}"
    );
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn replay_session_with_pause_reaches_the_end() {
    let dir = unique_temp_dir("replay");
    let session = dir.join("session.json");
    record(&session, &[]);
    let notes_json = dir.join("notes.json");

    let output = Command::new(env!("CARGO_BIN_EXE_replay_session"))
        .args([
            "--session",
            session.to_str().unwrap(),
            "--pause-at-ms",
            "450",
            "--events-json",
            notes_json.to_str().unwrap(),
        ])
        .output()
        .expect("run replay_session");
    assert!(
        output.status.success(),
        "replay_session failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout_value(&stdout, "total_time_ms"), Some("1400"));
    assert_eq!(stdout_value(&stdout, "state"), Some("Finished"));
    assert_eq!(stdout_value(&stdout, "events_cast"), Some("15"));
    assert_eq!(stdout_value(&stdout, "stranded"), Some("0"));
    let body = stdout_value(&stdout, "body").expect("body line");
    assert!(body.starts_with("<body><h1 class=\"highlight\">"), "body={body}");
    assert!(!body.contains("beta</li>"), "body={body}");

    let raw = fs::read_to_string(&notes_json).expect("read notes.json");
    let v: Value = serde_json::from_str(&raw).expect("parse notes.json");
    let kinds: Vec<&str> = v
        .as_array()
        .expect("notes must be a JSON array")
        .iter()
        .filter_map(|n| n.get("kind").and_then(|k| k.as_str()))
        .filter(|k| matches!(*k, "start" | "pause" | "resume" | "finish"))
        .collect();
    assert_eq!(kinds, vec!["start", "pause", "resume", "finish"]);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn replay_session_rejects_malformed_json() {
    let dir = unique_temp_dir("replay-bad");
    let session = dir.join("session.json");
    fs::write(&session, "{ not json").expect("write session");

    let output = Command::new(env!("CARGO_BIN_EXE_replay_session"))
        .args(["--session", session.to_str().unwrap()])
        .output()
        .expect("run replay_session");
    assert!(!output.status.success());

    let _ = fs::remove_dir_all(&dir);
}
