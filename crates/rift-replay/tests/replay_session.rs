//! Integration tests for replaying a capture through the public API.
//!
//! These tests load captures from disk, build a `ReplayEngine` and drive it
//! the way a serving layer would: one session, register-then-match per request.

use rift_replay::entry::{load_capture, CapturedContent, CapturedEntry, NameValue};
use rift_replay::model::{HttpMethod, MediaType, NormalizedRequest, ReplayResponse};
use rift_replay::multipart;
use rift_replay::{ReplayConfig, ReplayEngine};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use std::thread;
use tempfile::NamedTempFile;

fn body_text(response: &ReplayResponse) -> String {
    String::from_utf8(response.data.read_body().unwrap().to_vec()).unwrap()
}

fn write_capture(entries: &[CapturedEntry]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let doc = json!({ "entries": entries });
    file.write_all(doc.to_string().as_bytes()).unwrap();
    file
}

fn repeated_capture() -> Vec<CapturedEntry> {
    vec![
        CapturedEntry::get("http://api.test/next", "text/plain", "first"),
        CapturedEntry::get("http://api.test/other", "text/plain", "other"),
        CapturedEntry::get("http://api.test/next", "text/plain", "second"),
    ]
}

fn replay_three_times(config: &ReplayConfig) -> Vec<String> {
    let file = write_capture(&repeated_capture());
    let engine = ReplayEngine::from_capture(load_capture(file.path()).unwrap(), config).unwrap();
    let session = engine.new_session();
    let live = NormalizedRequest::parse(HttpMethod::Get, "http://api.test/next").unwrap();
    (0..3)
        .map(|_| body_text(&engine.respond(session.as_ref(), &live)))
        .collect()
}

#[test]
fn test_sequence_aware_replays_in_recorded_order() {
    let config = ReplayConfig::default();
    assert_eq!(replay_three_times(&config), vec!["first", "second", "first"]);
}

#[test]
fn test_stateless_replays_first_match() {
    let mut config = ReplayConfig::default();
    config.matching.sequence_aware = false;
    assert_eq!(replay_three_times(&config), vec!["first", "first", "first"]);
}

#[test]
fn test_sessions_are_independent() {
    let engine = ReplayEngine::from_capture(repeated_capture(), &ReplayConfig::default()).unwrap();
    let live = NormalizedRequest::parse(HttpMethod::Get, "http://api.test/next").unwrap();

    let one = engine.new_session();
    assert_eq!(body_text(&engine.respond(one.as_ref(), &live)), "first");
    assert_eq!(body_text(&engine.respond(one.as_ref(), &live)), "second");

    let two = engine.new_session();
    assert_eq!(body_text(&engine.respond(two.as_ref(), &live)), "first");
}

#[test]
fn test_concurrent_requests_share_one_session() {
    let mut entries = Vec::new();
    for i in 0..4 {
        entries.push(CapturedEntry::get(
            "http://api.test/poll",
            "text/plain",
            &format!("poll-{i}"),
        ));
    }
    let engine = Arc::new(ReplayEngine::from_capture(entries, &ReplayConfig::default()).unwrap());
    let session = engine.new_session();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let session = Arc::clone(&session);
            thread::spawn(move || {
                let live = NormalizedRequest::parse(HttpMethod::Get, "http://api.test/poll").unwrap();
                body_text(&engine.respond(session.as_ref(), &live))
            })
        })
        .collect();
    let mut bodies: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    bodies.sort();
    // each worker got a response; interleaving decides which
    assert_eq!(bodies.len(), 4);
    assert!(bodies.iter().all(|b| b.starts_with("poll-")));
}

#[test]
fn test_form_post_matches_reordered_fields() {
    let mut login = CapturedEntry::get("http://api.test/login", "application/json", "{\"ok\":true}");
    login.request.method = "POST".to_string();
    login.request.headers = vec![NameValue::new(
        "Content-Type",
        "application/x-www-form-urlencoded",
    )];
    login.request.post_data = Some(CapturedContent::text(
        "application/x-www-form-urlencoded",
        "user=alice&pass=secret",
    ));
    let mut wrong = login.clone();
    wrong.request.post_data = Some(CapturedContent::text(
        "application/x-www-form-urlencoded",
        "user=bob&pass=other",
    ));
    wrong.response.content = CapturedContent::text("application/json", "{\"ok\":false}");

    let engine = ReplayEngine::from_capture(vec![wrong, login], &ReplayConfig::default()).unwrap();
    let session = engine.new_session();
    let live = NormalizedRequest::parse(HttpMethod::Post, "http://api.test/login")
        .unwrap()
        .with_header("Content-Type", "application/x-www-form-urlencoded")
        .with_body("pass=secret&user=alice");
    let response = engine.respond(session.as_ref(), &live);
    assert_eq!(response.status, 200);
    assert_eq!(body_text(&response), "{\"ok\":true}");
}

#[test]
fn test_https_request_matches_http_recording() {
    let engine = ReplayEngine::from_capture(repeated_capture(), &ReplayConfig::default()).unwrap();
    let session = engine.new_session();
    let live = NormalizedRequest::parse(HttpMethod::Get, "https://api.test/other").unwrap();
    assert_eq!(body_text(&engine.respond(session.as_ref(), &live)), "other");
}

#[test]
fn test_config_file_drives_rewriting() {
    let mut config_file = NamedTempFile::new().unwrap();
    config_file
        .write_all(
            br#"
matching:
  sequenceAware: false
replacements:
  - match: { type: regex, pattern: "api\\.test" }
    replace: { type: literal, value: "localhost" }
"#,
        )
        .unwrap();
    let config = ReplayConfig::from_file(config_file.path()).unwrap();
    let engine = ReplayEngine::from_capture(
        vec![CapturedEntry::get(
            "http://api.test/doc",
            "text/html",
            "<a href=\"http://api.test/next\">next</a>",
        )],
        &config,
    )
    .unwrap();
    let session = engine.new_session();
    let live = NormalizedRequest::parse(HttpMethod::Get, "http://api.test/doc").unwrap();
    assert_eq!(
        body_text(&engine.respond(session.as_ref(), &live)),
        "<a href=\"http://localhost/next\">next</a>"
    );
}

#[test]
fn test_multipart_file_and_field_decode() {
    let file_bytes: Vec<u8> = (0u8..=255).collect();
    let mut body = Vec::new();
    body.extend_from_slice(b"--BOUNDARY\r\n");
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"upload\"; filename=\"bytes.bin\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(&file_bytes);
    body.extend_from_slice(b"\r\n--BOUNDARY\r\n");
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"note\"\r\n\r\n");
    body.extend_from_slice(b"hello");
    body.extend_from_slice(b"\r\n--BOUNDARY--\r\n");

    let content_type = MediaType::parse("multipart/form-data; boundary=BOUNDARY").unwrap();
    let parts = multipart::decode(&content_type, &body).unwrap();
    assert_eq!(parts.len(), 2);

    let upload = parts[0].content_disposition.as_ref().unwrap();
    assert_eq!(upload.name.as_deref(), Some("upload"));
    assert_eq!(upload.filename.as_deref(), Some("bytes.bin"));
    assert_eq!(parts[0].file.as_ref().unwrap().data.as_ref(), file_bytes.as_slice());

    let note = parts[1].content_disposition.as_ref().unwrap();
    assert_eq!(note.name.as_deref(), Some("note"));
    assert_eq!(note.filename, None);
    assert_eq!(parts[1].file.as_ref().unwrap().data.as_ref(), b"hello");
}
