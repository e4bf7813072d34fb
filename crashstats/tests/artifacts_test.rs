//! Artifact downloads into a temporary output directory.

mod common;

use std::collections::BTreeSet;

use common::{query_value, FakeTransport};
use crashstats::artifacts::{fetch_crash, fetch_crashes, CrashLayout, FetchOptions};
use crashstats::Error;
use futures::StreamExt;
use serde_json::{json, Value};
use tempfile::TempDir;

const CRASH_ID: &str = "2ac9a763-83d2-4dca-89bb-091bd0220630";

fn raw_crash() -> Value {
    json!({
        "ProductName": "Firefox",
        "Version": "102.0",
        "metadata": {
            "dump_checksums": {"upload_file_minidump": "abc", "memory_report": "def"}
        },
    })
}

fn crash_service() -> FakeTransport {
    FakeTransport::new()
        .with_token()
        .with_json(|endpoint, _| match endpoint {
            "/api/RawCrash/" => Ok(raw_crash()),
            "/api/ProcessedCrash/" => Ok(json!({"signature": "OOM | small", "uuid": CRASH_ID})),
            other => Err(Error::UnexpectedResponse(format!("unexpected {}", other))),
        })
        .with_bytes(|_, query| {
            let name = query_value(query, "name").unwrap_or_default();
            Ok(format!("dump:{}", name).into_bytes())
        })
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_fetch_raw_crash_only() {
    let dir = TempDir::new().unwrap();
    let layout = CrashLayout::new(dir.path());
    let transport = crash_service();

    let report = fetch_crash(&transport, &layout, CRASH_ID, FetchOptions::default())
        .await
        .unwrap();

    let path = dir.path().join("raw_crash/20220630").join(CRASH_ID);
    assert_eq!(report.written, vec![path.clone()]);
    assert!(report.skipped.is_empty());
    assert_eq!(read_json(&path), raw_crash());

    // Keys are written sorted
    let text = std::fs::read_to_string(&path).unwrap();
    let product = text.find("\"ProductName\"").unwrap();
    let metadata = text.find("\"metadata\"").unwrap();
    assert!(product < metadata);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].value("crash_id"), Some(CRASH_ID));
    assert_eq!(requests[0].value("format"), Some("meta"));
}

#[tokio::test]
async fn test_fetch_everything() {
    let dir = TempDir::new().unwrap();
    let layout = CrashLayout::new(dir.path());
    let transport = crash_service();
    let options = FetchOptions {
        dumps: true,
        processed: true,
        ..FetchOptions::default()
    };

    let report = fetch_crash(&transport, &layout, &format!("bp-{}", CRASH_ID), options)
        .await
        .unwrap();
    assert_eq!(report.crash_id, CRASH_ID);
    assert_eq!(report.written.len(), 5);

    let names = read_json(&dir.path().join("dump_names").join(CRASH_ID));
    assert_eq!(names, json!(["upload_file_minidump", "memory_report"]));

    let minidump = std::fs::read(dir.path().join("upload_file_minidump").join(CRASH_ID)).unwrap();
    assert_eq!(minidump, b"dump:dump");
    let memory = std::fs::read(dir.path().join("memory_report").join(CRASH_ID)).unwrap();
    assert_eq!(memory, b"dump:memory_report");

    let processed = read_json(&dir.path().join("processed_crash").join(CRASH_ID));
    assert_eq!(processed["signature"], "OOM | small");

    let dump_requests: Vec<_> = transport
        .requests()
        .into_iter()
        .filter(|r| r.value("format") == Some("raw"))
        .collect();
    assert_eq!(dump_requests.len(), 2);
}

#[tokio::test]
async fn test_existing_files_are_skipped_without_overwrite() {
    let dir = TempDir::new().unwrap();
    let layout = CrashLayout::new(dir.path());

    let raw_path = layout.raw_crash_path(CRASH_ID);
    std::fs::create_dir_all(raw_path.parent().unwrap()).unwrap();
    std::fs::write(&raw_path, serde_json::to_string(&raw_crash()).unwrap()).unwrap();
    let minidump_path = layout.dump_path("upload_file_minidump", CRASH_ID);
    std::fs::create_dir_all(minidump_path.parent().unwrap()).unwrap();
    std::fs::write(&minidump_path, b"already here").unwrap();

    let transport = crash_service();
    let options = FetchOptions {
        dumps: true,
        overwrite: false,
        ..FetchOptions::default()
    };
    let report = fetch_crash(&transport, &layout, CRASH_ID, options).await.unwrap();

    assert_eq!(report.skipped, vec![raw_path, minidump_path.clone()]);
    // Dump names come from the raw crash on disk
    assert_eq!(
        report.written,
        vec![
            layout.dump_names_path(CRASH_ID),
            layout.dump_path("memory_report", CRASH_ID),
        ]
    );
    assert_eq!(std::fs::read(&minidump_path).unwrap(), b"already here");

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].value("name"), Some("memory_report"));
}

#[tokio::test]
async fn test_overwrite_refetches() {
    let dir = TempDir::new().unwrap();
    let layout = CrashLayout::new(dir.path());
    let raw_path = layout.raw_crash_path(CRASH_ID);
    std::fs::create_dir_all(raw_path.parent().unwrap()).unwrap();
    std::fs::write(&raw_path, "{}").unwrap();

    let transport = crash_service();
    let report = fetch_crash(&transport, &layout, CRASH_ID, FetchOptions::default())
        .await
        .unwrap();
    assert_eq!(report.written, vec![raw_path.clone()]);
    assert_eq!(read_json(&raw_path), raw_crash());
}

#[tokio::test]
async fn test_invalid_crash_id() {
    let dir = TempDir::new().unwrap();
    let layout = CrashLayout::new(dir.path());
    let transport = crash_service();

    let err = fetch_crash(&transport, &layout, "not-a-crash-id", FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_fetch_crashes_with_workers() {
    let dir = TempDir::new().unwrap();
    let layout = CrashLayout::new(dir.path());
    let transport = crash_service();

    let crash_ids: Vec<String> = (0..6)
        .map(|n| format!("2ac9a763-83d2-4dca-89bb-091bd022063{}", n))
        .chain(["garbage".to_string()])
        .collect();

    let results: Vec<_> = fetch_crashes(
        &transport,
        &layout,
        crash_ids.clone(),
        FetchOptions::default(),
        4,
    )
    .collect()
    .await;
    assert_eq!(results.len(), 7);

    let succeeded: BTreeSet<String> = results
        .iter()
        .filter(|(_, result)| result.is_ok())
        .map(|(crash_id, _)| crash_id.clone())
        .collect();
    let expected: BTreeSet<String> = crash_ids[..6].iter().cloned().collect();
    assert_eq!(succeeded, expected);

    let failed: Vec<&String> = results
        .iter()
        .filter(|(_, result)| result.is_err())
        .map(|(crash_id, _)| crash_id)
        .collect();
    assert_eq!(failed, vec!["garbage"]);

    for crash_id in &expected {
        assert!(layout.raw_crash_path(crash_id).exists());
    }
}
