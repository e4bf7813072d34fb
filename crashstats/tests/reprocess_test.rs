//! Reprocessing submissions against a fake endpoint.

mod common;

use std::time::Duration;

use common::FakeTransport;
use crashstats::reprocess::{reprocess, GroupOutcome, ReprocessOptions, CHUNK_SIZE};
use crashstats::Error;

fn crash_ids(count: usize) -> Vec<String> {
    (0..count)
        .map(|n| format!("2ac9a763-83d2-4dca-89bb-{:06}220630", n))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_chunks_and_sleeps() {
    let transport = FakeTransport::new().with_token();
    let ids = crash_ids(120);
    let options = ReprocessOptions {
        sleep: Duration::from_secs(5),
        ..ReprocessOptions::default()
    };

    let mut outcomes: Vec<GroupOutcome> = Vec::new();
    let started = tokio::time::Instant::now();
    let summary = reprocess(&transport, &ids, &options, |outcome| outcomes.push(outcome.clone()))
        .await
        .unwrap();

    assert_eq!(summary.crash_ids, 120);
    assert_eq!(summary.groups, 3);
    assert_eq!(summary.rejected_groups, 0);
    // Two pauses, none after the last group
    assert_eq!(started.elapsed(), Duration::from_secs(10));

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.method == "POST" && r.endpoint == "/api/Reprocessing/"));
    assert_eq!(requests[0].values("crash_ids").len(), CHUNK_SIZE);
    assert_eq!(requests[1].values("crash_ids").len(), CHUNK_SIZE);
    assert_eq!(requests[2].values("crash_ids").len(), 20);
    assert_eq!(requests[2].values("crash_ids")[19], ids[119]);

    assert_eq!(
        outcomes.iter().map(|o| o.group).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(outcomes.iter().all(|o| o.total_groups == 3 && o.accepted()));
    assert_eq!(outcomes[0].last_crash_id, ids[49]);
}

#[tokio::test(start_paused = true)]
async fn test_ruleset_is_appended() {
    let transport = FakeTransport::new().with_token();
    let ids = crash_ids(2);
    let options = ReprocessOptions {
        ruleset: Some("regenerate_signature".to_string()),
        ..ReprocessOptions::default()
    };

    reprocess(&transport, &ids, &options, |_| {}).await.unwrap();
    assert_eq!(
        transport.requests()[0].values("crash_ids"),
        vec![
            format!("{}:regenerate_signature", ids[0]),
            format!("{}:regenerate_signature", ids[1]),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_rejected_groups_are_counted() {
    let transport = FakeTransport::new()
        .with_token()
        .with_post_statuses([200, 400, 200]);
    let ids = crash_ids(150);

    let mut statuses = Vec::new();
    let summary = reprocess(&transport, &ids, &ReprocessOptions::default(), |o| {
        statuses.push(o.status)
    })
    .await
    .unwrap();

    assert_eq!(statuses, vec![200, 400, 200]);
    assert_eq!(summary.rejected_groups, 1);
    // A rejected group does not stop the run
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn test_requires_token() {
    let transport = FakeTransport::new();
    let err = reprocess(&transport, &crash_ids(1), &ReprocessOptions::default(), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadCredential(_)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_batch_limits() {
    let transport = FakeTransport::new().with_token();
    let err = reprocess(&transport, &[], &ReprocessOptions::default(), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = reprocess(&transport, &crash_ids(10_001), &ReprocessOptions::default(), |_| {})
        .await
        .unwrap_err();
    assert!(err.to_string().contains("--allow-many"));
    assert!(transport.requests().is_empty());
}
