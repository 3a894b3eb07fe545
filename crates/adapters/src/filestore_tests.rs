// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[tokio::test]
async fn fake_download_round_trip() {
    let store = FakeFilestore::new();
    store.put("sessions/s1/input.txt", b"hello".to_vec());

    let bytes = store.download("sessions/s1/input.txt").await.unwrap();
    assert_eq!(bytes, b"hello");
}

#[tokio::test]
async fn fake_missing_path_is_not_found() {
    let store = FakeFilestore::new();
    let err = store.download("nope").await;
    assert!(matches!(err, Err(FilestoreError::NotFound(_))));
}

#[tokio::test]
async fn fake_upload_records_order() {
    let store = FakeFilestore::new();
    store.upload("a", b"1".to_vec()).await.unwrap();
    store.upload("b", b"2".to_vec()).await.unwrap();
    assert_eq!(store.uploads(), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(store.contents("b").unwrap(), b"2");
}

#[tokio::test]
async fn fake_list_filters_by_prefix() {
    let store = FakeFilestore::new();
    store.put("loras/s1/adapter.bin", Vec::new());
    store.put("loras/s1/config.json", Vec::new());
    store.put("sessions/s2/input.txt", Vec::new());

    let keys = store.list("loras/s1").await.unwrap();
    assert_eq!(
        keys,
        vec![
            "loras/s1/adapter.bin".to_string(),
            "loras/s1/config.json".to_string()
        ]
    );
}

#[tokio::test]
async fn fake_failure_injection() {
    let store = FakeFilestore::new();
    store.put("flaky", Vec::new());
    store.fail_download("flaky");
    let err = store.download("flaky").await;
    assert!(matches!(err, Err(FilestoreError::Transport(_))));
}

#[tokio::test]
async fn held_downloads_park_until_release() {
    let store = FakeFilestore::new();
    store.put("slow", b"data".to_vec());
    store.hold_downloads();

    let fetch = {
        let store = store.clone();
        tokio::spawn(async move { store.download("slow").await })
    };

    // The download must not complete while held
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!fetch.is_finished());

    store.release_downloads();
    let bytes = fetch.await.unwrap().unwrap();
    assert_eq!(bytes, b"data");
}

#[test]
fn api_filestore_builds_paths() {
    let store = ApiFilestore::new("http://localhost:8844/", "token").unwrap();
    assert_eq!(
        store.url("/sessions/s1/in.txt"),
        "http://localhost:8844/api/v1/filestore/sessions/s1/in.txt"
    );
    assert_eq!(
        store.url("sessions/s1/in.txt"),
        "http://localhost:8844/api/v1/filestore/sessions/s1/in.txt"
    );
}
