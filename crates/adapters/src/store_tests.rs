// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use herd_core::test_support::session;

#[tokio::test]
async fn create_then_get() {
    let store = MemorySessionStore::new();
    let s = session("s1").build();
    store.create_session(&s).await.unwrap();

    let got = store.get_session(&SessionId::new("s1")).await.unwrap();
    assert_eq!(got, Some(s));
    assert!(store
        .get_session(&SessionId::new("missing"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn update_requires_existence() {
    let store = MemorySessionStore::new();
    let s = session("s1").build();

    let err = store.update_session(&s).await;
    assert!(matches!(err, Err(StoreError::NotFound(_))));

    store.create_session(&s).await.unwrap();
    let mut updated = s.clone();
    updated.priority = true;
    store.update_session(&updated).await.unwrap();

    let got = store.get_session(&s.id).await.unwrap().unwrap();
    assert!(got.priority);
}

#[tokio::test]
async fn list_orders_by_creation_time() {
    let store = MemorySessionStore::new();
    store
        .create_session(&session("newer").created(200).build())
        .await
        .unwrap();
    store
        .create_session(&session("older").created(100).build())
        .await
        .unwrap();

    let ids: Vec<_> = store
        .list_sessions()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ids, vec![SessionId::new("older"), SessionId::new("newer")]);
}
