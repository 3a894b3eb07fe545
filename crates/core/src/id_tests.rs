// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

crate::define_id! {
    /// Test ID type.
    pub struct TestId;
}

#[test]
fn new_and_as_str() {
    let id = TestId::new("abc-123");
    assert_eq!(id.as_str(), "abc-123");
    assert_eq!(id.to_string(), "abc-123");
    assert!(!id.is_empty());
}

#[test]
fn short_truncates() {
    let id = TestId::new("abcdefgh");
    assert_eq!(id.short(4), "abcd");
    assert_eq!(id.short(100), "abcdefgh");
}

#[test]
fn compares_against_str() {
    let id = TestId::new("x");
    assert_eq!(id, *"x");
    assert_eq!(id, "x");
}

#[test]
fn uuid_gen_is_unique() {
    let gen = UuidIdGen;
    let a = gen.next();
    let b = gen.next();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
}

#[test]
fn sequential_gen_counts_up() {
    let gen = SequentialIdGen::new("sess");
    assert_eq!(gen.next(), "sess-1");
    assert_eq!(gen.next(), "sess-2");

    // Clones share the counter
    let clone = gen.clone();
    assert_eq!(clone.next(), "sess-3");
    assert_eq!(gen.next(), "sess-4");
}

#[test]
fn sequential_gen_default_prefix() {
    let gen = SequentialIdGen::default();
    assert_eq!(gen.next(), "id-1");
}

#[test]
fn serde_round_trip() {
    let id = TestId::new("round-trip");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"round-trip\"");
    let back: TestId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
