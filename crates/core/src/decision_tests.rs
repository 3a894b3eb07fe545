// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::session;

#[test]
fn warm_decision_records_session_shape() {
    let s = session("abcd1234efgh").created(10_000).build();
    let d = SchedulingDecision::warm(&s, 235_000);

    assert_eq!(d.kind, DecisionKind::WarmMatch);
    assert!(d.is_match());
    assert_eq!(d.session_id, Some(s.id.clone()));
    assert_eq!(d.model, Some(s.model));
    assert_eq!(d.waited_ms, Some(225_000));
}

#[test]
fn no_match_decision_is_not_a_match() {
    let d = SchedulingDecision::no_match(NoMatchReason::QueueEmpty, 0);
    assert!(!d.is_match());
    assert_eq!(d.session_id, None);
}

#[test]
fn display_for_matches_names_the_session() {
    let s = session("abcd1234efgh").created(0).build();
    let d = SchedulingDecision::cold(&s, 222_000);
    let line = d.to_string();
    assert_eq!(
        line,
        "cold match: session abcd1234 (mistral-7b-instruct/inference, waited 3m42s)"
    );
}

#[test]
fn display_for_misses_names_the_reason() {
    let empty = SchedulingDecision::no_match(NoMatchReason::QueueEmpty, 0);
    assert_eq!(empty.to_string(), "no match: queue empty");

    let no_fit = SchedulingDecision::no_match(NoMatchReason::NoFit, 0);
    assert_eq!(no_fit.to_string(), "no match: no matching session");
}

#[test]
fn decision_serde_round_trip() {
    let s = session("s1").build();
    for d in [
        SchedulingDecision::warm(&s, 100),
        SchedulingDecision::cold(&s, 100),
        SchedulingDecision::no_match(NoMatchReason::NoFit, 100),
    ] {
        let json = serde_json::to_string(&d).unwrap();
        let back: SchedulingDecision = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
