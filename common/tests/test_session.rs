// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::{
    session::{SessionData, SessionMeta},
    test_helper::{session::get_session, track::get_oschersleben_track},
};

#[test]
fn session_json_round_trip() {
    let session = get_session();
    let json = session.to_json().unwrap();
    let parsed = SessionData::from_json(&json).unwrap();
    assert_eq!(parsed, session);
}

#[test]
fn session_without_laps_round_trips() {
    let session = SessionData::new(
        get_oschersleben_track(),
        "01.01.1970".parse().unwrap(),
        "13:00:00.000".parse().unwrap(),
    );
    let parsed = SessionData::from_json(&session.to_json().unwrap()).unwrap();
    assert_eq!(parsed, session);
    assert_eq!(parsed.lap_count(), 0);
}

#[test]
fn session_meta_json_round_trip() {
    let meta = get_session().meta();
    let json = meta.to_json().unwrap();
    assert_eq!(SessionMeta::from_json(&json).unwrap(), meta);
}

#[test]
fn session_meta_carries_identity_fields() {
    let session = get_session();
    let meta = session.meta();
    assert_eq!(meta.date, session.date);
    assert_eq!(meta.time, session.time);
    assert_eq!(meta.track, session.track);
    assert_eq!(meta.id, 0);
}

#[test]
fn deserialize_session_rejects_garbage() {
    assert!(SessionData::from_json("{").is_err());
    assert!(SessionData::from_json(r#"{"laps":[]}"#).is_err());
}
