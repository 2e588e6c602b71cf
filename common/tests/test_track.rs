// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::{position::Position, test_helper::track::get_oschersleben_track, track::TrackData};

const TRACK_JSON: &str = concat!(
    r#"{"name":"Track","#,
    r#""startline":{"latitude":"52","longitude":"11.2"},"#,
    r#""finishline":{"latitude":"52","longitude":"11.2"},"#,
    r#""sectors":[{"latitude":"52","longitude":"11.2"},{"latitude":"52","longitude":"11.2"}]}"#
);

fn get_track() -> TrackData {
    let pos = Position::new(52.0, 11.2);
    TrackData {
        name: "Track".to_string(),
        startline: pos,
        finishline: pos,
        sections: vec![pos, pos],
    }
}

#[test]
fn serialize_track() {
    assert_eq!(serde_json::to_string(&get_track()).unwrap(), TRACK_JSON);
}

#[test]
fn deserialize_track() {
    assert_eq!(TrackData::from_json(TRACK_JSON).unwrap(), get_track());
}

#[test]
fn track_json_round_trip() {
    let track = get_oschersleben_track();
    let json = serde_json::to_string(&track).unwrap();
    assert_eq!(TrackData::from_json(&json).unwrap(), track);
}

#[test]
fn track_without_startline_reports_it_unset() {
    let mut track = get_oschersleben_track();
    assert!(track.has_startline());
    track.startline = Position::default();
    assert!(!track.has_startline());
}

#[test]
fn deserialize_track_rejects_garbage() {
    assert!(TrackData::from_json("not a track").is_err());
    assert!(TrackData::from_json(r#"{"name":"Track"}"#).is_err());
}
