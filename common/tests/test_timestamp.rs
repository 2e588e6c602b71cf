// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::timestamp::Timestamp;

#[test]
fn format_timestamp_with_padding() {
    let time = Timestamp::new(1, 2, 3, 4);
    assert_eq!(time.to_string(), "01:02:03.004");
}

#[test]
fn timestamp_string_round_trip() {
    for (hour, minute, second, millisecond) in
        [(0, 0, 0, 0), (23, 59, 59, 999), (15, 5, 10, 234), (9, 30, 0, 7)]
    {
        let time = Timestamp::new(hour, minute, second, millisecond);
        let parsed: Timestamp = time.to_string().parse().unwrap();
        assert_eq!(parsed, time);
    }

    let raw = "13:00:00.000";
    let parsed: Timestamp = raw.parse().unwrap();
    assert_eq!(parsed.to_string(), raw);
}

#[test]
fn reject_malformed_timestamps() {
    for raw in ["", "13:00:00", "24:00:00.000", "12:60:00.000", "aa:bb:cc.ddd"] {
        assert!(raw.parse::<Timestamp>().is_err(), "accepted {raw:?}");
    }
}

#[test]
fn parse_or_default_substitutes_default() {
    assert_eq!(Timestamp::parse_or_default("junk"), Timestamp::default());
    assert_eq!(
        Timestamp::parse_or_default("05:06:07.008"),
        Timestamp::new(5, 6, 7, 8)
    );
}

#[test]
fn addition_wraps_around_midnight() {
    let t1: Timestamp = "22:00:00.000".parse().unwrap();
    let t2: Timestamp = "03:00:00.000".parse().unwrap();
    assert_eq!((t1 + t2).to_string(), "01:00:00.000");
}

#[test]
fn subtraction_without_wrap() {
    let t1: Timestamp = "05:00:00.000".parse().unwrap();
    let t2: Timestamp = "03:00:00.000".parse().unwrap();
    assert_eq!((t1 - t2).to_string(), "02:00:00.000");
}

#[test]
fn subtraction_wraps_around_midnight() {
    let t1: Timestamp = "03:00:00.000".parse().unwrap();
    let t2: Timestamp = "05:00:00.000".parse().unwrap();
    assert_eq!((t1 - t2).to_string(), "22:00:00.000");
}

#[test]
fn subtraction_keeps_milliseconds() {
    let t1: Timestamp = "15:08:13.234".parse().unwrap();
    let t2: Timestamp = "15:05:13.234".parse().unwrap();
    assert_eq!((t1 - t2).to_string(), "00:03:00.000");

    let t3: Timestamp = "00:00:00.100".parse().unwrap();
    let t4: Timestamp = "00:00:00.300".parse().unwrap();
    assert_eq!((t3 - t4).to_string(), "23:59:59.800");
}

#[test]
fn serialize_as_string() {
    let time = Timestamp::new(15, 5, 10, 234);
    assert_eq!(
        serde_json::to_string(&time).unwrap(),
        "\"15:05:10.234\""
    );
    let parsed: Timestamp = serde_json::from_str("\"15:05:10.234\"").unwrap();
    assert_eq!(parsed, time);
}
