// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::date::Date;

#[test]
fn format_date_with_padding() {
    let date = Date::new(1970, 1, 1);
    assert_eq!(date.to_string(), "01.01.1970");
}

#[test]
fn date_string_round_trip() {
    let raw = "17.08.2024";
    let parsed: Date = raw.parse().unwrap();
    assert_eq!(parsed, Date::new(2024, 8, 17));
    assert_eq!(parsed.to_string(), raw);
}

#[test]
fn reject_malformed_dates() {
    for raw in ["", "1970-01-01", "32.01.1970", "01.13.1970", "aa.bb.cccc"] {
        assert!(raw.parse::<Date>().is_err(), "accepted {raw:?}");
    }
}

#[test]
fn ordering_is_lexicographic_on_year_month_day() {
    let d1: Date = "01.01.1970".parse().unwrap();
    let d2: Date = "01.01.1971".parse().unwrap();
    let d3: Date = "01.02.1971".parse().unwrap();
    assert!(d1 < d2);
    assert!(d2 < d3);
    assert!(d1 < d3);
}

#[test]
fn serialize_as_string() {
    let date = Date::new(1970, 1, 1);
    assert_eq!(serde_json::to_string(&date).unwrap(), "\"01.01.1970\"");
    let parsed: Date = serde_json::from_str("\"01.01.1970\"").unwrap();
    assert_eq!(parsed, date);
}
