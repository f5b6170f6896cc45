// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

#[test]
fn zero_timestamp_is_dash() {
    assert_eq!(format_time_ago(0), "-");
}

#[test]
fn recent_timestamp_is_seconds() {
    let ago = format_time_ago(now_ms() - 5_000);
    assert!(ago.ends_with('s'), "{ago}");
}

#[test]
fn old_timestamp_is_days() {
    assert_eq!(format_time_ago(now_ms() - 3 * 86_400_000 - 1_000), "3d");
}

#[test]
fn future_timestamp_clamps_to_zero() {
    assert_eq!(format_time_ago(now_ms() + 60_000), "0s");
}

#[test]
fn output_format_parses_from_flag_values() {
    assert_eq!(
        OutputFormat::from_str("json", true).unwrap(),
        OutputFormat::Json
    );
    assert_eq!(OutputFormat::default(), OutputFormat::Text);
}
