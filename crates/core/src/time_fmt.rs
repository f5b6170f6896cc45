// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable ages for list output.

/// Format an age in seconds as `"5s"`, `"2m"`, `"1h30m"`, or `"3d"`.
///
/// Minutes are shown alongside hours only when non-zero.
pub fn format_age(secs: u64) -> String {
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3599 => format!("{}m", secs / 60),
        3600..=86399 => match (secs / 3600, (secs % 3600) / 60) {
            (h, 0) => format!("{h}h"),
            (h, m) => format!("{h}h{m}m"),
        },
        _ => format!("{}d", secs / 86400),
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
