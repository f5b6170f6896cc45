// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serial_test::serial;
use yare::parameterized;

use super::*;

#[parameterized(
    ready = { "ready", "\x1b[32m" },
    running = { "running", "\x1b[32m" },
    docker_up = { "Up 5 minutes", "\x1b[32m" },
    initializing = { "initializing", "\x1b[33m" },
    built = { "built", "\x1b[33m" },
    stopped = { "stopped", "\x1b[33m" },
    exited = { "Exited (0) 2 hours ago", "\x1b[31m" },
    dead = { "dead", "\x1b[31m" },
)]
fn status_colors_by_first_word(text: &str, code: &str) {
    assert_eq!(apply_status(text), format!("{code}{text}{}", codes::RESET));
}

#[parameterized(
    absent = { "absent" },
    empty = { "" },
    unknown = { "mystery" },
)]
fn status_leaves_unknown_words_plain(text: &str) {
    assert_eq!(apply_status(text), text);
}

#[test]
fn header_and_muted_wrap_text() {
    assert_eq!(
        apply_header("NAME"),
        format!("{}NAME{}", codes::HEADER_START, codes::RESET)
    );
    assert_eq!(
        apply_muted("abc"),
        format!("{}abc{}", codes::MUTED_START, codes::RESET)
    );
}

#[test]
#[serial]
fn no_color_wins_over_force() {
    std::env::set_var("NO_COLOR", "1");
    std::env::set_var("COLOR", "1");

    assert!(!should_colorize());
    assert_eq!(status("ready"), "ready");

    std::env::remove_var("NO_COLOR");
    assert!(should_colorize());
    assert_eq!(yellow("warn"), "\x1b[33mwarn\x1b[0m");

    std::env::remove_var("COLOR");
}
