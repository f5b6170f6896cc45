// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ANSI coloring for terminal output.
//!
//! The `apply_*` functions always emit escapes; the rest check
//! [`should_colorize`] first.

use std::io::IsTerminal;

pub mod codes {
    /// Steel blue
    pub const HEADER: u8 = 74;
    /// Medium grey
    pub const CONTEXT: u8 = 245;
    /// Dark grey
    pub const MUTED: u8 = 240;

    #[cfg(test)]
    pub const HEADER_START: &str = "\x1b[38;5;74m";
    #[cfg(test)]
    pub const MUTED_START: &str = "\x1b[38;5;240m";
    #[cfg(test)]
    pub const RESET: &str = "\x1b[0m";
}

const RESET: &str = "\x1b[0m";

#[derive(Clone, Copy)]
enum Paint {
    Palette(u8),
    Green,
    Yellow,
    Red,
}

impl Paint {
    fn wrap(self, text: &str) -> String {
        match self {
            Paint::Palette(code) => format!("\x1b[38;5;{code}m{text}{RESET}"),
            Paint::Green => format!("\x1b[32m{text}{RESET}"),
            Paint::Yellow => format!("\x1b[33m{text}{RESET}"),
            Paint::Red => format!("\x1b[31m{text}{RESET}"),
        }
    }

    fn wrap_if_enabled(self, text: &str) -> String {
        if should_colorize() {
            self.wrap(text)
        } else {
            text.to_string()
        }
    }
}

/// `NO_COLOR` disables, then `COLOR` forces, then stdout must be a TTY.
pub fn should_colorize() -> bool {
    if crate::env::no_color() {
        return false;
    }
    crate::env::force_color() || std::io::stdout().is_terminal()
}

pub fn header(text: &str) -> String {
    Paint::Palette(codes::HEADER).wrap_if_enabled(text)
}

pub(crate) fn apply_header(text: &str) -> String {
    Paint::Palette(codes::HEADER).wrap(text)
}

/// Labels in detail views ("Display name:", "Endpoint:").
pub fn context(text: &str) -> String {
    Paint::Palette(codes::CONTEXT).wrap_if_enabled(text)
}

pub fn muted(text: &str) -> String {
    Paint::Palette(codes::MUTED).wrap_if_enabled(text)
}

pub(crate) fn apply_muted(text: &str) -> String {
    Paint::Palette(codes::MUTED).wrap(text)
}

pub fn yellow(text: &str) -> String {
    Paint::Yellow.wrap_if_enabled(text)
}

pub fn status(text: &str) -> String {
    if should_colorize() {
        apply_status(text)
    } else {
        text.to_string()
    }
}

/// Color an instance state or docker status by its first word, so
/// "Up 5 minutes" is green and "Exited (0) 2 hours ago" is red. Words
/// without a meaning here (including "absent") stay plain.
pub(crate) fn apply_status(text: &str) -> String {
    let word: String = text
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect();
    let paint = match word.as_str() {
        "ready" | "running" | "up" => Paint::Green,
        "initializing" | "built" | "building" | "stopped" | "created" | "restarting"
        | "paused" => Paint::Yellow,
        "exited" | "dead" | "failed" | "error" => Paint::Red,
        _ => return text.to_string(),
    };
    paint.wrap(text)
}

#[cfg(test)]
#[path = "color_tests.rs"]
mod tests;
