// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;
use yare::parameterized;

fn sized(path: &Path, size: u64) {
    let file = std::fs::File::create(path).unwrap();
    file.set_len(size).unwrap();
}

fn len(path: PathBuf) -> Option<u64> {
    std::fs::metadata(path).ok().map(|m| m.len())
}

fn log_in(dir: &TempDir) -> DaemonLog {
    DaemonLog::new(dir.path().join("daemon.log"))
}

#[test]
fn small_log_stays_put() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_in(&dir);
    sized(log.path(), 1024);

    log.rotate_if_needed();

    assert_eq!(len(log.path().to_path_buf()), Some(1024));
    assert_eq!(len(log.rotated(1)), None);
}

#[test]
fn missing_log_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_in(&dir);

    log.rotate_if_needed();

    assert!(!log.path().exists());
}

#[parameterized(
    first_rotation = { &[] },
    shifts_existing = { &[100, 200] },
    drops_oldest = { &[100, 200, 300] },
)]
fn oversized_log_rotates(existing: &[u64]) {
    let dir = tempfile::tempdir().unwrap();
    let log = log_in(&dir);
    for (i, size) in existing.iter().enumerate() {
        sized(&log.rotated(i as u32 + 1), *size);
    }
    sized(log.path(), MAX_LOG_SIZE + 1);

    log.rotate_if_needed();

    assert!(!log.path().exists());
    assert_eq!(len(log.rotated(1)), Some(MAX_LOG_SIZE + 1));
    // Older copies move up one slot; anything past MAX_ROTATIONS is gone
    for (i, size) in existing.iter().enumerate().take(MAX_ROTATIONS as usize - 1) {
        assert_eq!(len(log.rotated(i as u32 + 2)), Some(*size));
    }
    assert_eq!(len(log.rotated(MAX_ROTATIONS + 1)), None);
}

#[test]
fn startup_marker_appends_after_previous_runs() {
    let dir = tempfile::tempdir().unwrap();
    let log = DaemonLog::new(dir.path().join("state/daemon.log"));
    log.mark_startup().unwrap();
    log.mark_startup().unwrap();

    let content = std::fs::read_to_string(log.path()).unwrap();
    let marker = format!("{STARTUP_MARKER_PREFIX}{}) ---", std::process::id());
    assert_eq!(content.lines().collect::<Vec<_>>(), vec![marker.as_str(); 2]);
}

#[test]
fn startup_error_follows_marker() {
    let dir = tempfile::tempdir().unwrap();
    let log = log_in(&dir);
    log.mark_startup().unwrap();

    log.record_startup_error(&LifecycleError::NoStateDir);

    let content = std::fs::read_to_string(log.path()).unwrap();
    assert_eq!(
        content.lines().last(),
        Some("ERROR Failed to start daemon: Could not determine state directory")
    );
}
