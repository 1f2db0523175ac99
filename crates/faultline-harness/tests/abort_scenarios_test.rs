//! End-to-end tests of the abort paths, each in a child `harness` process.

use std::ffi::OsStr;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{Command, Output};

use faultline_core::config::{BACKTRACE_ENV, EVENT_LOG_ENV};
use faultline_core::structured_log::{FaultCause, FaultEvent};
use faultline_harness::scenario::{CLEANUP_MARKER, PENDING_STDOUT};

fn harness(args: &[&str], envs: &[(&str, &OsStr)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_harness"));
    cmd.args(args).env_remove(BACKTRACE_ENV).env_remove(EVENT_LOG_ENV);
    for (key, value) in envs {
        cmd.env(key, value);
    }
    cmd.output().expect("spawn harness")
}

fn stderr_lines(out: &Output) -> Vec<String> {
    String::from_utf8_lossy(&out.stderr)
        .lines()
        .map(str::to_owned)
        .collect()
}

fn assert_aborted(out: &Output) {
    assert_eq!(
        out.status.signal(),
        Some(libc::SIGABRT),
        "status {:?}, stderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stderr)
    );
}

fn cleanup_labels(lines: &[String]) -> Vec<&str> {
    lines
        .iter()
        .filter_map(|l| l.strip_prefix(CLEANUP_MARKER))
        .collect()
}

/// Checks the frame section and returns the reported frame count.
fn assert_frame_section(lines: &[String], prefix: &str) -> Option<usize> {
    let header_start = format!("{prefix}Abort: Obtained ");
    let headers: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.starts_with(&header_start))
        .map(|(i, _)| i)
        .collect();
    if !faultline_abi::backtrace::supported() {
        assert!(headers.is_empty());
        return None;
    }
    assert_eq!(headers.len(), 1, "{lines:#?}");
    let at = headers[0];
    let count: usize = lines[at][header_start.len()..]
        .strip_suffix(" stack frames")
        .and_then(|n| n.parse().ok())
        .expect("frame count");
    assert!(count > 0 && count <= faultline_core::report::MAX_FRAMES);
    let frame_prefix = format!("{prefix}   ");
    for line in &lines[at + 1..at + 1 + count] {
        assert!(line.starts_with(&frame_prefix), "{line:?}");
        assert!(!line.contains('/'), "path not stripped: {line:?}");
    }
    Some(count)
}

fn temp_log(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "faultline-{name}-{}.jsonl",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    path
}

fn read_events(path: &PathBuf) -> Vec<FaultEvent> {
    let text = std::fs::read_to_string(path).expect("event log written");
    let _ = std::fs::remove_file(path);
    text.lines()
        .map(|l| serde_json::from_str(l).expect("valid FaultEvent line"))
        .collect()
}

#[test]
fn explicit_abort_reports_frames_then_runs_cleanup() {
    let out = harness(&["--identifier", "7", "abort"], &[]);
    assert_aborted(&out);
    let lines = stderr_lines(&out);
    assert_frame_section(&lines, "[7] ");
    assert_eq!(cleanup_labels(&lines), ["abort"]);
    // Cleanup runs after the report.
    assert!(lines.last().is_some_and(|l| l.starts_with(CLEANUP_MARKER)));
}

#[test]
fn missing_identifier_drops_prefix() {
    let out = harness(&["abort"], &[]);
    assert_aborted(&out);
    let lines = stderr_lines(&out);
    assert_frame_section(&lines, "");
    assert!(lines.iter().all(|l| !l.starts_with('[')), "{lines:#?}");
}

#[test]
fn watched_signals_report_their_mnemonic() {
    for (arg, mnemonic) in [("int", "INT"), ("segv", "SEGV"), ("usr2", "USR2")] {
        let out = harness(&["--identifier", "3", "raise", arg], &[]);
        assert_aborted(&out);
        let lines = stderr_lines(&out);
        assert_eq!(lines[0], format!("[3] Abort: Signal {mnemonic}"));
        assert_frame_section(&lines, "[3] ");
        assert_eq!(cleanup_labels(&lines), ["signal"]);
    }
}

#[test]
fn real_segfault_is_contained() {
    let out = harness(&["--identifier", "1", "segfault"], &[]);
    assert_aborted(&out);
    let lines = stderr_lines(&out);
    assert_eq!(lines[0], "[1] Abort: Signal SEGV");
    assert_eq!(cleanup_labels(&lines), ["signal"]);
}

#[test]
fn unmatched_allocation_fails_balance_check() {
    let out = harness(&["--identifier", "5", "leak"], &[]);
    assert_aborted(&out);
    let lines = stderr_lines(&out);
    assert_eq!(lines[0], "[5] Abort: Memory balance (2 allocated, 1 freed)");
    assert_frame_section(&lines, "[5] ");
    assert_eq!(cleanup_labels(&lines), ["leak"]);
}

#[test]
fn matched_allocations_exit_normally() {
    let out = harness(&["balanced"], &[]);
    assert!(out.status.success(), "{:?}", out.status);
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "balanced");
    assert!(out.stderr.is_empty());
}

#[test]
fn rebinding_replaces_callback_and_context() {
    let out = harness(&["--identifier", "2", "rebind"], &[]);
    assert_aborted(&out);
    assert_eq!(cleanup_labels(&stderr_lines(&out)), ["second"]);
}

#[test]
fn uninstall_restores_default_usr2() {
    let out = harness(&["--identifier", "4", "uninstalled-raise"], &[]);
    assert_eq!(out.status.signal(), Some(libc::SIGUSR2), "{:?}", out.status);
    let lines = stderr_lines(&out);
    assert!(lines.iter().all(|l| !l.contains("Abort:")), "{lines:#?}");
    assert!(cleanup_labels(&lines).is_empty());
}

#[test]
fn abort_without_callback_still_reports() {
    let out = harness(&["--identifier", "8", "no-callback"], &[]);
    assert_aborted(&out);
    let lines = stderr_lines(&out);
    assert_frame_section(&lines, "[8] ");
    assert!(cleanup_labels(&lines).is_empty());
}

#[test]
fn fault_inside_callback_terminates_once() {
    let out = harness(&["--identifier", "6", "callback-fault"], &[]);
    assert_aborted(&out);
    let lines = stderr_lines(&out);
    assert_eq!(cleanup_labels(&lines), ["faulting"]);
    assert_eq!(
        lines.iter().filter(|l| l.contains("stack frames")).count(),
        usize::from(faultline_abi::backtrace::supported())
    );
    assert_eq!(lines.last().map(String::as_str), Some("[6] Abort: Signal SEGV"));
}

#[test]
fn backtrace_can_be_switched_off() {
    let out = harness(&["--identifier", "7", "abort"], &[(BACKTRACE_ENV, OsStr::new("off"))]);
    assert_aborted(&out);
    let lines = stderr_lines(&out);
    assert!(lines.iter().all(|l| !l.contains("stack frames")), "{lines:#?}");
    assert_eq!(cleanup_labels(&lines), ["abort"]);
}

#[test]
fn signal_abort_appends_event_record() {
    let log = temp_log("signal");
    let out = harness(
        &["--identifier", "4", "raise", "usr2"],
        &[(EVENT_LOG_ENV, log.as_os_str())],
    );
    assert_aborted(&out);
    let frame_count = assert_frame_section(&stderr_lines(&out), "[4] ");

    let events = read_events(&log);
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.identifier, Some(4));
    assert_eq!(
        event.cause,
        FaultCause::Signal {
            signal: "USR2".into()
        }
    );
    assert!(event.callback_registered);
    assert_eq!(event.frames.len(), frame_count.unwrap_or(0));
}

#[test]
fn balance_failure_event_carries_counters() {
    let log = temp_log("leak");
    let out = harness(&["leak"], &[(EVENT_LOG_ENV, log.as_os_str())]);
    assert_aborted(&out);

    let events = read_events(&log);
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.identifier, None);
    assert_eq!((event.allocated, event.freed), (2, 1));
    match &event.cause {
        FaultCause::Fatal { reason } => assert!(reason.starts_with("Memory balance")),
        other => panic!("unexpected cause {other:?}"),
    }
}

#[test]
fn explicit_abort_flushes_rust_stdout() {
    let out = harness(&["--identifier", "7", "pending-stdout"], &[]);
    assert_aborted(&out);
    assert_eq!(String::from_utf8_lossy(&out.stdout), PENDING_STDOUT);
    assert_eq!(cleanup_labels(&stderr_lines(&out)), ["abort"]);
}

#[test]
fn rejected_disposition_is_fatal_without_cleanup() {
    let out = harness(&["--identifier", "9", "rejected-install"], &[]);
    assert_aborted(&out);
    let lines = stderr_lines(&out);
    assert_eq!(lines.len(), 1, "{lines:#?}");
    let errno = lines[0]
        .strip_prefix("[9] Abort: catching KILL (errno ")
        .and_then(|rest| rest.strip_suffix(')'))
        .and_then(|n| n.parse::<i32>().ok());
    assert_eq!(errno, Some(libc::EINVAL), "{lines:#?}");
    assert!(cleanup_labels(&lines).is_empty());
}
