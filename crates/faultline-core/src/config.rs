//! Runtime configuration.
//!
//! Read from the environment once, at handler installation:
//! - `FAULTLINE_BACKTRACE`: `on` (default) captures and symbolizes up to
//!   [`MAX_FRAMES`](crate::report::MAX_FRAMES) frames on abort; `off` skips
//!   frame capture even when the `backtrace` feature is compiled in.
//! - `FAULTLINE_EVENT_LOG`: when set to a path, the abort routine appends one
//!   JSONL [`FaultEvent`](crate::structured_log::FaultEvent) to that file.

use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variable selecting the backtrace mode.
pub const BACKTRACE_ENV: &str = "FAULTLINE_BACKTRACE";
/// Environment variable naming the JSONL event log.
pub const EVENT_LOG_ENV: &str = "FAULTLINE_EVENT_LOG";

/// Whether the abort routine captures a stack trace.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BacktraceMode {
    /// Capture and symbolize frames.
    #[default]
    Symbolized,
    /// Skip frame capture entirely.
    Off,
}

impl BacktraceMode {
    /// Parse from string (case-insensitive). Unknown values keep the default.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "disabled" | "0" | "false" => Self::Off,
            _ => Self::Symbolized,
        }
    }

    /// Returns true if frames should be captured.
    #[must_use]
    pub const fn enabled(self) -> bool {
        matches!(self, Self::Symbolized)
    }
}

/// Resolved fault pipeline configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FaultConfig {
    pub backtrace: BacktraceMode,
    pub event_log: Option<PathBuf>,
}

impl FaultConfig {
    /// Reads the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let backtrace = lookup(BACKTRACE_ENV)
            .map(|v| BacktraceMode::from_str_loose(&v.to_string_lossy()))
            .unwrap_or_default();
        let event_log = lookup(EVENT_LOG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self {
            backtrace,
            event_log,
        }
    }
}
