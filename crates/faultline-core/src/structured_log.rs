//! Structured fault record.
//!
//! One [`FaultEvent`] is appended as a JSONL line to the configured event log
//! each time the abort routine runs, so post-mortem tooling does not have to
//! scrape stderr.

use serde::{Deserialize, Serialize};

use crate::accounting::LedgerSnapshot;
use crate::report::frame_label;

/// What started the abort routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FaultCause {
    /// Direct call to the abort entry point.
    Explicit,
    /// A watched signal was delivered.
    Signal { signal: String },
    /// A fatal check failed (balance, installation).
    Fatal { reason: String },
}

/// Canonical fault record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultEvent {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub pid: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<u32>,
    pub cause: FaultCause,
    /// Basename-stripped frame labels, outermost last.
    pub frames: Vec<String>,
    pub allocated: u64,
    pub freed: u64,
    /// Whether a cleanup callback was registered when the fault was recorded.
    pub callback_registered: bool,
}

impl FaultEvent {
    #[must_use]
    pub fn new(identifier: Option<u32>, cause: FaultCause, ledger: LedgerSnapshot) -> Self {
        Self {
            timestamp_ms: now_unix_ms(),
            pid: std::process::id(),
            identifier,
            cause,
            frames: Vec::new(),
            allocated: ledger.allocated,
            freed: ledger.freed,
            callback_registered: false,
        }
    }

    /// Attach symbolized frames; paths are stripped the same way as on stderr.
    #[must_use]
    pub fn with_frames<S: AsRef<str>>(mut self, frames: &[S]) -> Self {
        self.frames = frames
            .iter()
            .map(|f| frame_label(f.as_ref()).to_owned())
            .collect();
        self
    }

    #[must_use]
    pub fn with_callback(mut self, registered: bool) -> Self {
        self.callback_registered = registered;
        self
    }

    /// Serialize to a single JSON line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn now_unix_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
