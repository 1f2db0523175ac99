//! Fault classes that end in process termination.
//!
//! None of these are returned across the public boundary: the ABI layer turns
//! every `Err` into the fatal abort path. They exist so internal steps can be
//! written with `?` and so the abort notice has one rendering.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaultError {
    /// The OS refused to install the fault handler for a watched signal.
    #[error("catching {signal} (errno {errno})")]
    Install { signal: &'static str, errno: i32 },
    /// Allocation and release counts disagree at a checkpoint.
    #[error("Memory balance ({allocated} allocated, {freed} freed)")]
    Balance { allocated: u64, freed: u64 },
}
