//! # faultline-harness
//!
//! Drives the fault pipeline through its terminal paths. Every scenario that
//! ends the process runs inside the `harness` binary so integration tests can
//! observe stderr, the terminating signal and the event log from outside.

pub mod scenario;

pub use scenario::{Scenario, WatchedSignal};
