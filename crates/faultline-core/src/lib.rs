//! # faultline-core
//!
//! Safe Rust building blocks for the faultline fault-containment layer.
//!
//! This crate holds everything that can be expressed without touching the OS:
//! the allocation ledger and its counting policy, abort report formatting,
//! signal bookkeeping, runtime configuration, and the structured fault record.
//! The `faultline-abi` crate wires these to `libc` and exports the C surface.
//! No `unsafe` code is permitted at the crate level.

#![deny(unsafe_code)]

pub mod accounting;
pub mod bits;
pub mod compare;
pub mod config;
pub mod error;
pub mod report;
pub mod signal;
pub mod structured_log;

pub use accounting::{AllocationLedger, LedgerSnapshot};
pub use error::FaultError;
