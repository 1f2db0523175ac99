// The extern "C" entry points take raw pointers from C callers; their
// contracts are the C ones, so per-function safety sections would only
// restate them.
#![allow(clippy::missing_safety_doc)]
//! # faultline-abi
//!
//! ABI-compatible extern "C" boundary for faultline.
//!
//! This crate produces a `cdylib` exposing the fault pipeline and the
//! allocation accountant to C callers, and an `rlib` for Rust owners. Pure
//! policy (counting rules, report formatting, configuration) lives in
//! `faultline-core`; this crate owns the process-wide state and the `libc`
//! calls.
//!
//! # Architecture
//!
//! ```text
//! owner ── install ──> fault_abi ── sigaction ──> kernel
//!   │                     ▲
//!   │   signal / abort ───┘── report (stderr) ─> event log ─> callback ─> abort()
//!   │
//!   └── malloc/free ──> malloc_abi ── ledger (faultline-core) ──> memory check
//! ```

pub mod backtrace;
pub mod fault_abi;
pub mod malloc_abi;
pub mod math_abi;
pub mod stdio_abi;
pub mod stdlib_abi;

mod util;

pub use fault_abi::{
    AbortHandler, fatal, handlers_installed, install_fault_handler, trigger_abort,
};
pub use malloc_abi::{check_allocation_balance, ledger};
