//! Accounted allocation wrappers (`faultline_malloc`, `faultline_calloc`,
//! `faultline_realloc`, `faultline_free`) and the balance check.
//!
//! Each wrapper delegates to the platform allocator and then moves the
//! process-wide [`AllocationLedger`] according to its counting rule. The
//! exported names are prefixed so that linking this crate never shadows the
//! system `malloc` family.

use std::ffi::c_void;

use faultline_core::accounting::AllocationLedger;

use crate::fault_abi;

static LEDGER: AllocationLedger = AllocationLedger::new();

/// The process-wide allocation ledger.
#[must_use]
pub fn ledger() -> &'static AllocationLedger {
    &LEDGER
}

/// Accounted `malloc`.
///
/// A nonzero request is counted even when the platform returns null; a
/// zero-size request is counted only when it yields a block.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn faultline_malloc(size: usize) -> *mut c_void {
    // SAFETY: direct call to the platform allocator.
    let out = unsafe { libc::malloc(size) };
    LEDGER.record_allocate(size, !out.is_null());
    out
}

/// Accounted `calloc`, counted like `malloc` on `nmemb * size`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn faultline_calloc(nmemb: usize, size: usize) -> *mut c_void {
    // SAFETY: direct call to the platform allocator.
    let out = unsafe { libc::calloc(nmemb, size) };
    LEDGER.record_zero_allocate(nmemb, size, !out.is_null());
    out
}

/// Accounted `realloc`.
///
/// A null `ptr` counts as an allocation. Resizing a block to zero counts as a
/// release only when the platform returned null, meaning it freed the block.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn faultline_realloc(ptr: *mut c_void, size: usize) -> *mut c_void {
    // SAFETY: caller guarantees `ptr` is null or a live platform block.
    let out = unsafe { libc::realloc(ptr, size) };
    LEDGER.record_resize(!ptr.is_null(), size, !out.is_null());
    out
}

/// Accounted `free`. Null is ignored and not counted.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn faultline_free(ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    LEDGER.record_release();
    // SAFETY: caller guarantees `ptr` is a live platform block.
    unsafe { libc::free(ptr) };
}

/// Aborts through the fault pipeline unless allocations and releases balance.
pub fn check_allocation_balance() {
    if let Err(err) = LEDGER.check_balance() {
        fault_abi::fatal(&err);
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn faultline_memory_check() {
    check_allocation_balance();
}
