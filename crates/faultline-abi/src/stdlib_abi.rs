//! ABI layer for `qsort`/`bsearch`-style comparators.

use std::ffi::{c_int, c_void};

use faultline_core::compare::compare_i32;

/// Three-way comparison of two `int32_t` values behind pointers.
///
/// Suitable as the `compar` argument of `qsort` over an `int32_t` array.
/// Returns `-1`, `0` or `1`; never overflows.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn faultline_int32_compare(v1: *const c_void, v2: *const c_void) -> c_int {
    // SAFETY: caller passes pointers to valid, aligned int32_t values.
    let (a, b) = unsafe { (*v1.cast::<i32>(), *v2.cast::<i32>()) };
    compare_i32(a, b)
}
