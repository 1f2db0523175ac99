//! ABI layer for the bit-length lookup.

use std::ffi::c_int;

use faultline_core::bits::{LOG2_LOOKUP, log2_floor};

/// `floor(log2(i))` for `i` in `0..256`, `-1` at index 0.
#[allow(non_upper_case_globals)]
#[unsafe(no_mangle)]
pub static faultline_log_lookup_table: [c_int; 256] = LOG2_LOOKUP;

#[unsafe(no_mangle)]
pub extern "C" fn faultline_log2_floor(byte: u8) -> c_int {
    log2_floor(byte)
}
