//! Stack capture for the abort report.
//!
//! Uses glibc's `<execinfo.h>` (`backtrace` + `backtrace_symbols`) when the
//! `backtrace` feature is enabled on linux-gnu. Everywhere else capture is
//! unavailable and the abort report degrades to no frame section at all.

use faultline_core::config::BacktraceMode;

/// Whether frame capture was compiled in.
#[must_use]
pub const fn supported() -> bool {
    cfg!(all(feature = "backtrace", target_os = "linux", target_env = "gnu"))
}

/// Captures up to [`MAX_FRAMES`](faultline_core::report::MAX_FRAMES)
/// symbolized frames, innermost first.
///
/// Returns `None` when capture is compiled out or disabled at runtime. A
/// frame whose symbol could not be resolved is rendered as its raw address.
#[must_use]
pub fn capture(mode: BacktraceMode) -> Option<Vec<String>> {
    if !mode.enabled() {
        return None;
    }
    #[cfg(all(feature = "backtrace", target_os = "linux", target_env = "gnu"))]
    {
        Some(execinfo::capture())
    }
    #[cfg(not(all(feature = "backtrace", target_os = "linux", target_env = "gnu")))]
    {
        None
    }
}

#[cfg(all(feature = "backtrace", target_os = "linux", target_env = "gnu"))]
mod execinfo {
    use std::ffi::{CStr, c_char, c_int, c_void};

    use faultline_core::report::MAX_FRAMES;

    unsafe extern "C" {
        fn backtrace(buffer: *mut *mut c_void, size: c_int) -> c_int;
        fn backtrace_symbols(buffer: *const *mut c_void, size: c_int) -> *mut *mut c_char;
    }

    pub(super) fn capture() -> Vec<String> {
        let mut addrs = [std::ptr::null_mut::<c_void>(); MAX_FRAMES];
        // SAFETY: `addrs` holds MAX_FRAMES writable slots.
        let depth = unsafe { backtrace(addrs.as_mut_ptr(), MAX_FRAMES as c_int) };
        let depth = usize::try_from(depth).unwrap_or(0).min(MAX_FRAMES);
        if depth == 0 {
            return Vec::new();
        }

        // SAFETY: the first `depth` slots were filled by `backtrace`.
        let symbols = unsafe { backtrace_symbols(addrs.as_ptr(), depth as c_int) };
        let frames = (0..depth)
            .map(|i| {
                let raw = if symbols.is_null() {
                    std::ptr::null_mut()
                } else {
                    // SAFETY: backtrace_symbols returns `depth` entries.
                    unsafe { *symbols.add(i) }
                };
                if raw.is_null() {
                    format!("[{:p}]", addrs[i])
                } else {
                    // SAFETY: entries are NUL-terminated strings inside the
                    // block returned by backtrace_symbols.
                    unsafe { CStr::from_ptr(raw) }
                        .to_string_lossy()
                        .into_owned()
                }
            })
            .collect();

        if !symbols.is_null() {
            // SAFETY: one malloc'd block owned by the caller; released with
            // the platform free, not the accounted wrapper.
            unsafe { libc::free(symbols.cast()) };
        }
        frames
    }
}
