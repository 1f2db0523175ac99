//! ABI layer for stream buffering.

use std::ffi::c_void;

/// Switches `stream` (a C `FILE *`) to line buffering.
///
/// Must be called before any other operation on the stream, as with
/// `setvbuf`. A null stream is ignored; a rejected mode change is ignored.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn faultline_set_linebuffered(stream: *mut c_void) {
    if stream.is_null() {
        return;
    }
    // SAFETY: caller guarantees `stream` is an open, not yet used FILE.
    let _ = unsafe {
        libc::setvbuf(
            stream.cast::<libc::FILE>(),
            std::ptr::null_mut(),
            libc::_IOLBF,
            0,
        )
    };
}
