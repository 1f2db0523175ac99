//! Shared internal utilities for ABI adapters.

use std::fmt;

const LINE_CAP: usize = 512;

/// Line-buffered writer straight onto fd 2.
///
/// Renders into a fixed stack buffer and flushes with `write(2)` at each
/// newline, so report output never takes the `std::io::Stderr` lock or
/// allocates. Lines longer than the buffer are written through unbuffered.
pub(crate) struct StderrWriter {
    buf: [u8; LINE_CAP],
    len: usize,
}

impl StderrWriter {
    pub(crate) const fn new() -> Self {
        Self {
            buf: [0; LINE_CAP],
            len: 0,
        }
    }

    pub(crate) fn flush(&mut self) {
        write_all_fd(libc::STDERR_FILENO, &self.buf[..self.len]);
        self.len = 0;
    }
}

impl fmt::Write for StderrWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        if bytes.len() > LINE_CAP - self.len {
            self.flush();
        }
        if bytes.len() > LINE_CAP {
            write_all_fd(libc::STDERR_FILENO, bytes);
        } else {
            self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
            self.len += bytes.len();
        }
        if bytes.ends_with(b"\n") {
            self.flush();
        }
        Ok(())
    }
}

impl Drop for StderrWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Writes all of `bytes`, retrying on `EINTR` and short writes. Gives up
/// silently on any other error: there is nowhere left to report it.
pub(crate) fn write_all_fd(fd: libc::c_int, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        // SAFETY: `bytes` is a live slice for the duration of the call.
        let rc = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        if rc < 0 {
            if last_errno(0) == libc::EINTR {
                continue;
            }
            return;
        }
        if rc == 0 {
            return;
        }
        bytes = &bytes[rc as usize..];
    }
}

#[inline]
pub(crate) fn last_errno(default_errno: libc::c_int) -> libc::c_int {
    std::io::Error::last_os_error()
        .raw_os_error()
        .unwrap_or(default_errno)
}
