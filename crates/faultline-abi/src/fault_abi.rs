//! Fault pipeline: abort handler installation, the abort entry point and the
//! internal signal handler.
//!
//! State machine: **Uninstalled** -> **Installed** (callback set, `INT`,
//! `SEGV`, `USR2` dispositions replaced, previous ones saved) -> **Aborting**
//! (terminal). Re-installing with a null callback restores the saved
//! dispositions exactly and returns to Uninstalled.
//!
//! The saved dispositions and the installed flag live behind one mutex so two
//! racing install calls cannot interleave. Identifier, callback and context
//! are published through atomics because the abort path reads them from
//! signal context, where taking that mutex could deadlock against an
//! interrupted install.
//!
//! Before the callback runs, every C stdio stream is flushed. Rust's buffered
//! `stdout` is flushed too, except on the signal path: its lock may be held by
//! the interrupted code, so `print!` output pending at signal time is lost.
//!
//! Known limitation: the signal handler formats output, symbolizes frames and
//! runs the owner's callback. None of that is async-signal-safe. Report lines
//! are written to fd 2 from a stack buffer, which keeps the common case
//! usable, but a fault inside the allocator can still deadlock during
//! symbolization.

use std::ffi::{c_int, c_void};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicPtr, AtomicUsize, Ordering};

use faultline_core::config::FaultConfig;
use faultline_core::error::FaultError;
use faultline_core::report;
use faultline_core::signal::{FaultSignal, signal_mnemonic};
use faultline_core::structured_log::{FaultCause, FaultEvent};
use parking_lot::Mutex;

use crate::backtrace;
use crate::malloc_abi;
use crate::util::{StderrWriter, last_errno};

/// Owner cleanup callback: `void (*)(void *)`.
pub type AbortHandler = unsafe extern "C" fn(*mut c_void);

const NO_IDENTIFIER: i64 = -1;

static IDENTIFIER: AtomicI64 = AtomicI64::new(NO_IDENTIFIER);
static HANDLER: AtomicUsize = AtomicUsize::new(0);
static CONTEXT: AtomicPtr<c_void> = AtomicPtr::new(std::ptr::null_mut());
static ABORTING: AtomicBool = AtomicBool::new(false);
static CONFIG: OnceLock<FaultConfig> = OnceLock::new();

/// `Some` exactly while our handler owns the watched signals.
static DISPOSITIONS: Mutex<Option<SavedDispositions>> = parking_lot::const_mutex(None);

/// Dispositions displaced at install time, in installation order.
struct SavedDispositions {
    previous: Vec<(c_int, libc::sigaction)>,
}

// ---------------------------------------------------------------------------
// install
// ---------------------------------------------------------------------------

/// Registers (or clears) the owner's abort callback.
///
/// Identifier, callback and context are always replaced. A non-null callback
/// installs the signal handler on first use and leaves OS state untouched
/// afterwards; a null callback restores the saved dispositions if installed.
/// Failure to install any disposition is fatal.
///
/// # Safety
///
/// `handler`, when called with `context` from the abort path, must be sound
/// to run at an arbitrary point of the program, including inside a signal
/// handler.
pub unsafe fn install_fault_handler(
    identifier: Option<u32>,
    handler: Option<AbortHandler>,
    context: *mut c_void,
) {
    let watched = FaultSignal::WATCHED.map(FaultSignal::signum);
    unsafe { install_into(identifier, handler, context, &watched) }
}

/// [`install_fault_handler`] over an explicit signal set. `signals` is only
/// read on the install transition; uninstall restores whatever was saved then.
///
/// # Safety
///
/// As for [`install_fault_handler`].
#[doc(hidden)]
pub unsafe fn install_into(
    identifier: Option<u32>,
    handler: Option<AbortHandler>,
    context: *mut c_void,
    signals: &[c_int],
) {
    // Resolve configuration now; the abort path must not be the first reader.
    let _ = fault_config();

    let mut saved = DISPOSITIONS.lock();
    IDENTIFIER.store(identifier.map_or(NO_IDENTIFIER, i64::from), Ordering::SeqCst);
    HANDLER.store(handler.map_or(0, |h| h as usize), Ordering::SeqCst);
    CONTEXT.store(context, Ordering::SeqCst);

    match (handler.is_some(), saved.is_some()) {
        (true, false) => match unsafe { replace_dispositions(signals) } {
            Ok(previous) => *saved = Some(previous),
            Err(err) => die_during_install(identifier, &err),
        },
        (false, true) => {
            if let Some(previous) = saved.take() {
                unsafe { restore_dispositions(&previous) };
            }
        }
        _ => {}
    }
}

/// C entry point. A negative `identifier` means "no identifier".
#[unsafe(no_mangle)]
pub unsafe extern "C" fn faultline_set_abort_handler(
    identifier: c_int,
    handler: Option<AbortHandler>,
    context: *mut c_void,
) {
    unsafe { install_fault_handler(u32::try_from(identifier).ok(), handler, context) }
}

/// Returns true while the fault handler owns the watched signals.
#[must_use]
pub fn handlers_installed() -> bool {
    DISPOSITIONS.lock().is_some()
}

/// Identifier used to prefix report lines.
#[must_use]
pub fn current_identifier() -> Option<u32> {
    u32::try_from(IDENTIFIER.load(Ordering::SeqCst)).ok()
}

/// Address installed as the disposition of every watched signal.
#[doc(hidden)]
#[must_use]
pub fn signal_handler_address() -> libc::sighandler_t {
    fault_signal_handler as extern "C" fn(c_int) as libc::sighandler_t
}

/// Configuration resolved from the environment on first use.
pub fn fault_config() -> &'static FaultConfig {
    CONFIG.get_or_init(FaultConfig::from_env)
}

unsafe fn replace_dispositions(signals: &[c_int]) -> Result<SavedDispositions, FaultError> {
    // SAFETY: sigaction is plain old data; all-zero is a valid value.
    let mut act: libc::sigaction = unsafe { std::mem::zeroed() };
    act.sa_sigaction = signal_handler_address();
    act.sa_flags = libc::SA_RESTART;
    unsafe { libc::sigemptyset(&mut act.sa_mask) };

    let mut previous = Vec::with_capacity(signals.len());
    for &signum in signals {
        let mut slot: libc::sigaction = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::sigaction(signum, &act, &mut slot) };
        if rc != 0 {
            return Err(FaultError::Install {
                signal: signal_mnemonic(signum),
                errno: last_errno(libc::EINVAL),
            });
        }
        previous.push((signum, slot));
    }
    Ok(SavedDispositions { previous })
}

unsafe fn restore_dispositions(saved: &SavedDispositions) {
    for (signum, previous) in &saved.previous {
        unsafe { libc::sigaction(*signum, previous, std::ptr::null_mut()) };
    }
}

/// Installation failed. Report and terminate without entering the abort
/// routine: the handler it would rely on is half installed.
fn die_during_install(identifier: Option<u32>, err: &FaultError) -> ! {
    let mut out = StderrWriter::new();
    let _ = report::write_fatal_notice(&mut out, identifier, err);
    drop(out);
    std::process::abort()
}

// ---------------------------------------------------------------------------
// abort
// ---------------------------------------------------------------------------

/// The single abort entry point. Never returns.
pub fn trigger_abort() -> ! {
    abort_with(FaultCause::Explicit)
}

#[unsafe(no_mangle)]
pub extern "C" fn faultline_abort() -> ! {
    trigger_abort()
}

/// Prints `"<prefix>Abort: <reason>"` and runs the abort routine.
pub fn fatal(reason: &dyn fmt::Display) -> ! {
    let mut out = StderrWriter::new();
    let _ = report::write_fatal_notice(&mut out, current_identifier(), reason);
    drop(out);
    abort_with(FaultCause::Fatal {
        reason: reason.to_string(),
    })
}

extern "C" fn fault_signal_handler(signum: c_int) {
    let mnemonic = signal_mnemonic(signum);
    let mut out = StderrWriter::new();
    let _ = report::write_signal_notice(&mut out, current_identifier(), mnemonic);
    drop(out);
    abort_with(FaultCause::Signal {
        signal: mnemonic.to_owned(),
    })
}

fn current_handler() -> Option<AbortHandler> {
    match HANDLER.load(Ordering::SeqCst) {
        0 => None,
        // SAFETY: only ever stored from a valid `AbortHandler`.
        raw => Some(unsafe { std::mem::transmute::<usize, AbortHandler>(raw) }),
    }
}

fn abort_with(cause: FaultCause) -> ! {
    if ABORTING.swap(true, Ordering::SeqCst) {
        // Faulted again while reporting (e.g. SEGV in the callback).
        std::process::abort()
    }

    // Rust's stdout sits behind a lock the interrupted code may hold.
    let flush_rust_stdout = !matches!(cause, FaultCause::Signal { .. });
    let identifier = current_identifier();
    let config = fault_config();
    let handler = current_handler();

    let frames = backtrace::capture(config.backtrace);
    if let Some(frames) = &frames {
        let mut out = StderrWriter::new();
        let _ = report::write_backtrace(&mut out, identifier, frames);
    }

    if let Some(path) = &config.event_log {
        let event = FaultEvent::new(identifier, cause, malloc_abi::ledger().snapshot())
            .with_frames(frames.as_deref().unwrap_or(&[]))
            .with_callback(handler.is_some());
        append_event(path, &event);
    }

    if flush_rust_stdout {
        let _ = std::io::stdout().flush();
    }
    // SAFETY: a null stream flushes every open C stdio stream.
    unsafe { libc::fflush(std::ptr::null_mut()) };

    if let Some(handler) = handler {
        // SAFETY: the installer vouched for calling `handler` with `context`.
        unsafe { handler(CONTEXT.load(Ordering::SeqCst)) };
    }

    std::process::abort()
}

fn append_event(path: &Path, event: &FaultEvent) {
    let Ok(line) = event.to_jsonl() else {
        return;
    };
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{line}");
    }
}
