//! Fault scenarios.
//!
//! Each scenario installs the fault handler the way an owning application
//! would, then drives one trigger. Apart from `Balanced`, every scenario ends
//! in process termination.

use std::ffi::{CStr, c_void};
use std::io::Write;

use clap::{Subcommand, ValueEnum};
use faultline_abi::malloc_abi::{faultline_free, faultline_malloc};
use faultline_abi::fault_abi::install_into;
use faultline_abi::{check_allocation_balance, install_fault_handler, trigger_abort};
use faultline_core::signal::{FaultSignal, SIGINT, SIGKILL};

/// Prefix of the line the cleanup callback prints.
pub const CLEANUP_MARKER: &str = "cleanup invoked: ";
/// Unterminated text left in Rust's stdout buffer before an abort.
pub const PENDING_STDOUT: &str = "pending-stdout";

static ABORT_LABEL: &CStr = c"abort";
static SIGNAL_LABEL: &CStr = c"signal";
static LEAK_LABEL: &CStr = c"leak";
static FIRST_LABEL: &CStr = c"first";
static SECOND_LABEL: &CStr = c"second";
static FAULTING_LABEL: &CStr = c"faulting";
static REJECTED_LABEL: &CStr = c"rejected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WatchedSignal {
    Int,
    Segv,
    Usr2,
}

impl From<WatchedSignal> for FaultSignal {
    fn from(value: WatchedSignal) -> Self {
        match value {
            WatchedSignal::Int => Self::Int,
            WatchedSignal::Segv => Self::Segv,
            WatchedSignal::Usr2 => Self::Usr2,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Scenario {
    /// Install a cleanup callback and call the abort entry point.
    Abort,
    /// Install a cleanup callback and raise a watched signal.
    Raise {
        #[arg(value_enum)]
        signal: WatchedSignal,
    },
    /// Install a cleanup callback and touch an unmapped address.
    Segfault,
    /// Leave one allocation unmatched and run the balance check.
    Leak,
    /// Run matched allocation pairs and the balance check; exits normally.
    Balanced,
    /// Install one callback, rebind to another, then abort.
    Rebind,
    /// Install, uninstall, then raise USR2 under the restored disposition.
    UninstalledRaise,
    /// Set only an identifier (no callback) and abort.
    NoCallback,
    /// Abort with a callback that itself faults.
    CallbackFault,
    /// Leave unterminated text in stdout, then abort.
    PendingStdout,
    /// Install over a signal set the OS refuses (`INT`, then `KILL`).
    RejectedInstall,
}

unsafe extern "C" fn print_cleanup(ctx: *mut c_void) {
    // SAFETY: every context handed out below points at a static C string.
    let label = unsafe { CStr::from_ptr(ctx.cast_const().cast()) };
    let mut err = std::io::stderr().lock();
    let _ = writeln!(err, "{CLEANUP_MARKER}{}", label.to_string_lossy());
}

unsafe extern "C" fn faulting_cleanup(ctx: *mut c_void) {
    unsafe { print_cleanup(ctx) };
    raise(FaultSignal::Segv);
}

fn label_ptr(label: &'static CStr) -> *mut c_void {
    label.as_ptr().cast_mut().cast()
}

fn install(identifier: Option<u32>, label: &'static CStr) {
    // SAFETY: print_cleanup only reads the static label.
    unsafe { install_fault_handler(identifier, Some(print_cleanup), label_ptr(label)) };
}

fn raise(signal: FaultSignal) {
    // SAFETY: raising a signal at ourselves.
    unsafe { libc::raise(signal.signum()) };
}

/// Runs `scenario`. Returns only for scenarios that end normally.
pub fn run(identifier: Option<u32>, scenario: &Scenario) {
    match scenario {
        Scenario::Abort => {
            install(identifier, ABORT_LABEL);
            trigger_abort();
        }
        Scenario::Raise { signal } => {
            install(identifier, SIGNAL_LABEL);
            raise((*signal).into());
        }
        Scenario::Segfault => {
            install(identifier, SIGNAL_LABEL);
            // SAFETY: deliberately faults; the handler never returns.
            unsafe { std::ptr::write_volatile(16usize as *mut u8, 1) };
        }
        Scenario::Leak => {
            install(identifier, LEAK_LABEL);
            let kept = unsafe { faultline_malloc(32) };
            let paired = unsafe { faultline_malloc(64) };
            unsafe { faultline_free(paired) };
            std::hint::black_box(kept);
            check_allocation_balance();
        }
        Scenario::Balanced => {
            for size in [1usize, 16, 4096] {
                let block = unsafe { faultline_malloc(size) };
                unsafe { faultline_free(block) };
            }
            check_allocation_balance();
            println!("balanced");
            return;
        }
        Scenario::Rebind => {
            install(identifier, FIRST_LABEL);
            install(identifier, SECOND_LABEL);
            trigger_abort();
        }
        Scenario::UninstalledRaise => {
            install(identifier, SIGNAL_LABEL);
            // SAFETY: clearing the callback never calls user code.
            unsafe { install_fault_handler(identifier, None, std::ptr::null_mut()) };
            raise(FaultSignal::Usr2);
        }
        Scenario::NoCallback => {
            // SAFETY: no callback is registered.
            unsafe { install_fault_handler(identifier, None, std::ptr::null_mut()) };
            trigger_abort();
        }
        Scenario::CallbackFault => {
            // SAFETY: faulting_cleanup only reads the static label, then faults.
            unsafe {
                install_fault_handler(identifier, Some(faulting_cleanup), label_ptr(FAULTING_LABEL));
            }
            trigger_abort();
        }
        Scenario::PendingStdout => {
            install(identifier, ABORT_LABEL);
            print!("{PENDING_STDOUT}");
            trigger_abort();
        }
        Scenario::RejectedInstall => {
            // SAFETY: print_cleanup only reads the static label.
            unsafe {
                install_into(
                    identifier,
                    Some(print_cleanup),
                    label_ptr(REJECTED_LABEL),
                    &[SIGINT, SIGKILL],
                );
            }
        }
    }
    // Triggers that did not terminate the process are harness bugs.
    eprintln!("scenario {scenario:?} returned");
    std::process::exit(2);
}
