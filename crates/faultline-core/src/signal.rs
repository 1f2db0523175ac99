//! Signals watched by the fault pipeline.

/// Signal numbers.
pub const SIGINT: i32 = 2;
pub const SIGABRT: i32 = 6;
pub const SIGKILL: i32 = 9;
pub const SIGSEGV: i32 = 11;
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const SIGUSR2: i32 = 12;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub const SIGUSR2: i32 = 31;

/// A signal whose disposition the fault pipeline replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultSignal {
    /// Interactive interrupt.
    Int,
    /// Invalid memory reference.
    Segv,
    /// User-defined trigger for an on-demand abort report.
    Usr2,
}

impl FaultSignal {
    /// Installation order. Saved dispositions are indexed in this order.
    pub const WATCHED: [Self; 3] = [Self::Int, Self::Segv, Self::Usr2];

    #[must_use]
    pub const fn signum(self) -> i32 {
        match self {
            Self::Int => SIGINT,
            Self::Segv => SIGSEGV,
            Self::Usr2 => SIGUSR2,
        }
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Int => "INT",
            Self::Segv => "SEGV",
            Self::Usr2 => "USR2",
        }
    }

    #[must_use]
    pub fn from_signum(signum: i32) -> Option<Self> {
        Self::WATCHED.into_iter().find(|s| s.signum() == signum)
    }
}

/// Short name for a signal number. Besides the watched set only `ABRT` and
/// `KILL` are named; anything else is `<unknown>`.
#[must_use]
pub fn signal_mnemonic(signum: i32) -> &'static str {
    match FaultSignal::from_signum(signum) {
        Some(signal) => signal.mnemonic(),
        None => match signum {
            SIGABRT => "ABRT",
            SIGKILL => "KILL",
            _ => "<unknown>",
        },
    }
}
