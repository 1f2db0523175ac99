//! Allocation balance accounting.
//!
//! The ledger pairs two monotonic counters, `allocated` and `freed`, and is
//! updated by the allocation wrappers after each delegate call. Counting is
//! keyed on call intent for nonzero sizes: a nonzero request counts as an
//! allocation even when the platform allocator returned null. The balance
//! check is therefore a coarse leak / over-free detector, not an exact
//! reference count.
//!
//! Counters are never reset. A signal arriving in the middle of a wrapper can
//! observe the delegate result before the counter moves; the abort path only
//! reads the counters for diagnostics, so this is tolerated.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::FaultError;

/// Point-in-time copy of the ledger counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// Number of counted allocations.
    pub allocated: u64,
    /// Number of counted releases.
    pub freed: u64,
}

impl LedgerSnapshot {
    /// Returns true when every counted allocation has a counted release.
    #[must_use]
    pub const fn is_balanced(self) -> bool {
        self.allocated == self.freed
    }

    /// Allocations minus releases. Negative values indicate over-freeing.
    #[must_use]
    pub fn outstanding(self) -> i64 {
        (self.allocated as i64).wrapping_sub(self.freed as i64)
    }

    /// Counter movement since `earlier`.
    #[must_use]
    pub const fn since(self, earlier: Self) -> Self {
        Self {
            allocated: self.allocated.wrapping_sub(earlier.allocated),
            freed: self.freed.wrapping_sub(earlier.freed),
        }
    }
}

/// Paired allocation/release counters.
#[derive(Debug, Default)]
pub struct AllocationLedger {
    allocated: AtomicU64,
    freed: AtomicU64,
}

impl AllocationLedger {
    /// Creates a ledger with both counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allocated: AtomicU64::new(0),
            freed: AtomicU64::new(0),
        }
    }

    /// Records an `allocate(size)` call whose delegate returned a non-null
    /// block iff `granted`.
    pub fn record_allocate(&self, size: usize, granted: bool) {
        if size > 0 || granted {
            self.allocated.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a `zero_allocate(count, size)` call.
    ///
    /// Intent is nonzero when both factors are nonzero, so a product that
    /// would overflow still counts.
    pub fn record_zero_allocate(&self, count: usize, size: usize, granted: bool) {
        let intent = count != 0 && size != 0;
        if intent || granted {
            self.allocated.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a `resize(existing, new_size)` call.
    ///
    /// With no existing block this is an allocation. Shrinking an existing
    /// block to zero counts as a release only when the delegate returned null,
    /// which is how allocators report that the block was freed. Every other
    /// resize leaves the counters alone.
    pub fn record_resize(&self, had_block: bool, new_size: usize, granted: bool) {
        if !had_block {
            self.record_allocate(new_size, granted);
        } else if new_size == 0 && !granted {
            self.freed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a `release` of a non-null block. Null releases must not reach
    /// the ledger.
    pub fn record_release(&self) {
        self.freed.fetch_add(1, Ordering::Relaxed);
    }

    /// Current counter values.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            allocated: self.allocated.load(Ordering::Relaxed),
            freed: self.freed.load(Ordering::Relaxed),
        }
    }

    /// Succeeds iff `allocated == freed`.
    pub fn check_balance(&self) -> Result<(), FaultError> {
        let snap = self.snapshot();
        if snap.is_balanced() {
            Ok(())
        } else {
            Err(FaultError::Balance {
                allocated: snap.allocated,
                freed: snap.freed,
            })
        }
    }
}
