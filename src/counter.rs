use core::fmt;

use crate::error::Result;
use crate::sem::{Placement, Semaphore};

/// Non-negative counter of outstanding units of work.
///
/// The logical value is never stored as such. It is spread over three
/// semaphores and reads as `pending + 1 - zero`:
///
/// - `pending` holds one unit per increment that has not been reconciled with
///   the zero flag yet;
/// - `zero` is binary and available exactly while the counter is zero;
/// - `guard` is binary and protects the reconciliation on a zero crossing.
///
/// As long as the value stays away from zero, [`Counter::increment`] and
/// [`Counter::decrement`] touch `pending` and `zero` with non-blocking
/// operations only. Every call to `increment` must eventually be matched by
/// exactly one call to `decrement`; decrementing a counter that is already
/// zero is a bug in the caller.
pub struct Counter {
    pending: Semaphore,
    zero: Semaphore,
    guard: Semaphore,
}

impl Counter {
    /// Creates a counter holding `initial` units.
    ///
    /// # Panics
    ///
    /// Panics if the semaphores cannot be allocated, see
    /// [`Counter::try_new`] for the fallible version.
    pub fn new(placement: Placement, initial: usize) -> Self {
        match Self::try_new(placement, initial) {
            Ok(counter) => counter,
            Err(error) => panic!("Cannot allocate counter: {error}"),
        }
    }

    pub fn try_new(placement: Placement, initial: usize) -> Result<Self> {
        let (pending, zero) = match initial {
            0 => (0, 1),
            n => (n - 1, 0),
        };
        let counter = Counter {
            pending: Semaphore::new(placement, pending)?,
            zero: Semaphore::new(placement, zero)?,
            guard: Semaphore::new(placement, 1)?,
        };
        tracing::debug!(?placement, initial, "created counter");
        Ok(counter)
    }

    pub fn placement(&self) -> Placement {
        self.guard.placement()
    }

    /// Adds one unit.
    ///
    /// Only the call that finds the counter at zero enters the critical
    /// section, every other call returns after posting its unit and peeking
    /// at the zero flag.
    #[inline]
    pub fn increment(&self) {
        self.pending.release();
        // a posted unit with the flag still up already reads as one more
        if self.zero.value() != 0 {
            self.claim_zero();
        }
    }

    #[cold]
    fn claim_zero(&self) {
        let _critical = self.guard.critical();
        // whoever got here first took the flag along with one posted unit
        if self.zero.try_acquire() {
            let reconciled = self.pending.try_acquire();
            debug_assert!(reconciled, "zero flag claimed without a pending unit");
            tracing::trace!("counter left zero");
        }
    }

    /// Removes one unit previously added by [`Counter::increment`].
    #[inline]
    pub fn decrement(&self) {
        if !self.pending.try_acquire() {
            self.release_zero();
        }
    }

    #[cold]
    fn release_zero(&self) {
        let _critical = self.guard.critical();
        // an increment may have posted since the fast path looked
        if self.pending.try_acquire() {
            return;
        }
        debug_assert_eq!(
            self.zero.value(),
            0,
            "counter decremented more often than incremented"
        );
        self.zero.release();
        tracing::trace!("counter reached zero");
    }

    /// Current value of the counter.
    ///
    /// The value was right at some instant during the call and may be stale
    /// by the time it is returned.
    pub fn value(&self) -> usize {
        let _critical = self.guard.critical();
        let pending = self.pending.value();
        let zero = self.zero.value();
        debug_assert!(zero < 2, "zero flag is not binary");
        (pending + 1).saturating_sub(zero)
    }

    /// Blocks until the counter drops to zero.
    ///
    /// Returns immediately on a counter that is already zero. The zero flag
    /// is only ever taken inside the critical section, so concurrent waiters
    /// and [`Counter::value`] never see it half-way.
    pub fn wait(&self) {
        loop {
            self.zero.wait_available();
            let _critical = self.guard.critical();
            if !self.zero.try_acquire() {
                // the counter left zero before we got in
                continue;
            }
            if self.pending.try_acquire() {
                // An increment posted but saw the flag taken. Keep the flag
                // on its behalf and wait for the next crossing.
                tracing::trace!("increment raced with wait");
                continue;
            }
            self.zero.release();
            return;
        }
    }
}

impl Default for Counter {
    fn default() -> Self {
        Counter::new(Placement::default(), 0)
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("placement", &self.placement())
            .field("value", &self.value())
            .finish()
    }
}
