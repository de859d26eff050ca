//! Counting semaphores the counter is assembled from.
//!
//! Both backends offer the same operations: a blocking acquire, a
//! non-blocking acquire that reports the would-block outcome as `false`, a
//! release, a blocking wait for a unit that leaves the unit in place and a
//! racy read of the current count.

use core::fmt;

use crate::error::Result;

pub(crate) mod local;
#[cfg(target_os = "linux")]
pub(crate) mod shared;

/// Where the resources of a counter live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Usable by the threads of the creating process only.
    #[default]
    Private,
    /// Lives in a `MAP_SHARED` mapping and survives `fork`, so related
    /// processes can operate on the same counter.
    Shared,
}

/// Operations every semaphore backend provides.
pub(crate) trait RawSemaphore {
    fn release(&self);

    /// Takes one unit if available, never suspends.
    fn try_acquire(&self) -> bool;

    /// Takes one unit, suspending the thread until one is released.
    fn acquire(&self);

    /// Suspends the thread until the count is positive, without taking a
    /// unit.
    fn wait_available(&self);

    /// Count at some instant during the call.
    fn value(&self) -> usize;
}

/// Counting semaphore in either [`Placement`].
pub struct Semaphore {
    backend: Backend,
}

enum Backend {
    Local(local::LocalSemaphore),
    #[cfg(target_os = "linux")]
    Shared(shared::SharedSemaphore),
}

macro_rules! dispatch {
    ($self:ident, $sem:ident => $body:expr) => {
        match &$self.backend {
            Backend::Local($sem) => $body,
            #[cfg(target_os = "linux")]
            Backend::Shared($sem) => $body,
        }
    };
}

impl Semaphore {
    pub fn new(placement: Placement, value: usize) -> Result<Self> {
        let backend = match placement {
            Placement::Private => Backend::Local(local::LocalSemaphore::new(value)),
            #[cfg(target_os = "linux")]
            Placement::Shared => Backend::Shared(shared::SharedSemaphore::new(value)?),
            #[cfg(not(target_os = "linux"))]
            Placement::Shared => return Err(crate::Error::Unsupported),
        };
        Ok(Semaphore { backend })
    }

    pub fn placement(&self) -> Placement {
        match self.backend {
            Backend::Local(_) => Placement::Private,
            #[cfg(target_os = "linux")]
            Backend::Shared(_) => Placement::Shared,
        }
    }

    #[inline]
    pub fn release(&self) {
        dispatch!(self, sem => sem.release())
    }

    #[inline]
    pub fn try_acquire(&self) -> bool {
        dispatch!(self, sem => sem.try_acquire())
    }

    pub fn acquire(&self) {
        dispatch!(self, sem => sem.acquire())
    }

    /// Blocks until a unit is available but leaves it in place. Every
    /// sleeper is woken by a release, not just one.
    pub fn wait_available(&self) {
        dispatch!(self, sem => sem.wait_available())
    }

    pub fn value(&self) -> usize {
        dispatch!(self, sem => sem.value())
    }

    /// Holds one unit until the returned guard is dropped.
    pub(crate) fn critical(&self) -> Critical<'_> {
        self.acquire();
        Critical { sem: self }
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("placement", &self.placement())
            .field("value", &self.value())
            .finish()
    }
}

/// Releases on drop
pub(crate) struct Critical<'a> {
    sem: &'a Semaphore,
}

impl Drop for Critical<'_> {
    fn drop(&mut self) {
        self.sem.release();
    }
}
