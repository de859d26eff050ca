use core::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

use super::RawSemaphore;

/// Thread-private semaphore.
///
/// The count is a plain atomic so that [`RawSemaphore::try_acquire`] and
/// [`RawSemaphore::release`] stay lock-free. Threads that have to sleep
/// register themselves in `sleepers` and wait on `wakeup`; a release only
/// touches the mutex when it can see a registered sleeper.
pub(crate) struct LocalSemaphore {
    count: AtomicUsize,
    sleepers: AtomicUsize,
    lock: Mutex<()>,
    wakeup: Condvar,
}

impl LocalSemaphore {
    pub(crate) fn new(value: usize) -> Self {
        LocalSemaphore {
            count: AtomicUsize::new(value),
            sleepers: AtomicUsize::new(0),
            lock: Mutex::new(()),
            wakeup: Condvar::new(),
        }
    }
}

impl RawSemaphore for LocalSemaphore {
    fn release(&self) {
        // NOTE: pairs with the sleeper registration in `acquire`, both sides
        // need SeqCst so that at least one of them sees the other
        let previous = self.count.fetch_add(1, Ordering::SeqCst);
        if previous == usize::MAX {
            panic!("Overflow of semaphore count")
        }
        if self.sleepers.load(Ordering::SeqCst) != 0 {
            let _lock = self.lock.lock();
            // sleepers in `wait_available` do not consume the unit
            self.wakeup.notify_all();
        }
    }

    fn try_acquire(&self) -> bool {
        let mut current = self.count.load(Ordering::SeqCst);
        loop {
            if current == 0 {
                return false;
            }
            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn acquire(&self) {
        if self.try_acquire() {
            return;
        }
        let mut lock = self.lock.lock();
        self.sleepers.fetch_add(1, Ordering::SeqCst);
        while !self.try_acquire() {
            self.wakeup.wait(&mut lock);
        }
        self.sleepers.fetch_sub(1, Ordering::SeqCst);
    }

    fn wait_available(&self) {
        if self.value() != 0 {
            return;
        }
        let mut lock = self.lock.lock();
        self.sleepers.fetch_add(1, Ordering::SeqCst);
        while self.value() == 0 {
            self.wakeup.wait(&mut lock);
        }
        self.sleepers.fetch_sub(1, Ordering::SeqCst);
    }

    fn value(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}
