use core::cell::UnsafeCell;
use core::mem::{self, MaybeUninit};
use core::num::NonZeroUsize;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::process;

use nix::errno::Errno;
use nix::libc;
use nix::sys::mman::{mmap_anonymous, munmap, MapFlags, ProtFlags};

use super::RawSemaphore;
use crate::error::{Error, Result};

/// Semaphore living in an anonymous shared mapping.
///
/// Works like [`LocalSemaphore`](super::local::LocalSemaphore): the count is
/// an atomic and sleepers park on a condition variable, except that the
/// mutex and condition variable are process-shared pthread objects. The
/// mapping is inherited across `fork`, so parent and children address the
/// very same region. Only the process that created it destroys the pthread
/// objects.
pub(crate) struct SharedSemaphore {
    region: NonNull<Region>,
    owner: u32,
}

// the region is designed to be operated on concurrently
unsafe impl Send for SharedSemaphore {}
unsafe impl Sync for SharedSemaphore {}

#[repr(C)]
struct Region {
    count: AtomicUsize,
    sleepers: AtomicUsize,
    mutex: UnsafeCell<libc::pthread_mutex_t>,
    cond: UnsafeCell<libc::pthread_cond_t>,
}

const REGION_SIZE: NonZeroUsize = match NonZeroUsize::new(mem::size_of::<Region>()) {
    Some(size) => size,
    None => panic!("empty semaphore region"),
};

fn check(code: libc::c_int) -> Result<(), Errno> {
    match code {
        0 => Ok(()),
        code => Err(Errno::from_raw(code)),
    }
}

#[cold]
fn fatal(op: &'static str, errno: Errno) -> ! {
    tracing::error!(op, %errno, "process-shared semaphore failed");
    panic!("{op} failed: {errno}")
}

impl SharedSemaphore {
    pub(crate) fn new(value: usize) -> Result<Self> {
        let region = unsafe {
            mmap_anonymous(
                None,
                REGION_SIZE,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
            )
        }
        .map_err(|errno| Error::Map(errno.into()))?
        .cast::<Region>();
        // anonymous mappings are zero-filled, a valid bit pattern for every
        // field before the pthread objects get initialized
        if let Err(errno) = unsafe { Region::init(region.as_ref(), value) } {
            // nothing to salvage if unmapping fails as well
            let _ = unsafe { munmap(region.cast(), REGION_SIZE.get()) };
            return Err(Error::Init(errno.into()));
        }
        tracing::debug!(value, "initialized process-shared semaphore");
        Ok(SharedSemaphore {
            region,
            owner: process::id(),
        })
    }

    fn region(&self) -> &Region {
        unsafe { self.region.as_ref() }
    }
}

impl Region {
    unsafe fn init(&self, value: usize) -> Result<(), Errno> {
        self.count.store(value, Ordering::SeqCst);

        let mut mutex_attr = MaybeUninit::<libc::pthread_mutexattr_t>::uninit();
        check(libc::pthread_mutexattr_init(mutex_attr.as_mut_ptr()))?;
        let mutex = check(libc::pthread_mutexattr_setpshared(
            mutex_attr.as_mut_ptr(),
            libc::PTHREAD_PROCESS_SHARED,
        ))
        .and_then(|()| check(libc::pthread_mutex_init(self.mutex.get(), mutex_attr.as_ptr())));
        libc::pthread_mutexattr_destroy(mutex_attr.as_mut_ptr());
        mutex?;

        let mut cond_attr = MaybeUninit::<libc::pthread_condattr_t>::uninit();
        let cond = check(libc::pthread_condattr_init(cond_attr.as_mut_ptr())).and_then(|()| {
            let cond = check(libc::pthread_condattr_setpshared(
                cond_attr.as_mut_ptr(),
                libc::PTHREAD_PROCESS_SHARED,
            ))
            .and_then(|()| check(libc::pthread_cond_init(self.cond.get(), cond_attr.as_ptr())));
            libc::pthread_condattr_destroy(cond_attr.as_mut_ptr());
            cond
        });
        if cond.is_err() {
            libc::pthread_mutex_destroy(self.mutex.get());
        }
        cond
    }

    fn lock(&self) -> Locked<'_> {
        if let Err(errno) = check(unsafe { libc::pthread_mutex_lock(self.mutex.get()) }) {
            fatal("pthread_mutex_lock", errno)
        }
        Locked { region: self }
    }
}

/// Unlocks on drop
struct Locked<'a> {
    region: &'a Region,
}

impl Locked<'_> {
    fn wait(&mut self) {
        let code = unsafe {
            libc::pthread_cond_wait(self.region.cond.get(), self.region.mutex.get())
        };
        if let Err(errno) = check(code) {
            fatal("pthread_cond_wait", errno)
        }
    }

    fn notify_all(&self) {
        if let Err(errno) = check(unsafe { libc::pthread_cond_broadcast(self.region.cond.get()) }) {
            fatal("pthread_cond_broadcast", errno)
        }
    }
}

impl Drop for Locked<'_> {
    fn drop(&mut self) {
        unsafe { libc::pthread_mutex_unlock(self.region.mutex.get()) };
    }
}

impl RawSemaphore for SharedSemaphore {
    fn release(&self) {
        let region = self.region();
        // NOTE: same SeqCst pairing with sleeper registration as the
        // private semaphore
        let previous = region.count.fetch_add(1, Ordering::SeqCst);
        if previous == usize::MAX {
            panic!("Overflow of semaphore count")
        }
        if region.sleepers.load(Ordering::SeqCst) != 0 {
            region.lock().notify_all();
        }
    }

    fn try_acquire(&self) -> bool {
        let count = &self.region().count;
        let mut current = count.load(Ordering::SeqCst);
        loop {
            if current == 0 {
                return false;
            }
            match count.compare_exchange_weak(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn acquire(&self) {
        if self.try_acquire() {
            return;
        }
        let region = self.region();
        let mut locked = region.lock();
        region.sleepers.fetch_add(1, Ordering::SeqCst);
        while !self.try_acquire() {
            locked.wait();
        }
        region.sleepers.fetch_sub(1, Ordering::SeqCst);
    }

    fn wait_available(&self) {
        if self.value() != 0 {
            return;
        }
        let region = self.region();
        let mut locked = region.lock();
        region.sleepers.fetch_add(1, Ordering::SeqCst);
        while self.value() == 0 {
            locked.wait();
        }
        region.sleepers.fetch_sub(1, Ordering::SeqCst);
    }

    fn value(&self) -> usize {
        self.region().count.load(Ordering::SeqCst)
    }
}

impl Drop for SharedSemaphore {
    fn drop(&mut self) {
        if process::id() == self.owner {
            let region = self.region();
            unsafe {
                libc::pthread_cond_destroy(region.cond.get());
                libc::pthread_mutex_destroy(region.mutex.get());
            }
        }
        if let Err(errno) = unsafe { munmap(self.region.cast(), REGION_SIZE.get()) } {
            tracing::error!(%errno, "cannot unmap process-shared semaphore");
        }
    }
}
