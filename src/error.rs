use std::io;

use thiserror::Error;

/// Failure to allocate a semaphore backing a [`Counter`](crate::Counter).
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot map shared memory for a semaphore")]
    Map(#[source] io::Error),
    #[error("cannot initialize a process-shared semaphore")]
    Init(#[source] io::Error),
    #[error("process-shared semaphores are not supported on this platform")]
    Unsupported,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
