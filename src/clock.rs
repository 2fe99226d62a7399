use std::io;

use crate::error::{Error, Result};

/// Monotonic time source in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> Result<u64>;
}

/// `CLOCK_MONOTONIC` through `clock_gettime`.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now_ms(&self) -> Result<u64> {
        // Some targets carry private padding in timespec
        let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        if rc != 0 {
            return Err(Error::Clock(io::Error::last_os_error()));
        }
        Ok(ts.tv_sec as u64 * 1000 + ts.tv_nsec as u64 / 1_000_000)
    }
}
