//! Futex wait/wake
//!
//! The stub parks on a 32-bit word in memory shared with the monitor, which lives in another
//! process. The default flags are therefore *shared* futexes; [`FutexFlags::PRIVATE`] is only
//! correct when every waiter and waker lives in the same address space.
//!
//! Ref: <https://man7.org/linux/man-pages/man2/futex.2.html>

use core::{ptr, sync::atomic::AtomicU32};

use bitflags::bitflags;

use crate::{
    nr, raw,
    result::{Errno, check},
};

/// `FUTEX_WAIT` operation code
const FUTEX_WAIT: u32 = 0;

/// `FUTEX_WAKE` operation code
const FUTEX_WAKE: u32 = 1;

bitflags! {
    /// Modifiers OR-ed into the futex operation code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[repr(transparent)]
    pub struct FutexFlags: u32 {
        /// The futex is process-private (`FUTEX_PRIVATE_FLAG`)
        const PRIVATE = 128;
    }
}

/// Blocks the calling thread while `*word == expected`.
///
/// Returns `Ok(())` once woken by [`wake`]. Wakeups can be spurious; callers re-check the word
/// and loop.
pub fn wait(word: &AtomicU32, expected: u32, flags: FutexFlags) -> Result<(), FutexWaitError> {
    let ret = unsafe {
        raw::syscall6(
            nr::FUTEX,
            word.as_ptr() as usize,
            (FUTEX_WAIT | flags.bits()) as usize,
            expected as usize,
            ptr::null::<u8>() as usize, // No timeout
            0,
            0,
        )
    };

    check(ret).map(|_| ()).map_err(|errno| match errno {
        Errno::EAGAIN => FutexWaitError::WouldBlock,
        Errno::EINTR => FutexWaitError::Interrupted,
        Errno::ETIMEDOUT => FutexWaitError::TimedOut,
        _ => FutexWaitError::Unknown(errno),
    })
}

/// Error type for [`wait`]
#[derive(Debug, thiserror::Error)]
pub enum FutexWaitError {
    /// The word no longer held `expected` when the kernel checked it (`EAGAIN`).
    #[error("Futex word changed before sleeping")]
    WouldBlock,
    /// A signal handler interrupted the wait (`EINTR`).
    #[error("Interrupted by a signal")]
    Interrupted,
    /// The timeout expired (`ETIMEDOUT`).
    #[error("Timed out")]
    TimedOut,
    /// Any other kernel error. Contains the original [`Errno`].
    #[error("Unknown error: {0}")]
    Unknown(Errno),
}

/// Wakes up to `count` threads blocked on `word`.
///
/// Returns the number of threads actually woken.
pub fn wake(word: &AtomicU32, count: u32, flags: FutexFlags) -> Result<u32, FutexWakeError> {
    let ret = unsafe {
        raw::syscall3(
            nr::FUTEX,
            word.as_ptr() as usize,
            (FUTEX_WAKE | flags.bits()) as usize,
            count as usize,
        )
    };

    check(ret).map(|woken| woken as u32).map_err(|errno| match errno {
        Errno::EFAULT => FutexWakeError::InvalidAddress,
        _ => FutexWakeError::Unknown(errno),
    })
}

/// Error type for [`wake`]
#[derive(Debug, thiserror::Error)]
pub enum FutexWakeError {
    /// The futex word is not mapped (`EFAULT`).
    #[error("Invalid futex address")]
    InvalidAddress,
    /// Any other kernel error. Contains the original [`Errno`].
    #[error("Unknown error: {0}")]
    Unknown(Errno),
}
