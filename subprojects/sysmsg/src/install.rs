//! One-time, process-wide installation of the signal handler's configuration.

use core::{
    cell::UnsafeCell,
    mem::MaybeUninit,
    sync::atomic::{
        AtomicU32,
        Ordering::{Acquire, Relaxed, Release},
    },
};

use thiserror::Error;

use crate::{
    arch::Native,
    descriptor::{ArchDescriptor, InvalidDescriptor},
    linux::{LinuxHost, RegisterThreadFn},
};

/// No value has been stored yet.
const INCOMPLETE: u32 = 0;
/// A thread is storing the value.
const RUNNING: u32 = 1;
/// The value is stored and immutable.
const COMPLETE: u32 = 2;

/// A cell written at most once and read without synchronization afterwards.
///
/// Readers never block: while the value is being written they see an empty cell, the same as
/// before installation.
pub struct InstallCell<T> {
    state: AtomicU32,
    value: UnsafeCell<MaybeUninit<T>>,
}

// SAFETY: the value is written once, before `COMPLETE` is published with Release; readers only
// hand out shared references after observing `COMPLETE` with Acquire.
unsafe impl<T: Send + Sync> Sync for InstallCell<T> {}

impl<T> InstallCell<T> {
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(INCOMPLETE),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Stores `value`, or gives it back if the cell was already claimed.
    pub fn set(&self, value: T) -> Result<(), T> {
        if self
            .state
            .compare_exchange(INCOMPLETE, RUNNING, Acquire, Relaxed)
            .is_err()
        {
            return Err(value);
        }

        unsafe { (*self.value.get()).write(value) };
        self.state.store(COMPLETE, Release);
        Ok(())
    }

    #[inline]
    pub fn get(&self) -> Option<&T> {
        if self.state.load(Acquire) != COMPLETE {
            return None;
        }
        Some(unsafe { (*self.value.get()).assume_init_ref() })
    }
}

impl<T> Default for InstallCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

static INSTALLED: InstallCell<LinuxHost> = InstallCell::new();

/// Validates `descriptor` and arms the signal handler with it.
///
/// Must run before the first intercepted signal can be delivered. The configuration cannot be
/// replaced afterwards.
pub fn install(
    descriptor: ArchDescriptor,
    register_thread: RegisterThreadFn,
) -> Result<(), InstallError> {
    descriptor.validate::<Native>()?;

    INSTALLED
        .set(LinuxHost::new(descriptor, register_thread))
        .map_err(|_| InstallError::AlreadyInstalled)
}

/// The installed host, if [`install`] has completed.
#[inline]
pub fn installed() -> Option<&'static LinuxHost> {
    INSTALLED.get()
}

/// Error type for [`install`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InstallError {
    #[error("signal handler is already installed")]
    AlreadyInstalled,

    #[error("invalid architecture descriptor: {0}")]
    InvalidDescriptor(#[from] InvalidDescriptor),
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;
    use crate::slot::ThreadSlot;

    unsafe extern "C" fn register_nothing(_slot: *mut ThreadSlot) {}

    #[test]
    fn cell_is_empty_until_set() {
        let cell = InstallCell::<u32>::new();
        assert_eq!(cell.get(), None);

        assert_eq!(cell.set(7), Ok(()));
        assert_eq!(cell.get(), Some(&7));
    }

    #[test]
    fn second_set_returns_the_value() {
        let cell = InstallCell::new();
        cell.set(1).unwrap();

        assert_eq!(cell.set(2), Err(2));
        assert_eq!(cell.get(), Some(&1));
    }

    #[test]
    fn exactly_one_racing_setter_wins() {
        let cell = Arc::new(InstallCell::<usize>::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cell = Arc::clone(&cell);
                thread::spawn(move || cell.set(i).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();

        assert_eq!(winners, 1);
        assert!(cell.get().is_some());
    }

    // The only test touching the process-wide cell.
    #[test]
    fn install_validates_then_arms_once() {
        let good = ArchDescriptor {
            fp_len: 512,
            fsgsbase: 0,
            stub_start: 0x1000,
            stub_end: 0x2000,
        };
        let bad = ArchDescriptor { fp_len: 0, ..good };

        assert_eq!(
            install(bad, register_nothing),
            Err(InstallError::InvalidDescriptor(InvalidDescriptor::EmptyFpState))
        );
        assert!(installed().is_none());

        install(good, register_nothing).unwrap();
        assert_eq!(installed().map(|host| *host.descriptor()), Some(good));

        assert_eq!(
            install(good, register_nothing),
            Err(InstallError::AlreadyInstalled)
        );
    }
}
