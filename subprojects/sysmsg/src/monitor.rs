//! The monitor's half of the slot handoff.
//!
//! These functions are the only writers of the monitor-owned fields of [`ThreadSlot`] and
//! [`ThreadContext`]. They only touch shared memory: waking a parked stub (a futex wake on
//! [`ThreadSlot::wake_word`]) is left to the caller, which may live in a different process.

use core::sync::atomic::Ordering;

use crate::{
    arch::Arch,
    context::ThreadContext,
    slot::{ThreadSlot, ThreadState},
};

/// Prepares a slot in its final location for a new stub thread.
///
/// The slot starts out [`ThreadState::Initializing`] with no context, so the stub's first signal
/// goes through thread registration.
///
/// # Safety
///
/// `slot` must be valid for writes and must not move afterwards: its self-reference is its
/// current address. No stub thread may be running on it yet.
pub unsafe fn provision<A: Arch>(slot: *mut ThreadSlot<A>) {
    let slot = unsafe { &*slot };
    slot.self_addr
        .store(slot as *const ThreadSlot<A> as usize as u64, Ordering::Relaxed);
    slot.wake.store(0, Ordering::Relaxed);
    slot.context.store(core::ptr::null_mut());
    slot.thread_id.store(0, Ordering::Relaxed);
    slot.err.store(0, Ordering::Relaxed);
    slot.state.store(ThreadState::Initializing);
}

/// Records the id the registration hook allocated for `slot`.
pub fn set_thread_id<A: Arch>(slot: &ThreadSlot<A>, thread_id: u32) {
    slot.thread_id.store(thread_id, Ordering::Release);
}

/// Assigns `context` to `slot` and releases the stub parked on it.
///
/// Everything the monitor wrote into `context` beforehand is visible to the stub once it observes
/// the new `wake` value. The caller then futex-wakes [`ThreadSlot::wake_word`]. Returns the new
/// `wake` value.
pub fn assign<A: Arch>(slot: &ThreadSlot<A>, context: *mut ThreadContext<A>) -> u32 {
    slot.context.store(context);
    slot.wake.fetch_add(1, Ordering::Release).wrapping_add(1)
}

/// Flags `context` so that its next assignment is reported back as a `SIGCHLD` fault instead
/// of being resumed.
pub fn interrupt<A: Arch>(context: &ThreadContext<A>) {
    context.interrupt.set();
}

/// Forces the next restore of `context` to rewrite the FP area, after the monitor edited the blob.
pub fn mark_fpstate_changed<A: Arch>(context: &ThreadContext<A>) {
    context.fpstate_changed.set();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::riscv64::Riscv64;

    #[test]
    fn provision_makes_the_slot_self_referencing() {
        let mut slot = Box::new(ThreadSlot::<Riscv64>::zeroed());
        slot.err.store(7, Ordering::Relaxed);

        unsafe { provision(&mut *slot) };

        assert!(slot.is_valid());
        assert_eq!(slot.state(), Ok(ThreadState::Initializing));
        assert_eq!(slot.error_code(), 0);
        assert!(unsafe { slot.context() }.is_none());
    }

    #[test]
    fn assign_bumps_the_wake_sequence() {
        let slot = Box::new(ThreadSlot::<Riscv64>::zeroed());
        let mut ctx = Box::new(ThreadContext::<Riscv64>::zeroed());

        assert_eq!(assign(&slot, &mut *ctx), 1);
        assert_eq!(assign(&slot, &mut *ctx), 2);
        assert_eq!(slot.wake_word().load(Ordering::Relaxed), 2);
        assert!(core::ptr::eq(unsafe { slot.context() }.unwrap(), &*ctx));
    }
}
