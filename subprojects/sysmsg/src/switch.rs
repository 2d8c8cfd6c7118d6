//! Publishing a context and waiting for the next assignment.
//!
//! Handoff, as seen from the stub:
//!
//! 1. Sample the slot's `wake` sequence (Acquire, so the sample cannot drift past the publish).
//!    The first sample is taken at handler entry, before thread registration, since the monitor
//!    may assign a context as soon as registration completes.
//! 2. Publish: stamp the context, write-fence, store the slot state, full fence.
//! 3. Wake the monitor on the slot state word.
//! 4. Sleep on `wake` until the monitor moves it past the sample.
//! 5. Read-fence, then load the assigned context and inspect its interrupt flag.
//!
//! The monitor's side is in [`monitor`](crate::monitor): store `context`, then bump `wake`
//! (Release) and futex-wake it.

use core::sync::atomic::Ordering;

use sysmsg_cpu::barrier::{memory_barrier, read_barrier, write_barrier};
use sysmsg_sys::signal::SIGCHLD;

use crate::{
    arch::Arch,
    context::{ContextState, ThreadContext},
    error::StubError,
    host::Host,
    slot::ThreadSlot,
};

/// Publishes `state` for `context` and blocks until the monitor assigns a context with no
/// pending interrupt, which is returned.
///
/// A context handed back with its interrupt flag set is never returned: the flag is cleared, the
/// context is re-classified as a fault carrying `SIGCHLD`, and the publish/wait cycle runs again.
/// The loop is unbounded; every iteration consumes one assignment from the monitor.
///
/// `context` is `None` on the registration path, where only the monitor is woken and the slot
/// state is left as is. `ticket` is the `wake` value sampled when the handler was entered.
///
/// # Safety
///
/// `slot` must be the validated slot of the calling stub thread, and every context the monitor
/// assigns must be live.
pub unsafe fn switch_context<'a, A: Arch, H: Host<A>>(
    host: &H,
    slot: &ThreadSlot<A>,
    mut ticket: u32,
    mut context: Option<&'a ThreadContext<A>>,
    mut state: ContextState,
) -> &'a ThreadContext<A> {
    loop {
        publish(slot, context, state);
        if let Err(err) = host.wake(slot.state_word()) {
            host.fatal(Some(slot), err);
        }

        while slot.wake.load(Ordering::Acquire) == ticket {
            if let Err(err) = host.wait(&slot.wake, ticket) {
                host.fatal(Some(slot), err);
            }
        }
        read_barrier();

        let Some(next) = (unsafe { slot.context() }) else {
            host.fatal(Some(slot), StubError::BadContext);
        };

        if !next.interrupt.is_set() {
            return next;
        }

        next.interrupt.clear();
        unsafe { next.set_signal(SIGCHLD) };
        context = Some(next);
        state = ContextState::Fault;
        ticket = slot.wake.load(Ordering::Acquire);
    }
}

fn publish<A: Arch>(slot: &ThreadSlot<A>, context: Option<&ThreadContext<A>>, state: ContextState) {
    if let Some(ctx) = context {
        ctx.last_thread_id.store(slot.thread_id(), Ordering::Relaxed);
        ctx.state.store(state);
    }

    write_barrier();
    if let Some(thread_state) = state.thread_state() {
        slot.state.store(thread_state);
    }
    memory_barrier();
}
