use core::ptr;

use sysmsg_cpu::barrier::write_barrier;

use crate::{
    arch::{Arch, FpStorage},
    context::ThreadContext,
    descriptor::ArchDescriptor,
    error::StubError,
    host::Host,
    slot::{ThreadSlot, ThreadState},
};

/// Writes `next` onto the signal frame and releases the slot.
///
/// The FP area is only rewritten when the context changed hands: when it is not `previous`, when
/// a different slot ran it last, or when the monitor flagged its FP state as modified. General
/// registers and the TLS base are always rewritten. Storing [`ThreadState::None`] is the last
/// access to shared memory before the handler returns.
///
/// # Safety
///
/// `uc` must be the frame the kernel restores on return from the current signal, and the caller
/// must own `next`.
pub unsafe fn restore_state<A: Arch, H: Host<A>>(
    host: &H,
    desc: &ArchDescriptor,
    slot: &ThreadSlot<A>,
    previous: Option<&ThreadContext<A>>,
    next: &ThreadContext<A>,
    uc: &mut A::UContext,
) {
    let rebound = previous.is_none_or(|prev| !ptr::eq(prev, next));
    if rebound || next.last_thread_id() != slot.thread_id() {
        next.fpstate_changed.set();
    }

    if next.fpstate_changed.is_set() {
        let Some(area) = A::fp_area(uc) else {
            host.fatal(Some(slot), StubError::FpStateMissing);
        };
        let len = desc.fp_len();
        unsafe {
            let blob = &next.fpstate.get().as_bytes()[..len];
            ptr::copy_nonoverlapping(blob.as_ptr(), area.as_ptr(), len);
        }
        next.fpstate_changed.clear();
    }

    unsafe {
        A::load_regs(uc, next.regs.get());
        if let Err(err) = host.write_tls(next.tls.read()) {
            host.fatal(Some(slot), err);
        }
    }

    write_barrier();
    slot.state.store(ThreadState::None);
}
