//! Signal classification and capture.
//!
//! Every intercepted signal enters [`handle_signal`], which runs this state machine:
//!
//! ```text
//!                    ┌─ INITIALIZING ─► register ───────────────────────┐
//! slot check ─► state┤                                                   ├─► switch ─► restore
//!                    └─ otherwise ────► capture ─► classify ─┬─ syscall ─┤
//!                                                            ├─ fault ───┘
//!                                                            └─ ignored ─► return
//! ```

use core::{slice, sync::atomic::Ordering};

use sysmsg_sys::signal::{SIGBUS, SIGCHLD, SIGFPE, SIGILL, SIGSEGV, SIGSYS, SIGTRAP};

use crate::{
    arch::{Arch, FOREIGN_SYSCALL_OFFSET, FpStorage},
    context::{ContextState, ThreadContext},
    descriptor::ArchDescriptor,
    error::StubError,
    host::Host,
    restore::restore_state,
    siginfo::SigInfo,
    slot::{ThreadSlot, ThreadState},
    switch::switch_context,
};

/// What an intercepted signal means to the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Syscall,
    Fault,
    Ignored,
}

/// Classifies a delivered signal number.
pub const fn classify(signo: i32) -> Classification {
    match signo {
        SIGSYS => Classification::Syscall,
        SIGCHLD | SIGSEGV | SIGBUS | SIGFPE | SIGTRAP | SIGILL => Classification::Fault,
        _ => Classification::Ignored,
    }
}

/// How [`handle_signal`] left the signal frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The frame is untouched; the interrupted instruction resumes as the kernel left it.
    Ignored,
    /// The frame was rewritten from the context the monitor assigned.
    Resumed,
}

/// The two ways into the shared switch/restore tail.
enum Entry<'a, A: Arch> {
    /// First signal on a freshly provisioned stub: no guest context exists yet.
    Initializing,
    /// The interrupted guest state was captured into `previous`.
    Captured {
        previous: &'a ThreadContext<A>,
        state: ContextState,
    },
}

/// Handles one intercepted signal on the stub thread owning `slot`.
///
/// # Safety
///
/// - `slot` must be the slot located from the handler's own stack pointer.
/// - `uc` must be the signal frame the kernel restores when the handler returns.
/// - Every context the monitor assigns to `slot` must be live and owned by this stub thread
///   for as long as it stays assigned.
pub unsafe fn handle_signal<A: Arch, H: Host<A>>(
    host: &H,
    desc: &ArchDescriptor,
    slot: &ThreadSlot<A>,
    signo: i32,
    info: &SigInfo,
    uc: &mut A::UContext,
) -> Outcome {
    if !slot.is_valid() {
        host.fatal(None, StubError::BadSlot);
    }
    let ticket = slot.wake.load(Ordering::Acquire);

    let entry = match slot.state() {
        Ok(ThreadState::Initializing) => {
            host.register_thread(slot);
            Entry::Initializing
        }
        Ok(_) => {
            let Some(previous) = (unsafe { slot.context() }) else {
                host.fatal(Some(slot), StubError::BadContext);
            };
            unsafe { capture(host, desc, slot, previous, signo, info, uc) };

            let state = match classify(signo) {
                Classification::Syscall => {
                    if info.sigsys_arch() != A::AUDIT_ARCH {
                        let nr = A::syscall_nr(unsafe { previous.regs.get_mut() });
                        *nr = nr.wrapping_add(FOREIGN_SYSCALL_OFFSET);
                    }
                    ContextState::Syscall
                }
                Classification::Fault => ContextState::Fault,
                Classification::Ignored => return Outcome::Ignored,
            };
            Entry::Captured { previous, state }
        }
        Err(_) => host.fatal(Some(slot), StubError::BadThreadState),
    };

    let (previous, state) = match entry {
        Entry::Initializing => (None, ContextState::None),
        Entry::Captured { previous, state } => (Some(previous), state),
    };

    let next = unsafe { switch_context(host, slot, ticket, previous, state) };
    unsafe { restore_state(host, desc, slot, previous, next, uc) };

    Outcome::Resumed
}

/// Copies the interrupted thread's registers, FP state, TLS base and signal into `ctx`.
unsafe fn capture<A: Arch, H: Host<A>>(
    host: &H,
    desc: &ArchDescriptor,
    slot: &ThreadSlot<A>,
    ctx: &ThreadContext<A>,
    signo: i32,
    info: &SigInfo,
    uc: &mut A::UContext,
) {
    let Some(area) = A::fp_area(uc) else {
        host.fatal(Some(slot), StubError::FpStateMissing);
    };
    let tls = host.read_tls().unwrap_or_else(|err| host.fatal(Some(slot), err));

    let len = desc.fp_len();
    unsafe {
        ctx.signo.write(signo);
        A::save_regs(uc, ctx.regs.get_mut());
        let frame_fp = slice::from_raw_parts(area.as_ptr().cast_const(), len);
        ctx.fpstate.get_mut().as_bytes_mut()[..len].copy_from_slice(frame_fp);
        ctx.tls.write(tls);
        ctx.siginfo.write(*info);
    }
}
