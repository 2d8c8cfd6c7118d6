//! The native `SA_SIGINFO` handler.

use core::ffi::{c_int, c_void};

use sysmsg_cpu::control_regs;

use crate::{
    arch::{Arch, Native},
    dispatch::handle_signal,
    error::StubError,
    install::installed,
    linux::abort,
    siginfo::SigInfo,
    slot::ThreadSlot,
};

/// Handler the monitor installs for every intercepted signal in the stub (`SA_SIGINFO`, on the
/// per-thread signal stack).
///
/// # Safety
///
/// Only to be invoked by the kernel, on a stub thread whose stack lies inside a provisioned
/// per-thread region.
pub unsafe extern "C" fn sighandler(signo: c_int, info: *mut c_void, ucontext: *mut c_void) {
    let sp = control_regs::stack_pointer();
    let slot = unsafe { ThreadSlot::<Native>::from_stack_pointer(sp) };

    let Some(host) = installed() else {
        // Without a descriptor the slot cannot be trusted either.
        abort::<Native>(None, StubError::NotInstalled);
    };

    let info = unsafe { &*(info as *const SigInfo) };
    let uc = unsafe { &mut *(ucontext as *mut <Native as Arch>::UContext) };

    unsafe { handle_signal(host, host.descriptor(), slot, signo, info, uc) };
}
