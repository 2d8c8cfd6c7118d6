//! The relocatable record holding one guest thread's CPU state.

use core::sync::atomic::{AtomicU32, Ordering};

use static_assertions::const_assert_eq;

use crate::{
    arch::{Arch, FpStorage, Native, RegisterFile, aarch64::Aarch64, riscv64::Riscv64, x86_64::X86_64},
    cell::{OwnedCell, SharedEnum, SharedFlag, SharedRepr},
    siginfo::SigInfo,
    slot::ThreadState,
};

/// Why a context was last handed to the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ContextState {
    /// Never published, or published from the registration path.
    None = 0,
    Syscall = 1,
    Fault = 2,
}

impl ContextState {
    /// The slot state published alongside this classification, if any.
    #[inline]
    pub const fn thread_state(self) -> Option<ThreadState> {
        match self {
            ContextState::None => None,
            ContextState::Syscall => Some(ThreadState::Syscall),
            ContextState::Fault => Some(ThreadState::Fault),
        }
    }
}

impl SharedRepr for ContextState {
    #[inline]
    fn into_raw(self) -> u32 {
        self as u32
    }

    #[inline]
    fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(ContextState::None),
            1 => Some(ContextState::Syscall),
            2 => Some(ContextState::Fault),
            _ => None,
        }
    }
}

/// Saved execution state of one guest thread.
///
/// A context is not tied to a slot: the monitor may assign it to any stub thread, and at most
/// one stub thread works on it at a time. The snapshot fields (`signo`, `tls`, `siginfo`,
/// `regs`, `fpstate`) belong to the stub while the context is assigned and running, and to the
/// monitor while it is published.
///
/// | Field             | Writer                                    |
/// |-------------------|-------------------------------------------|
/// | `state`           | stub, when publishing                     |
/// | `interrupt`       | set by the monitor, cleared by the stub   |
/// | `fpstate_changed` | set by either side, cleared by the stub   |
/// | `last_thread_id`  | stub, when publishing                     |
#[repr(C)]
pub struct ThreadContext<A: Arch = Native> {
    pub(crate) state: SharedEnum<ContextState>,
    pub(crate) interrupt: SharedFlag,
    pub(crate) fpstate_changed: SharedFlag,
    pub(crate) last_thread_id: AtomicU32,
    pub(crate) signo: OwnedCell<i32>,
    _pad: u32,
    pub(crate) tls: OwnedCell<u64>,
    pub(crate) siginfo: OwnedCell<SigInfo>,
    pub(crate) regs: OwnedCell<A::Regs>,
    pub(crate) fpstate: OwnedCell<A::FpState>,
}

const_assert_eq!(core::mem::offset_of!(ThreadContext<X86_64>, signo), 16);
const_assert_eq!(core::mem::offset_of!(ThreadContext<X86_64>, tls), 24);
const_assert_eq!(core::mem::offset_of!(ThreadContext<X86_64>, siginfo), 32);
const_assert_eq!(core::mem::offset_of!(ThreadContext<X86_64>, regs), 160);
const_assert_eq!(core::mem::offset_of!(ThreadContext<X86_64>, fpstate), 384);
const_assert_eq!(core::mem::offset_of!(ThreadContext<Aarch64>, fpstate), 448);
const_assert_eq!(core::mem::offset_of!(ThreadContext<Riscv64>, fpstate), 448);

impl<A: Arch> ThreadContext<A> {
    /// Returns a context with an all-zero snapshot and no pending flags.
    pub fn zeroed() -> Self {
        Self {
            state: SharedEnum::new(ContextState::None),
            interrupt: SharedFlag::new(false),
            fpstate_changed: SharedFlag::new(false),
            last_thread_id: AtomicU32::new(0),
            signo: OwnedCell::new(0),
            _pad: 0,
            tls: OwnedCell::new(0),
            siginfo: OwnedCell::new(SigInfo::zeroed()),
            regs: OwnedCell::new(A::Regs::zeroed()),
            fpstate: OwnedCell::new(A::FpState::zeroed()),
        }
    }

    /// Classification of the last publication, or the raw word if it is corrupt.
    #[inline]
    pub fn state(&self) -> Result<ContextState, u32> {
        self.state.load()
    }

    #[inline]
    pub fn interrupt_pending(&self) -> bool {
        self.interrupt.is_set()
    }

    #[inline]
    pub fn fpstate_changed(&self) -> bool {
        self.fpstate_changed.is_set()
    }

    /// Thread id of the slot that last published this context.
    #[inline]
    pub fn last_thread_id(&self) -> u32 {
        self.last_thread_id.load(Ordering::Acquire)
    }

    /// # Safety
    ///
    /// The caller must own the context: the monitor while it is published, or the stub thread
    /// it is assigned to.
    #[inline]
    pub unsafe fn signo(&self) -> i32 {
        unsafe { self.signo.read() }
    }

    /// # Safety
    ///
    /// See [`ThreadContext::signo`].
    #[inline]
    pub unsafe fn tls(&self) -> u64 {
        unsafe { self.tls.read() }
    }

    /// # Safety
    ///
    /// See [`ThreadContext::signo`].
    #[inline]
    pub unsafe fn set_tls(&self, tls: u64) {
        unsafe { self.tls.write(tls) }
    }

    /// # Safety
    ///
    /// See [`ThreadContext::signo`].
    #[inline]
    pub unsafe fn siginfo(&self) -> &SigInfo {
        unsafe { self.siginfo.get() }
    }

    /// # Safety
    ///
    /// See [`ThreadContext::signo`].
    #[inline]
    pub unsafe fn regs(&self) -> &A::Regs {
        unsafe { self.regs.get() }
    }

    /// # Safety
    ///
    /// See [`ThreadContext::signo`]; no other reference to the registers may be alive.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn regs_mut(&self) -> &mut A::Regs {
        unsafe { self.regs.get_mut() }
    }

    /// # Safety
    ///
    /// See [`ThreadContext::signo`].
    #[inline]
    pub unsafe fn fpstate(&self) -> &[u8] {
        unsafe { self.fpstate.get().as_bytes() }
    }

    /// Mutable access to the FP blob. Callers that modify it must also call
    /// [`monitor::mark_fpstate_changed`](crate::monitor::mark_fpstate_changed).
    ///
    /// # Safety
    ///
    /// See [`ThreadContext::regs_mut`].
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn fpstate_mut(&self) -> &mut [u8] {
        unsafe { self.fpstate.get_mut().as_bytes_mut() }
    }

    /// Stamps the delivered signal into both the signal number and `si_signo`.
    ///
    /// # Safety
    ///
    /// See [`ThreadContext::regs_mut`].
    #[inline]
    pub(crate) unsafe fn set_signal(&self, signo: i32) {
        unsafe {
            self.signo.write(signo);
            self.siginfo.get_mut().signo = signo;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_and_syscall_map_to_slot_states() {
        assert_eq!(ContextState::None.thread_state(), None);
        assert_eq!(ContextState::Syscall.thread_state(), Some(ThreadState::Syscall));
        assert_eq!(ContextState::Fault.thread_state(), Some(ThreadState::Fault));
    }

    #[test]
    fn zeroed_context_has_no_pending_flags() {
        let ctx = Box::new(ThreadContext::<Riscv64>::zeroed());

        assert_eq!(ctx.state(), Ok(ContextState::None));
        assert!(!ctx.interrupt_pending());
        assert!(!ctx.fpstate_changed());
        assert_eq!(unsafe { ctx.fpstate() }.len(), 528);
        assert!(unsafe { ctx.regs() }.as_slice().iter().all(|&r| r == 0));
    }

    #[test]
    fn set_signal_rewrites_siginfo_too() {
        let ctx = Box::new(ThreadContext::<X86_64>::zeroed());
        unsafe { ctx.siginfo.write(SigInfo::sigsys(0, 1, 2)) };

        unsafe { ctx.set_signal(sysmsg_sys::signal::SIGCHLD) };

        assert_eq!(unsafe { ctx.signo() }, sysmsg_sys::signal::SIGCHLD);
        assert_eq!(unsafe { ctx.siginfo() }.signo, sysmsg_sys::signal::SIGCHLD);
        // The rest of the payload is left alone
        assert_eq!(unsafe { ctx.siginfo() }.sigsys_arch(), 2);
    }
}
