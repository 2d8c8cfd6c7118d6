//! x86-64 signal frame layout.
//!
//! The register snapshot mirrors `mcontext_t::gregs` (23 entries, glibc `REG_*` order). The
//! floating-point state is not embedded in the frame: `fpregs` points at an `XSAVE` area the
//! kernel placed further up the signal stack.

use core::ptr::NonNull;

use static_assertions::const_assert_eq;

use super::{Arch, FpBlob, Registers, SignalStack};

/// `AUDIT_ARCH_X86_64`
pub const AUDIT_ARCH_X86_64: u32 = 0xC000_003E;

pub const NGREG: usize = 23;

pub const REG_R8: usize = 0;
pub const REG_R9: usize = 1;
pub const REG_R10: usize = 2;
pub const REG_R11: usize = 3;
pub const REG_R12: usize = 4;
pub const REG_R13: usize = 5;
pub const REG_R14: usize = 6;
pub const REG_R15: usize = 7;
pub const REG_RDI: usize = 8;
pub const REG_RSI: usize = 9;
pub const REG_RBP: usize = 10;
pub const REG_RBX: usize = 11;
pub const REG_RDX: usize = 12;
pub const REG_RAX: usize = 13;
pub const REG_RCX: usize = 14;
pub const REG_RSP: usize = 15;
pub const REG_RIP: usize = 16;
pub const REG_EFL: usize = 17;
pub const REG_CSGSFS: usize = 18;
pub const REG_ERR: usize = 19;
pub const REG_TRAPNO: usize = 20;
pub const REG_OLDMASK: usize = 21;
pub const REG_CR2: usize = 22;

/// Room for an `XSAVE` image with AVX-512 and AMX tile state.
pub const FP_STATE_CAPACITY: usize = 3 * 4096;

/// x86-64 layout marker.
#[derive(Debug, Clone, Copy)]
pub enum X86_64 {}

/// `mcontext_t`
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct MContext {
    pub gregs: [u64; NGREG],
    /// User address of the `XSAVE` area, zero if the frame carries no FP state
    pub fpregs: u64,
    reserved: [u64; 8],
}

/// `struct ucontext`
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct UContext {
    pub uc_flags: u64,
    pub uc_link: u64,
    pub uc_stack: SignalStack,
    pub uc_mcontext: MContext,
    pub uc_sigmask: u64,
}

impl UContext {
    /// Returns a frame with every field zeroed, including a null `fpregs` pointer.
    pub fn zeroed() -> Self {
        // SAFETY: the frame is plain integers; all-zero is a valid bit pattern.
        unsafe { core::mem::zeroed() }
    }
}

const_assert_eq!(core::mem::size_of::<MContext>(), 256);
const_assert_eq!(core::mem::offset_of!(UContext, uc_mcontext), 40);
const_assert_eq!(core::mem::offset_of!(UContext, uc_sigmask), 296);

impl Arch for X86_64 {
    const NAME: &'static str = "x86_64";
    const AUDIT_ARCH: u32 = AUDIT_ARCH_X86_64;
    const SYSCALL_NR: usize = REG_RAX;

    type Regs = Registers<NGREG>;
    type FpState = FpBlob<FP_STATE_CAPACITY>;
    type UContext = UContext;

    #[inline]
    fn save_regs(uc: &UContext, regs: &mut Self::Regs) {
        regs.0 = uc.uc_mcontext.gregs;
    }

    #[inline]
    fn load_regs(uc: &mut UContext, regs: &Self::Regs) {
        uc.uc_mcontext.gregs = regs.0;
    }

    #[inline]
    fn fp_area(uc: &mut UContext) -> Option<NonNull<u8>> {
        NonNull::new(uc.uc_mcontext.fpregs as usize as *mut u8)
    }
}
