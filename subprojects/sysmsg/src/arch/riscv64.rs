//! RISC-V 64 signal frame layout.
//!
//! The register snapshot is `__gregs`: index 0 holds `pc`, indices 1..=31 hold `x1..x31`. The
//! floating-point state (`__fpregs`, the `q` extension layout) follows it inline.

use core::ptr::NonNull;

use static_assertions::const_assert_eq;

use super::{Arch, FpBlob, Registers, SignalStack};

/// `AUDIT_ARCH_RISCV64`
pub const AUDIT_ARCH_RISCV64: u32 = 0xC000_00F3;

pub const NGREG: usize = 32;

pub const REG_PC: usize = 0;
pub const REG_RA: usize = 1;
pub const REG_SP: usize = 2;
pub const REG_TP: usize = 4;
pub const REG_A0: usize = 10;
/// Syscall number register.
pub const REG_A7: usize = 17;

/// Size of the `__fpregs` union.
pub const FP_STATE_CAPACITY: usize = 528;

/// RISC-V 64 layout marker.
#[derive(Debug, Clone, Copy)]
pub enum Riscv64 {}

#[derive(Clone, Copy)]
#[repr(C, align(16))]
pub struct FpRegs(pub [u8; FP_STATE_CAPACITY]);

/// `mcontext_t`
#[derive(Clone, Copy)]
#[repr(C)]
pub struct MContext {
    pub gregs: [u64; NGREG],
    pub fpregs: FpRegs,
}

/// `struct ucontext`
#[derive(Clone, Copy)]
#[repr(C)]
pub struct UContext {
    pub uc_flags: u64,
    pub uc_link: u64,
    pub uc_stack: SignalStack,
    pub uc_sigmask: u64,
    unused: [u8; 120],
    pub uc_mcontext: MContext,
}

impl UContext {
    /// Returns a frame with every field zeroed.
    pub fn zeroed() -> Self {
        // SAFETY: the frame is plain integers and bytes; all-zero is a valid bit pattern.
        unsafe { core::mem::zeroed() }
    }
}

const_assert_eq!(core::mem::offset_of!(UContext, uc_mcontext), 176);
const_assert_eq!(core::mem::offset_of!(MContext, fpregs), 256);
const_assert_eq!(core::mem::size_of::<MContext>(), 256 + FP_STATE_CAPACITY);

impl Arch for Riscv64 {
    const NAME: &'static str = "riscv64";
    const AUDIT_ARCH: u32 = AUDIT_ARCH_RISCV64;
    const SYSCALL_NR: usize = REG_A7;

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
        Some(NonNull::from(&mut uc.uc_mcontext.fpregs).cast())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::RegisterFile;

    #[test]
    fn syscall_number_lives_in_a7() {
        let mut uc = UContext::zeroed();
        uc.uc_mcontext.gregs[REG_A7] = 172;
        uc.uc_mcontext.gregs[REG_PC] = 0x1_0000;

        let mut regs = Registers::<NGREG>::zeroed();
        Riscv64::save_regs(&uc, &mut regs);

        assert_eq!(*Riscv64::syscall_nr(&mut regs), 172);
        assert_eq!(regs.0[REG_PC], 0x1_0000);
    }

    #[test]
    fn fp_area_follows_the_general_registers() {
        let mut uc = UContext::zeroed();
        let base = &uc as *const UContext as usize;

        let area = Riscv64::fp_area(&mut uc).map(|p| p.as_ptr() as usize);

        assert_eq!(area, Some(base + 176 + 256));
    }
}
