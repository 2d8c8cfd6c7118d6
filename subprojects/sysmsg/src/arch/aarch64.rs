//! AArch64 signal frame layout.
//!
//! The register snapshot is `user_pt_regs`: `x0..x30`, then `sp`, `pc` and `pstate`. The
//! floating-point state lives inline in `sigcontext::__reserved`, starting with the
//! `fpsimd_context` record.

use core::ptr::NonNull;

use static_assertions::const_assert_eq;

use super::{Arch, FpBlob, Registers, SignalStack};

/// `AUDIT_ARCH_AARCH64`
pub const AUDIT_ARCH_AARCH64: u32 = 0xC000_00B7;

/// Number of registers in the snapshot.
pub const NREG: usize = 34;

/// Syscall number register.
pub const REG_X8: usize = 8;
pub const REG_SP: usize = 31;
pub const REG_PC: usize = 32;
pub const REG_PSTATE: usize = 33;

/// Size of `sigcontext::__reserved`.
pub const RESERVED_SIZE: usize = 4096;

/// The whole of `__reserved`; an `fpsimd_context` record alone is 0x210 bytes.
pub const FP_STATE_CAPACITY: usize = RESERVED_SIZE;

/// AArch64 layout marker.
#[derive(Debug, Clone, Copy)]
pub enum Aarch64 {}

#[derive(Clone, Copy)]
#[repr(C, align(16))]
pub struct Reserved(pub [u8; RESERVED_SIZE]);

/// `struct sigcontext`
#[derive(Clone, Copy)]
#[repr(C)]
pub struct MContext {
    pub fault_address: u64,
    pub regs: [u64; 31],
    pub sp: u64,
    pub pc: u64,
    pub pstate: u64,
    pub reserved: Reserved,
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

const_assert_eq!(core::mem::offset_of!(UContext, uc_sigmask), 40);
const_assert_eq!(core::mem::offset_of!(UContext, uc_mcontext), 176);
const_assert_eq!(core::mem::offset_of!(MContext, reserved), 288);
const_assert_eq!(core::mem::size_of::<MContext>(), 288 + RESERVED_SIZE);

impl Arch for Aarch64 {
    const NAME: &'static str = "aarch64";
    const AUDIT_ARCH: u32 = AUDIT_ARCH_AARCH64;
    const SYSCALL_NR: usize = REG_X8;

    type Regs = Registers<NREG>;
    type FpState = FpBlob<FP_STATE_CAPACITY>;
    type UContext = UContext;

    fn save_regs(uc: &UContext, regs: &mut Self::Regs) {
        let mc = &uc.uc_mcontext;
        regs.0[..31].copy_from_slice(&mc.regs);
        regs.0[REG_SP] = mc.sp;
        regs.0[REG_PC] = mc.pc;
        regs.0[REG_PSTATE] = mc.pstate;
    }

    fn load_regs(uc: &mut UContext, regs: &Self::Regs) {
        let mc = &mut uc.uc_mcontext;
        mc.regs.copy_from_slice(&regs.0[..31]);
        mc.sp = regs.0[REG_SP];
        mc.pc = regs.0[REG_PC];
        mc.pstate = regs.0[REG_PSTATE];
    }

    #[inline]
    fn fp_area(uc: &mut UContext) -> Option<NonNull<u8>> {
        Some(NonNull::from(&mut uc.uc_mcontext.reserved).cast())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::RegisterFile;

    #[test]
    fn save_then_load_preserves_every_register() {
        let mut uc = UContext::zeroed();
        for (i, reg) in uc.uc_mcontext.regs.iter_mut().enumerate() {
            *reg = 0x1000 + i as u64;
        }
        uc.uc_mcontext.sp = 0x7fff_0000;
        uc.uc_mcontext.pc = 0x40_0000;
        uc.uc_mcontext.pstate = 0x6000_0000;
        uc.uc_mcontext.fault_address = 0xdead;

        let mut regs = Registers::<NREG>::zeroed();
        Aarch64::save_regs(&uc, &mut regs);
        let mut out = UContext::zeroed();
        Aarch64::load_regs(&mut out, &regs);

        assert_eq!(regs.0[REG_X8], 0x1008);
        assert_eq!(regs.0[REG_PC], 0x40_0000);
        assert_eq!(out.uc_mcontext.regs, uc.uc_mcontext.regs);
        assert_eq!(out.uc_mcontext.sp, uc.uc_mcontext.sp);
        assert_eq!(out.uc_mcontext.pc, uc.uc_mcontext.pc);
        assert_eq!(out.uc_mcontext.pstate, uc.uc_mcontext.pstate);
        // Not part of the snapshot
        assert_eq!(out.uc_mcontext.fault_address, 0);
    }

    #[test]
    fn fp_area_is_the_reserved_block() {
        let mut uc = UContext::zeroed();
        let base = &uc as *const UContext as usize;

        let area = Aarch64::fp_area(&mut uc).map(|p| p.as_ptr() as usize);

        assert_eq!(area, Some(base + 176 + 288));
    }
}
