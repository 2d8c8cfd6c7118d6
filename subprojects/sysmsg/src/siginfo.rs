//! Kernel `siginfo_t`.

use static_assertions::const_assert_eq;

const SIGINFO_SIZE: usize = 128;
const HEADER_SIZE: usize = 16;

/// A copy of the kernel's 128-byte `siginfo_t`.
///
/// The header (`si_signo`, `si_errno`, `si_code`) is exposed as fields; the per-signal union is
/// kept as raw bytes with accessors for the variants the stub inspects.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C, align(8))]
pub struct SigInfo {
    pub signo: i32,
    pub errno: i32,
    pub code: i32,
    _pad: i32,
    fields: [u8; SIGINFO_SIZE - HEADER_SIZE],
}

const_assert_eq!(core::mem::size_of::<SigInfo>(), SIGINFO_SIZE);

// `_sigsys` union member offsets, relative to the start of the union
const SIGSYS_CALL_ADDR: usize = 0;
const SIGSYS_SYSCALL: usize = 8;
const SIGSYS_ARCH: usize = 12;

impl SigInfo {
    pub const fn zeroed() -> Self {
        Self {
            signo: 0,
            errno: 0,
            code: 0,
            _pad: 0,
            fields: [0; SIGINFO_SIZE - HEADER_SIZE],
        }
    }

    /// Builds the `siginfo_t` the kernel raises for a seccomp `SECCOMP_RET_TRAP`.
    pub fn sigsys(call_addr: u64, syscall: i32, arch: u32) -> Self {
        let mut info = Self::zeroed();
        info.signo = sysmsg_sys::signal::SIGSYS;
        info.code = sysmsg_sys::signal::SYS_SECCOMP;
        info.fields[SIGSYS_CALL_ADDR..SIGSYS_CALL_ADDR + 8].copy_from_slice(&call_addr.to_ne_bytes());
        info.fields[SIGSYS_SYSCALL..SIGSYS_SYSCALL + 4].copy_from_slice(&syscall.to_ne_bytes());
        info.fields[SIGSYS_ARCH..SIGSYS_ARCH + 4].copy_from_slice(&arch.to_ne_bytes());
        info
    }

    /// `si_call_addr`: the address of the trapping syscall instruction.
    pub fn sigsys_call_addr(&self) -> u64 {
        u64::from_ne_bytes(self.field_at(SIGSYS_CALL_ADDR))
    }

    /// `si_syscall`
    pub fn sigsys_syscall(&self) -> i32 {
        i32::from_ne_bytes(self.field_at(SIGSYS_SYSCALL))
    }

    /// `si_arch`: the `AUDIT_ARCH_*` tag of the ABI the syscall was made with.
    pub fn sigsys_arch(&self) -> u32 {
        u32::from_ne_bytes(self.field_at(SIGSYS_ARCH))
    }

    fn field_at<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut out = [0; N];
        out.copy_from_slice(&self.fields[offset..offset + N]);
        out
    }
}

impl core::fmt::Debug for SigInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SigInfo")
            .field("signo", &self.signo)
            .field("errno", &self.errno)
            .field("code", &self.code)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigsys_fields_land_at_kernel_offsets() {
        let info = SigInfo::sigsys(0x40_1000, 257, 0x4000_0003);

        let raw = unsafe {
            core::slice::from_raw_parts(&info as *const SigInfo as *const u8, SIGINFO_SIZE)
        };

        assert_eq!(&raw[16..24], &0x40_1000u64.to_ne_bytes());
        assert_eq!(&raw[24..28], &257i32.to_ne_bytes());
        assert_eq!(&raw[28..32], &0x4000_0003u32.to_ne_bytes());
        assert_eq!(info.sigsys_call_addr(), 0x40_1000);
        assert_eq!(info.sigsys_syscall(), 257);
        assert_eq!(info.sigsys_arch(), 0x4000_0003);
    }
}
