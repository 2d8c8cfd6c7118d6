//! Functions to read control registers
//!
//! The stub locates its shared slot record from the address of the stack it is running on, so the
//! stack pointer is read directly instead of taking the address of a local.

use core::arch::asm;

/// Read the current stack pointer.
///
/// Returns the value of `rsp` (x86_64), `sp` (aarch64) or `x2`/`sp` (riscv64) at the point of the
/// call. The value is only meaningful for locating the region the stack lives in; it is stale as
/// soon as the caller pushes anything.
#[inline(always)]
pub fn stack_pointer() -> usize {
    let sp: usize;

    #[cfg(target_arch = "x86_64")]
    unsafe {
        asm!(
            "mov {}, rsp",                            // Copy the stack pointer into `sp`
            out(reg) sp,
            options(nostack, nomem, preserves_flags)
        );
    }

    #[cfg(target_arch = "aarch64")]
    unsafe {
        asm!(
            "mov {}, sp",                             // Copy the stack pointer into `sp`
            out(reg) sp,
            options(nostack, nomem, preserves_flags)
        );
    }

    #[cfg(target_arch = "riscv64")]
    unsafe {
        asm!(
            "mv {}, sp",                              // Copy the stack pointer into `sp`
            out(reg) sp,
            options(nostack, nomem, preserves_flags)
        );
    }

    sp
}

#[cfg(test)]
mod tests {
    use super::stack_pointer;

    #[test]
    fn stack_pointer_is_near_a_local() {
        let local = 0u64;
        let local_addr = &local as *const u64 as usize;
        let sp = stack_pointer();

        // The local lives in the current frame, which sits above the stack pointer.
        assert!(sp <= local_addr);
        assert!(local_addr - sp < 64 * 1024);
    }
}
