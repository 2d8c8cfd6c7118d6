//! Hardware thread pointer
//!
//! The thread pointer is the register the C runtime and the Rust `thread_local!` machinery use as
//! the base of the current thread's TLS block:
//!
//! - x86_64: the `fs` segment base, accessed with `rdfsbase`/`wrfsbase`
//! - aarch64: `tpidr_el0`
//! - riscv64: `tp` (`x4`)
//!
//! The stub handler must capture the interrupted guest's value before anything that depends on TLS
//! runs, and later write back the value of whichever guest context is resumed. Both accessors are
//! therefore raw register moves with no runtime involvement.
//!
//! On x86_64 the `FSGSBASE` instructions are only usable when both the CPU and the kernel enable
//! them (`CR4.FSGSBASE`, Linux 5.9+). Callers must check for support first and otherwise go
//! through `arch_prctl(2)`.
//!
//! ## References
//! - [Intel SDM: RDFSBASE/RDGSBASE](https://www.felixcloutier.com/x86/rdfsbase:rdgsbase)
//! - [ARM TPIDR_EL0 Register](https://developer.arm.com/documentation/ddi0601/2024-12/AArch64-Registers/TPIDR-EL0--EL0-Read-Write-Software-Thread-ID-Register)
//! - [RISC-V ELF psABI: Thread Local Storage](https://github.com/riscv-non-isa/riscv-elf-psabi-doc/blob/master/riscv-elf.adoc#thread-local-storage)

use core::arch::asm;

/// Reads the hardware thread pointer of the current thread.
///
/// # Safety
///
/// On x86_64 the `rdfsbase` instruction raises `#UD` (delivered as `SIGILL`) unless `FSGSBASE` is
/// enabled. The caller must have verified support. On aarch64 and riscv64 the read is always
/// valid.
#[inline(always)]
pub unsafe fn read_thread_pointer() -> u64 {
    let tp: u64;

    #[cfg(target_arch = "x86_64")]
    unsafe {
        asm!(
            "rdfsbase {}",                            // Read the `fs` segment base
            out(reg) tp,
            options(nostack, nomem, preserves_flags)
        );
    }

    #[cfg(target_arch = "aarch64")]
    unsafe {
        asm!(
            "mrs {}, tpidr_el0",                      // Move from system register `tpidr_el0`
            out(reg) tp,
            options(nostack, nomem, preserves_flags)
        );
    }

    #[cfg(target_arch = "riscv64")]
    unsafe {
        asm!(
            "mv {}, tp",                              // Copy the thread pointer register
            out(reg) tp,
            options(nostack, nomem, preserves_flags)
        );
    }

    tp
}

/// Writes the hardware thread pointer of the current thread.
///
/// # Safety
///
/// Every TLS access after this call resolves against `tp`. The caller must not touch thread-local
/// state (including anything that may use it internally) until it is back on a thread pointer that
/// belongs to the code being run. On x86_64 the same `FSGSBASE` requirement as
/// [`read_thread_pointer`] applies.
#[inline(always)]
pub unsafe fn write_thread_pointer(tp: u64) {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        asm!(
            "wrfsbase {}",                            // Write the `fs` segment base
            in(reg) tp,
            options(nostack, preserves_flags)
        );
    }

    #[cfg(target_arch = "aarch64")]
    unsafe {
        asm!(
            "msr tpidr_el0, {}",                      // Move to system register `tpidr_el0`
            in(reg) tp,
            options(nostack, preserves_flags)
        );
    }

    #[cfg(target_arch = "riscv64")]
    unsafe {
        asm!(
            "mv tp, {}",                              // Overwrite the thread pointer register
            in(reg) tp,
            options(nostack, preserves_flags)
        );
    }
}
