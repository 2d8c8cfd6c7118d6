//! Raw system call gateway.
//!
//! One [`syscall6`] implementation per architecture, plus fixed-arity helpers that forward to it
//! with zeroed trailing arguments (the kernel ignores argument registers a call does not use).
//!
//! | Arch    | Trap      | Number | Arguments                 | Result | Clobbered  |
//! |---------|-----------|--------|---------------------------|--------|------------|
//! | x86_64  | `syscall` | `rax`  | `rdi rsi rdx r10 r8 r9`   | `rax`  | `rcx r11`  |
//! | aarch64 | `svc #0`  | `x8`   | `x0 x1 x2 x3 x4 x5`       | `x0`   |            |
//! | riscv64 | `ecall`   | `a7`   | `a0 a1 a2 a3 a4 a5`       | `a0`   |            |
//!
//! The return value is the kernel's raw result. Values in `-4095..=-1` are negated errno codes;
//! see [`crate::result`] for decoding. No wrapper here reads or writes `errno`.
//!
//! Ref: <https://man7.org/linux/man-pages/man2/syscall.2.html>

use core::arch::asm;

/// Issues system call `nr` with six arguments.
///
/// # Safety
///
/// The caller must uphold whatever contract the kernel imposes on syscall `nr` for the given
/// arguments: pointers must be valid for the access the kernel performs, and calls that change
/// process state (memory mappings, signal dispositions, thread pointer) must not invalidate
/// assumptions made by the surrounding Rust code.
#[cfg(target_arch = "x86_64")]
#[inline(always)]
pub unsafe fn syscall6(
    nr: usize,
    a1: usize,
    a2: usize,
    a3: usize,
    a4: usize,
    a5: usize,
    a6: usize,
) -> isize {
    let ret: isize;
    unsafe {
        asm!(
            "syscall",
            inlateout("rax") nr as isize => ret,
            in("rdi") a1,
            in("rsi") a2,
            in("rdx") a3,
            in("r10") a4,
            in("r8") a5,
            in("r9") a6,
            lateout("rcx") _, // Clobbered: return address
            lateout("r11") _, // Clobbered: saved rflags
            options(nostack, preserves_flags)
        );
    }
    ret
}

/// Issues system call `nr` with six arguments.
///
/// # Safety
///
/// See the x86_64 variant.
#[cfg(target_arch = "aarch64")]
#[inline(always)]
pub unsafe fn syscall6(
    nr: usize,
    a1: usize,
    a2: usize,
    a3: usize,
    a4: usize,
    a5: usize,
    a6: usize,
) -> isize {
    let ret: isize;
    unsafe {
        asm!(
            "svc #0",
            in("x8") nr,
            inlateout("x0") a1 as isize => ret,
            in("x1") a2,
            in("x2") a3,
            in("x3") a4,
            in("x4") a5,
            in("x5") a6,
            options(nostack)
        );
    }
    ret
}

/// Issues system call `nr` with six arguments.
///
/// # Safety
///
/// See the x86_64 variant.
#[cfg(target_arch = "riscv64")]
#[inline(always)]
pub unsafe fn syscall6(
    nr: usize,
    a1: usize,
    a2: usize,
    a3: usize,
    a4: usize,
    a5: usize,
    a6: usize,
) -> isize {
    let ret: isize;
    unsafe {
        asm!(
            "ecall",
            in("a7") nr,
            inlateout("a0") a1 as isize => ret,
            in("a1") a2,
            in("a2") a3,
            in("a3") a4,
            in("a4") a5,
            in("a5") a6,
            options(nostack)
        );
    }
    ret
}

/// Issues system call `nr` with one argument.
///
/// # Safety
///
/// See [`syscall6`].
#[inline(always)]
pub unsafe fn syscall1(nr: usize, a1: usize) -> isize {
    unsafe { syscall6(nr, a1, 0, 0, 0, 0, 0) }
}

/// Issues system call `nr` with two arguments.
///
/// # Safety
///
/// See [`syscall6`].
#[inline(always)]
pub unsafe fn syscall2(nr: usize, a1: usize, a2: usize) -> isize {
    unsafe { syscall6(nr, a1, a2, 0, 0, 0, 0) }
}

/// Issues system call `nr` with three arguments.
///
/// # Safety
///
/// See [`syscall6`].
#[inline(always)]
pub unsafe fn syscall3(nr: usize, a1: usize, a2: usize, a3: usize) -> isize {
    unsafe { syscall6(nr, a1, a2, a3, 0, 0, 0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nr;

    #[test]
    fn unknown_syscall_returns_enosys() {
        // Far beyond every table; the kernel answers -ENOSYS without side effects.
        let ret = unsafe { syscall6(0x8600_0000, 1, 2, 3, 4, 5, 6) };
        assert_eq!(ret, -38);
    }

    #[test]
    fn write_passes_all_arguments() {
        let msg = b"";
        let ret = unsafe { syscall3(nr::WRITE, 2, msg.as_ptr() as usize, msg.len()) };
        assert_eq!(ret, 0);
    }
}
