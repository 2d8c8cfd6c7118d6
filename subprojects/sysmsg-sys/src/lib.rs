//! # sysmsg-sys
//!
//! Direct Linux system calls for code that runs inside a stub signal handler.
//!
//! The [raw](raw) module issues syscalls with the architecture's native register convention and
//! returns the kernel's result unchanged (negative errno on failure). Nothing here goes through
//! libc: the handler may run before the interrupted thread's TLS is valid, and libc wrappers read
//! `errno` through TLS.
//!
//! The remaining modules are thin typed wrappers over the raw calls the stub actually needs,
//! translating negative results into [`Errno`](result::Errno) based error enums.
//!
//! ## References
//! - [syscall(2): Architecture calling conventions](https://man7.org/linux/man-pages/man2/syscall.2.html)
//! - [Linux: include/uapi/asm-generic/unistd.h](https://github.com/torvalds/linux/blob/master/include/uapi/asm-generic/unistd.h)
//! - [Linux: arch/x86/entry/syscalls/syscall_64.tbl](https://github.com/torvalds/linux/blob/master/arch/x86/entry/syscalls/syscall_64.tbl)

#![cfg_attr(not(test), no_std)]

#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "riscv64"
)))]
compile_error!("sysmsg-sys only supports x86_64, aarch64 and riscv64 CPUs");

pub mod debug;
pub mod futex;
pub mod nr;
pub mod process;
pub mod raw;
pub mod result;
pub mod signal;
#[cfg(target_arch = "x86_64")]
pub mod tls;
