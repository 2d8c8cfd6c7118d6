//! Linux signal numbers and `si_code` values.
//!
//! x86_64, aarch64 and riscv64 share the same numbering for every signal listed here.
//!
//! References:
//! - <https://github.com/torvalds/linux/blob/master/include/uapi/asm-generic/signal.h>
//! - <https://github.com/torvalds/linux/blob/master/include/uapi/asm-generic/siginfo.h>

/// Illegal instruction
pub const SIGILL: i32 = 4;
/// Trace/breakpoint trap
pub const SIGTRAP: i32 = 5;
/// Bus error (bad memory access)
pub const SIGBUS: i32 = 7;
/// Floating-point exception
pub const SIGFPE: i32 = 8;
/// Invalid memory reference
pub const SIGSEGV: i32 = 11;
/// Child stopped or terminated
pub const SIGCHLD: i32 = 17;
/// Bad system call (seccomp `SECCOMP_RET_TRAP`)
pub const SIGSYS: i32 = 31;

/// `si_code` of a `SIGSYS` raised by a seccomp filter.
pub const SYS_SECCOMP: i32 = 1;
