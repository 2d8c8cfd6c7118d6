//! Linux system call numbers.
//!
//! Only the calls used by the stub are listed. aarch64 and riscv64 share the asm-generic table.
//!
//! References:
//! - <https://github.com/torvalds/linux/blob/master/arch/x86/entry/syscalls/syscall_64.tbl>
//! - <https://github.com/torvalds/linux/blob/master/include/uapi/asm-generic/unistd.h>

pub use self::imp::*;

#[cfg(target_arch = "x86_64")]
mod imp {
    /// Write to a file descriptor.
    pub const WRITE: usize = 1;

    /// Set or get architecture-specific thread state (`fs`/`gs` bases).
    pub const ARCH_PRCTL: usize = 158;

    /// Fast user-space locking.
    pub const FUTEX: usize = 202;

    /// Exit all threads in the thread group.
    pub const EXIT_GROUP: usize = 231;
}

#[cfg(any(target_arch = "aarch64", target_arch = "riscv64"))]
mod imp {
    /// Write to a file descriptor.
    pub const WRITE: usize = 64;

    /// Exit all threads in the thread group.
    pub const EXIT_GROUP: usize = 94;

    /// Fast user-space locking.
    pub const FUTEX: usize = 98;
}
