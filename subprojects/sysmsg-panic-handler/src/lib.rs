//! # sysmsg-panic-handler
//!
//! Panic handler for the sandbox stub.
//!
//! The stub has no allocator, no unwinder and, while a guest thread's registers are live, no
//! trustworthy TLS. On panic this handler formats the message with Rust's standard "panicked at"
//! format into a 512-byte static buffer, writes it to standard error with one raw `write(2)`,
//! and terminates the whole thread group with `exit_group(2)`. The exit status is the low byte of
//! the stub panic diagnostic code, which the monitor observes when reaping the stub.
//!
//! ## Minimal syscall implementation
//!
//! This crate contains only the two system calls it needs, making it independent of the full
//! `sysmsg-sys` crate.

#![no_std]

use core::{fmt::Write as _, panic::PanicInfo};

/// Maximum size for panic message buffer
const MSG_BUFFER_SIZE: usize = 512;

/// Diagnostic code reported for a Rust panic inside the stub.
pub const STUB_ERROR_PANIC: u32 = 0x0ead_00ff;

/// Custom panic handler that reports the panic on stderr and exits the thread group.
///
/// When a panic occurs, this handler will:
/// 1. Format `sysmsg stub <info>` into the static message buffer
/// 2. Write the buffer to file descriptor 2
/// 3. Call `exit_group` with the low byte of [`STUB_ERROR_PANIC`]
#[panic_handler]
pub fn panic_handler(info: &PanicInfo) -> ! {
    /// Static buffer for storing panic messages
    ///
    /// The stub signal handler cannot use the stack of the interrupted guest for large buffers, so
    /// the message is staged here. Panics are terminal, so there is no concurrent reuse to guard
    /// against beyond two threads panicking at once, in which case the output may interleave.
    static mut MSG_BUFFER: [u8; MSG_BUFFER_SIZE] = [0; MSG_BUFFER_SIZE];

    // SAFETY: Taking a raw pointer to static mut and creating a slice from it is safe.
    // The pointer is valid, properly aligned, and the process is about to exit.
    let buf_slice = unsafe {
        let raw_ptr = &raw mut MSG_BUFFER;
        core::slice::from_raw_parts_mut(raw_ptr as *mut u8, MSG_BUFFER_SIZE)
    };

    let mut cursor = Cursor::new(buf_slice);
    let _ = writeln!(cursor, "sysmsg stub {}", info);
    let written = cursor.position();

    sys::write(2, cursor.buf.as_ptr(), written);
    sys::exit_group((STUB_ERROR_PANIC & 0xff) as usize);
}

/// A cursor implementation for writing to a byte buffer in no_std environments.
///
/// Wraps a mutable byte slice and tracks the current write position.
struct Cursor<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a new cursor wrapping the provided buffer.
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns the current write position in the buffer.
    fn position(&self) -> usize {
        self.pos
    }
}

impl core::fmt::Write for Cursor<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buf.len().saturating_sub(self.pos);
        let to_write = bytes.len().min(remaining);

        if to_write > 0 {
            self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
        }

        Ok(())
    }
}

/// Minimal system call implementation for the panic handler.
///
/// Only `write(2)` and `exit_group(2)`, with their per-architecture numbers.
mod sys {
    use core::arch::asm;

    #[cfg(target_arch = "x86_64")]
    const WRITE: usize = 1;
    #[cfg(target_arch = "x86_64")]
    const EXIT_GROUP: usize = 231;

    #[cfg(any(target_arch = "aarch64", target_arch = "riscv64"))]
    const WRITE: usize = 64;
    #[cfg(any(target_arch = "aarch64", target_arch = "riscv64"))]
    const EXIT_GROUP: usize = 94;

    /// Writes `len` bytes at `buf` to `fd`, ignoring the result.
    pub(super) fn write(fd: usize, buf: *const u8, len: usize) {
        let _ = unsafe { syscall3(WRITE, fd, buf as usize, len) };
    }

    /// Terminates the thread group.
    pub(super) fn exit_group(status: usize) -> ! {
        loop {
            let _ = unsafe { syscall3(EXIT_GROUP, status, 0, 0) };
        }
    }

    #[cfg(target_arch = "x86_64")]
    #[inline(always)]
    unsafe fn syscall3(nr: usize, a1: usize, a2: usize, a3: usize) -> isize {
        let ret: isize;
        unsafe {
            asm!(
                "syscall",
                inlateout("rax") nr as isize => ret,
                in("rdi") a1,
                in("rsi") a2,
                in("rdx") a3,
                lateout("rcx") _,
                lateout("r11") _,
                options(nostack, preserves_flags)
            );
        }
        ret
    }

    #[cfg(target_arch = "aarch64")]
    #[inline(always)]
    unsafe fn syscall3(nr: usize, a1: usize, a2: usize, a3: usize) -> isize {
        let ret: isize;
        unsafe {
            asm!(
                "svc #0",
                in("x8") nr,
                inlateout("x0") a1 as isize => ret,
                in("x1") a2,
                in("x2") a3,
                options(nostack)
            );
        }
        ret
    }

    #[cfg(target_arch = "riscv64")]
    #[inline(always)]
    unsafe fn syscall3(nr: usize, a1: usize, a2: usize, a3: usize) -> isize {
        let ret: isize;
        unsafe {
            asm!(
                "ecall",
                in("a7") nr,
                inlateout("a0") a1 as isize => ret,
                in("a1") a2,
                in("a2") a3,
                options(nostack)
            );
        }
        ret
    }
}
