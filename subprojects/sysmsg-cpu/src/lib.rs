//! # sysmsg-cpu
//!
//! Direct access to the few pieces of CPU state the stub signal handler touches: memory
//! barriers, the hardware thread pointer, and the stack pointer.
//!
//! Nothing in here goes through libc or any other runtime layer. The stub handler runs before the
//! interrupted thread's TLS can be trusted, so every accessor is a single instruction (or a short
//! fixed sequence) emitted with inline assembly.

#![cfg_attr(not(test), no_std)]

#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "riscv64"
)))]
compile_error!("sysmsg-cpu only supports x86_64, aarch64 and riscv64 CPUs");

pub mod barrier;
pub mod control_regs;
pub mod tls;
