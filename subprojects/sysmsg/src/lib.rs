//! # sysmsg
//!
//! Stub-side signal handling for a user-space syscall interception sandbox.
//!
//! A sandbox monitor runs untrusted guest threads on restricted "stub" threads. Every syscall a
//! stub makes traps with `SIGSYS` (seccomp `SECCOMP_RET_TRAP`), and every synchronous fault raises
//! its usual signal. The handler in this crate snapshots the interrupted CPU state into a
//! [`ThreadContext`] in memory shared with the monitor, parks the stub until the monitor assigns
//! the next context to run, and rewrites the signal frame so that returning from the handler
//! resumes that context. One stub thread can therefore run many guest threads.
//!
//! The pieces, in the order a signal meets them:
//!
//! - [`sighandler`] locates the stub's [`ThreadSlot`] from its stack pointer.
//! - [`dispatch::handle_signal`] validates the slot, captures and classifies the signal.
//! - [`switch::switch_context`] publishes the classification and waits for an assignment.
//! - [`restore::restore_state`] writes the assigned context back onto the frame.
//!
//! The state machine is generic over the register layout ([`arch::Arch`]) and over the machine
//! ([`Host`]). [`LinuxHost`] is the real machine; the monitor's side of the protocol lives in
//! [`monitor`].

#![cfg_attr(not(test), no_std)]

#[cfg(not(any(
    target_arch = "x86_64",
    target_arch = "aarch64",
    target_arch = "riscv64"
)))]
compile_error!("sysmsg only supports x86_64, aarch64 and riscv64 CPUs");

#[cfg(all(feature = "panic-handler", not(test)))]
extern crate sysmsg_panic_handler as _; // provides #[panic_handler]

pub mod arch;
pub mod cell;
mod context;
mod descriptor;
pub mod dispatch;
mod entry;
mod error;
mod host;
mod install;
mod linux;
pub mod monitor;
pub mod restore;
mod siginfo;
mod slot;
pub mod switch;

#[cfg(feature = "ffi")]
mod ffi;

#[cfg(test)]
mod testing;

pub use context::{ContextState, ThreadContext};
pub use descriptor::{ArchDescriptor, InvalidDescriptor};
pub use entry::sighandler;
pub use error::StubError;
pub use host::Host;
pub use install::{InstallCell, InstallError, install, installed};
pub use linux::{LinuxHost, RegisterThreadFn, abort};
pub use siginfo::SigInfo;
pub use slot::{PAGE_SIZE, PER_THREAD_MEM_SIZE, SLOT_OFFSET, ThreadSlot, ThreadState, slot_address};
