//! Per-architecture register layouts.
//!
//! Every supported architecture is described by a zero-sized type implementing [`Arch`]. The
//! types only describe memory layouts (the kernel's `ucontext`, the register snapshot kept in a
//! [`ThreadContext`](crate::ThreadContext), the floating-point blob capacity) and how to move
//! registers between them. They contain no inline assembly, so all three compile on any host and
//! the signal state machine can be exercised against each layout.
//!
//! [`Native`] names the layout of the architecture being compiled for.

use core::ptr::NonNull;

pub mod aarch64;
pub mod riscv64;
pub mod x86_64;

#[cfg(target_arch = "aarch64")]
pub use aarch64::Aarch64 as Native;
#[cfg(target_arch = "riscv64")]
pub use riscv64::Riscv64 as Native;
#[cfg(target_arch = "x86_64")]
pub use x86_64::X86_64 as Native;

/// Value added to the syscall number of a trap raised with a foreign ABI tag.
///
/// Large enough that the result is outside every Linux syscall table, so re-issuing it resolves
/// to `ENOSYS` instead of some unrelated native call.
pub const FOREIGN_SYSCALL_OFFSET: u64 = 0x8600_0000;

/// Description of one architecture's signal frame and register snapshot.
pub trait Arch: Sized + 'static {
    /// Short architecture name used in diagnostics.
    const NAME: &'static str;

    /// `AUDIT_ARCH_*` tag the kernel reports in `si_arch` for native 64-bit syscalls.
    const AUDIT_ARCH: u32;

    /// Index of the syscall number register inside [`Arch::Regs`].
    const SYSCALL_NR: usize;

    /// General-purpose register snapshot.
    type Regs: RegisterFile;

    /// Floating-point/vector state storage.
    type FpState: FpStorage;

    /// The kernel's `struct ucontext` as passed to an `SA_SIGINFO` handler.
    type UContext;

    /// Largest floating-point blob a context can hold.
    const FP_STATE_CAPACITY: usize = <Self::FpState as FpStorage>::CAPACITY;

    /// Copies the general registers out of the signal frame.
    fn save_regs(uc: &Self::UContext, regs: &mut Self::Regs);

    /// Overwrites the general registers of the signal frame.
    fn load_regs(uc: &mut Self::UContext, regs: &Self::Regs);

    /// Returns the start of the floating-point area of the signal frame, if the frame has one.
    fn fp_area(uc: &mut Self::UContext) -> Option<NonNull<u8>>;

    /// Returns a mutable reference to the syscall number register of `regs`.
    #[inline]
    fn syscall_nr(regs: &mut Self::Regs) -> &mut u64 {
        &mut regs.as_mut_slice()[Self::SYSCALL_NR]
    }
}

/// A snapshot of `N` 64-bit general registers.
///
/// Each architecture documents the meaning of every index next to its [`Arch`] implementation.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Registers<const N: usize>(pub [u64; N]);

impl<const N: usize> core::fmt::Debug for Registers<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut list = f.debug_list();
        for reg in &self.0 {
            list.entry(&format_args!("{reg:#018x}"));
        }
        list.finish()
    }
}

/// Uniform access to a register snapshot.
pub trait RegisterFile: Copy {
    /// Number of registers in the snapshot.
    const COUNT: usize;

    /// Returns a snapshot with every register set to zero.
    fn zeroed() -> Self;

    /// Returns the registers as a slice.
    fn as_slice(&self) -> &[u64];

    /// Returns the registers as a mutable slice.
    fn as_mut_slice(&mut self) -> &mut [u64];
}

impl<const N: usize> RegisterFile for Registers<N> {
    const COUNT: usize = N;

    #[inline]
    fn zeroed() -> Self {
        Self([0; N])
    }

    #[inline]
    fn as_slice(&self) -> &[u64] {
        &self.0
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [u64] {
        &mut self.0
    }
}

/// Fixed-capacity byte storage for a floating-point/vector blob.
///
/// Only the first `fp_len` bytes (from the [`ArchDescriptor`](crate::ArchDescriptor)) are
/// meaningful.
#[derive(Clone, Copy)]
#[repr(C, align(64))]
pub struct FpBlob<const N: usize>(pub [u8; N]);

/// Uniform access to floating-point storage.
pub trait FpStorage {
    /// Capacity of the storage in bytes.
    const CAPACITY: usize;

    /// Returns zero-filled storage.
    fn zeroed() -> Self;

    /// Returns the storage as a byte slice.
    fn as_bytes(&self) -> &[u8];

    /// Returns the storage as a mutable byte slice.
    fn as_bytes_mut(&mut self) -> &mut [u8];
}

impl<const N: usize> FpStorage for FpBlob<N> {
    const CAPACITY: usize = N;

    #[inline]
    fn zeroed() -> Self {
        Self([0; N])
    }

    #[inline]
    fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

/// `stack_t` as embedded in `struct ucontext`.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct SignalStack {
    /// Base address of the alternate stack
    pub ss_sp: u64,
    /// `SS_ONSTACK`/`SS_DISABLE` flags
    pub ss_flags: i32,
    _pad: u32,
    /// Size of the alternate stack
    pub ss_size: u64,
}
