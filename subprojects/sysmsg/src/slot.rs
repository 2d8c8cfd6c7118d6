//! The per-stub-thread slot header.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use static_assertions::const_assert_eq;

use crate::{
    arch::{Arch, Native},
    cell::{SharedAddr, SharedEnum, SharedRepr},
    context::ThreadContext,
};

/// Size (and alignment) of the memory region reserved for each stub thread.
pub const PER_THREAD_MEM_SIZE: usize = 8 << 20;

pub const PAGE_SIZE: usize = 4096;

/// Offset of the slot inside its thread's region: the last page. The signal stack grows down
/// from just below it.
pub const SLOT_OFFSET: usize = PER_THREAD_MEM_SIZE - PAGE_SIZE;

/// What the slot's stub thread is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ThreadState {
    /// Running guest code, or idle.
    None = 0,
    /// Freshly provisioned; the first signal has not been handled yet.
    Initializing = 1,
    /// Parked on an intercepted syscall.
    Syscall = 2,
    /// Parked on a fault.
    Fault = 3,
}

impl SharedRepr for ThreadState {
    #[inline]
    fn into_raw(self) -> u32 {
        self as u32
    }

    #[inline]
    fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(ThreadState::None),
            1 => Some(ThreadState::Initializing),
            2 => Some(ThreadState::Syscall),
            3 => Some(ThreadState::Fault),
            _ => None,
        }
    }
}

/// Shared header of one stub thread.
///
/// | Field       | Writer                                   | Readers |
/// |-------------|------------------------------------------|---------|
/// | `self_addr` | monitor, at provisioning                 | stub    |
/// | `state`     | stub (monitor only at provisioning)      | monitor |
/// | `wake`      | monitor                                  | stub    |
/// | `context`   | monitor                                  | stub    |
/// | `thread_id` | monitor, through thread registration     | both    |
/// | `err`       | stub, on a fatal error                   | monitor |
#[repr(C)]
pub struct ThreadSlot<A: Arch = Native> {
    pub(crate) self_addr: AtomicU64,
    pub(crate) state: SharedEnum<ThreadState>,
    pub(crate) wake: AtomicU32,
    pub(crate) context: SharedAddr<ThreadContext<A>>,
    pub(crate) thread_id: AtomicU32,
    pub(crate) err: AtomicU32,
}

const_assert_eq!(core::mem::size_of::<ThreadSlot>(), 32);
const_assert_eq!(core::mem::offset_of!(ThreadSlot, state), 8);
const_assert_eq!(core::mem::offset_of!(ThreadSlot, wake), 12);
const_assert_eq!(core::mem::offset_of!(ThreadSlot, context), 16);
const_assert_eq!(core::mem::offset_of!(ThreadSlot, thread_id), 24);
const_assert_eq!(core::mem::offset_of!(ThreadSlot, err), 28);

impl<A: Arch> ThreadSlot<A> {
    /// Returns an unprovisioned slot: it fails the self-reference check until
    /// [`monitor::provision`](crate::monitor::provision) runs on it in place.
    pub const fn zeroed() -> Self {
        Self {
            self_addr: AtomicU64::new(0),
            state: SharedEnum::from_raw_word(0),
            wake: AtomicU32::new(0),
            context: SharedAddr::null(),
            thread_id: AtomicU32::new(0),
            err: AtomicU32::new(0),
        }
    }

    /// Locates the slot of the stub thread running on `sp`.
    ///
    /// # Safety
    ///
    /// `sp` must point into a per-thread stub region provisioned by the monitor. The returned
    /// reference is not yet validated; call [`ThreadSlot::is_valid`] before trusting any field.
    #[inline]
    pub unsafe fn from_stack_pointer<'a>(sp: usize) -> &'a Self {
        let addr = slot_address(sp);
        unsafe { &*(addr as *const Self) }
    }

    /// Whether the slot's self-reference matches its own address.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.self_addr.load(Ordering::Relaxed) == self as *const Self as usize as u64
    }

    /// Current published state, or the raw word if it is not a known state.
    #[inline]
    pub fn state(&self) -> Result<ThreadState, u32> {
        self.state.load()
    }

    /// Futex word the monitor sleeps on while waiting for the stub to publish.
    #[inline]
    pub fn state_word(&self) -> &AtomicU32 {
        self.state.word()
    }

    /// Futex word the stub sleeps on while waiting for a context assignment.
    #[inline]
    pub fn wake_word(&self) -> &AtomicU32 {
        &self.wake
    }

    #[inline]
    pub fn thread_id(&self) -> u32 {
        self.thread_id.load(Ordering::Acquire)
    }

    /// The fatal error code the stub stored, zero if none.
    #[inline]
    pub fn error_code(&self) -> u32 {
        self.err.load(Ordering::Acquire)
    }

    /// The context currently assigned to the slot.
    ///
    /// # Safety
    ///
    /// The monitor must only assign pointers to live contexts mapped in this address space.
    #[inline]
    pub(crate) unsafe fn context<'a>(&self) -> Option<&'a ThreadContext<A>> {
        unsafe { self.context.load().as_ref() }
    }
}

/// Address of the slot for a stub thread whose stack pointer is `sp`.
#[inline]
pub const fn slot_address(sp: usize) -> usize {
    (sp & !(PER_THREAD_MEM_SIZE - 1)) + SLOT_OFFSET
}
